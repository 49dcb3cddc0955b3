use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::code::AcCode;
use crate::model::progress::Progress;

/// One entry of the append-only change log: a single effective progress write.
///
/// Field names follow the persisted layout of the original save files
/// (`date` / `ac` / `oldProgress` / `newProgress` / `label`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub date: DateTime<Utc>,
    pub ac: AcCode,
    pub old_progress: Progress,
    pub new_progress: Progress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl HistoryRecord {
    #[must_use]
    pub fn new(
        date: DateTime<Utc>,
        ac: AcCode,
        old_progress: Progress,
        new_progress: Progress,
        label: Option<String>,
    ) -> Self {
        Self {
            date,
            ac,
            old_progress,
            new_progress,
            label,
        }
    }
}
