use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use skilltree_core::model::{AcCode, HistoryRecord, Progress, Proof};
use storage::PersistedState;

use crate::error::ExportError;

/// The downloadable save file: `progressions` and `historique` always,
/// `proofs` only when any exist. Field names match the original export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub progressions: BTreeMap<AcCode, Progress>,
    pub historique: Vec<HistoryRecord>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub proofs: BTreeMap<AcCode, Proof>,
}

impl ExportDocument {
    #[must_use]
    pub fn from_state(state: &PersistedState) -> Self {
        Self {
            progressions: state.progress.clone(),
            historique: state.history.clone(),
            proofs: state.proofs.clone(),
        }
    }

    /// Pretty-printed JSON, the way the save file is shipped.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::Serialization` if the document cannot be
    /// serialized.
    pub fn to_json_pretty(&self) -> Result<String, ExportError> {
        serde_json::to_string_pretty(self).map_err(|e| ExportError::Serialization(e.to_string()))
    }

    /// File name carrying the export date: `sauvegarde-YYYY-MM-DD.json`.
    #[must_use]
    pub fn suggested_filename(at: DateTime<Utc>) -> String {
        format!("sauvegarde-{}.json", at.format("%Y-%m-%d"))
    }

    /// Writes the document under `dir` with the stamped file name.
    ///
    /// # Errors
    ///
    /// Returns `ExportError` if serialization or the file write fails.
    pub fn write_to_dir(&self, dir: &Path, at: DateTime<Utc>) -> Result<PathBuf, ExportError> {
        let path = dir.join(Self::suggested_filename(at));
        std::fs::write(&path, self.to_json_pretty()?)
            .map_err(|e| ExportError::Io(e.to_string()))?;
        Ok(path)
    }
}
