use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

use skilltree_core::aggregate::{AggregateUpdate, Aggregator, LevelKey};
use skilltree_core::model::{
    AcCode, HistoryRecord, MalformedCodeError, Progress, Proof, RawProgress, Referential,
    UnknownCodeError,
};

use crate::error::{ExportError, PersistenceError};
use crate::export::ExportDocument;
use crate::store::{ProgressStore, SetOutcome};
use crate::view::ProgressView;

//
// ─── REPORTS ───────────────────────────────────────────────────────────────────
//

/// Why a write was ignored. Both cases are no-ops by contract: a bad code
/// from the UI must never crash the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Malformed(MalformedCodeError),
    Unknown(UnknownCodeError),
}

/// An accepted write: what was stored plus the recomputed aggregates.
#[derive(Debug)]
pub struct AppliedChange {
    pub code: AcCode,
    pub outcome: SetOutcome,
    pub update: AggregateUpdate,
}

/// Result of one `set_progress` call.
#[derive(Debug)]
pub enum ChangeReport {
    Applied(AppliedChange),
    Skipped(SkipReason),
}

impl ChangeReport {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Both aggregate families at once, for a full render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregates {
    pub levels: BTreeMap<LevelKey, f64>,
    pub competencies: BTreeMap<String, f64>,
}

//
// ─── TRACKER ───────────────────────────────────────────────────────────────────
//

/// The collaborator-facing surface: one leaf write runs the whole
/// store → recompute → notify cycle synchronously before returning.
///
/// Views receive callbacks only for effective changes: the changed leaf, its
/// level, its competency, then each completion transition. Transitions are
/// derived per write from the full snapshot, so a crossing fires exactly
/// once without any stored "already celebrated" flag.
pub struct ProgressTracker {
    referential: Referential,
    store: ProgressStore,
    views: Vec<Arc<dyn ProgressView>>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(referential: Referential, store: ProgressStore) -> Self {
        Self {
            referential,
            store,
            views: Vec::new(),
        }
    }

    pub fn register_view(&mut self, view: Arc<dyn ProgressView>) {
        self.views.push(view);
    }

    #[must_use]
    pub fn referential(&self) -> &Referential {
        &self.referential
    }

    /// Current progress for a raw code string; malformed or unknown codes
    /// read as 0, matching the store's "absent means not started".
    #[must_use]
    pub fn get_progress(&self, code: &str) -> Progress {
        code.parse::<AcCode>()
            .map(|code| self.store.get(code))
            .unwrap_or_default()
    }

    /// Writes a progress value for a raw code string.
    ///
    /// Malformed or unknown codes are skipped with a logged warning; valid
    /// writes always succeed and drive the notify cycle.
    pub fn set_progress(&mut self, code: &str, value: impl Into<RawProgress>) -> ChangeReport {
        self.set_progress_with(code, value, None, None)
    }

    /// Full-form write: progress plus optional proof and history label.
    pub fn set_progress_with(
        &mut self,
        code: &str,
        value: impl Into<RawProgress>,
        proof: Option<Proof>,
        label: Option<String>,
    ) -> ChangeReport {
        let parsed = match code.parse::<AcCode>() {
            Ok(parsed) => parsed,
            Err(error) => {
                warn!(code, %error, "ignoring write with malformed AC code");
                return ChangeReport::Skipped(SkipReason::Malformed(error));
            }
        };
        if !self.referential.contains(parsed) {
            let error = UnknownCodeError { code: parsed };
            warn!(%parsed, "ignoring write for AC unknown to the referential");
            return ChangeReport::Skipped(SkipReason::Unknown(error));
        }

        let outcome = self.store.set_with(parsed, value, proof, label);
        let snapshot = self.store.snapshot();
        let update = Aggregator::new(&self.referential).recompute(
            parsed,
            outcome.previous,
            outcome.stored,
            &snapshot,
        );

        if outcome.changed {
            self.notify(&update);
        }

        ChangeReport::Applied(AppliedChange {
            code: parsed,
            outcome,
            update,
        })
    }

    fn notify(&self, update: &AggregateUpdate) {
        let level_key = LevelKey::of(update.leaf);
        let level_average = update.level_averages.get(&level_key).copied();
        let competency = self
            .referential
            .competency_short_name(update.leaf)
            .ok()
            .map(str::to_owned);

        for view in &self.views {
            view.on_leaf_changed(update.leaf, update.leaf_value);
            if let Some(average) = level_average {
                view.on_level_changed(level_key, average);
            }
            if let Some(name) = &competency {
                if let Some(average) = update.competency_averages.get(name) {
                    view.on_competency_changed(name, *average);
                }
            }
            for transition in &update.transitions {
                view.on_transition(*transition);
            }
        }
    }

    /// Every level and competency average, recomputed from the current
    /// snapshot.
    #[must_use]
    pub fn aggregates(&self) -> Aggregates {
        let aggregator = Aggregator::new(&self.referential);
        let snapshot = self.store.snapshot();
        Aggregates {
            levels: aggregator.all_level_averages(&snapshot),
            competencies: aggregator.all_competency_averages(&snapshot),
        }
    }

    /// Change log, most recent first.
    #[must_use]
    pub fn history(&self, limit: Option<usize>) -> Vec<HistoryRecord> {
        self.store.history(limit)
    }

    #[must_use]
    pub fn proof(&self, code: &str) -> Option<&Proof> {
        code.parse::<AcCode>()
            .ok()
            .and_then(|code| self.store.proof(code))
    }

    /// Snapshot of everything in the export layout.
    #[must_use]
    pub fn export_snapshot(&self) -> ExportDocument {
        ExportDocument::from_state(&self.store.persisted_state())
    }

    /// Writes the export document under `dir`, stamped with the clock date.
    ///
    /// # Errors
    ///
    /// Returns `ExportError` if the document cannot be serialized or the
    /// file cannot be written.
    pub fn export_to_dir(
        &self,
        dir: &std::path::Path,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<std::path::PathBuf, ExportError> {
        self.export_snapshot().write_to_dir(dir, at)
    }

    /// Resets progress, history and proofs. A storage failure is reported
    /// but the in-memory reset always happens.
    pub fn clear_all(&mut self) -> Option<PersistenceError> {
        self.store.clear()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
