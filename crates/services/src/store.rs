use std::collections::BTreeMap;
use tracing::{debug, warn};

use skilltree_core::Clock;
use skilltree_core::aggregate::ProgressSnapshot;
use skilltree_core::model::{AcCode, HistoryRecord, Progress, Proof, RawProgress};
use storage::{PersistedState, ProgressRepository};

use crate::error::PersistenceError;

//
// ─── OUTCOME ───────────────────────────────────────────────────────────────────
//

/// Result of one `set` call.
///
/// `set` is total: it always stores the clamped value. A persistence failure
/// is carried here for the caller to surface, it never rolls the write back.
#[derive(Debug)]
pub struct SetOutcome {
    pub previous: Progress,
    pub stored: Progress,
    pub changed: bool,
    pub persist_error: Option<PersistenceError>,
}

//
// ─── STORE ─────────────────────────────────────────────────────────────────────
//

/// Single source of truth for per-AC progress, the change log and proofs.
///
/// State is hydrated from the repository once at construction and mutated
/// only through [`ProgressStore::set_with`] and [`ProgressStore::clear`];
/// every mutation is pushed back to the repository best-effort.
pub struct ProgressStore {
    repository: ProgressRepository,
    clock: Clock,
    progress: BTreeMap<AcCode, Progress>,
    history: Vec<HistoryRecord>,
    proofs: BTreeMap<AcCode, Proof>,
}

impl ProgressStore {
    /// Hydrates a store from whatever the repository holds; missing or
    /// corrupt documents start empty.
    #[must_use]
    pub fn new(repository: ProgressRepository, clock: Clock) -> Self {
        let PersistedState {
            progress,
            history,
            proofs,
        } = repository.load();
        Self {
            repository,
            clock,
            progress,
            history,
            proofs,
        }
    }

    /// Store over a fresh in-memory repository, for tests and prototyping.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::new(ProgressRepository::in_memory(), clock)
    }

    /// Stored progress for a code, 0 when never set. Never fails.
    #[must_use]
    pub fn get(&self, code: AcCode) -> Progress {
        self.progress.get(&code).copied().unwrap_or_default()
    }

    /// Writes a progress value, coercing and clamping the raw input.
    ///
    /// A history record is appended iff the clamped value differs from the
    /// stored one; the value itself is written unconditionally so repeated
    /// identical writes stay idempotent. A proof, when given, is attached
    /// whether or not the value changed.
    pub fn set(&mut self, code: AcCode, value: impl Into<RawProgress>) -> SetOutcome {
        self.set_with(code, value, None, None)
    }

    /// Full-form write: progress plus optional proof and history label.
    pub fn set_with(
        &mut self,
        code: AcCode,
        value: impl Into<RawProgress>,
        proof: Option<Proof>,
        label: Option<String>,
    ) -> SetOutcome {
        let stored = value.into().coerce();
        let previous = self.get(code);
        let changed = stored != previous;

        if changed {
            self.history.push(HistoryRecord::new(
                self.clock.now(),
                code,
                previous,
                stored,
                label,
            ));
            debug!(%code, old = %previous, new = %stored, "progress updated");
        }
        self.progress.insert(code, stored);

        let proof_given = proof.is_some();
        if let Some(proof) = proof {
            self.proofs.insert(code, proof);
        }

        let persist_error = self
            .persist(changed, proof_given)
            .map_err(PersistenceError::from)
            .err();
        if let Some(error) = &persist_error {
            warn!(%code, %error, "progress kept in memory only");
        }

        SetOutcome {
            previous,
            stored,
            changed,
            persist_error,
        }
    }

    fn persist(&self, history_dirty: bool, proofs_dirty: bool) -> Result<(), storage::StorageError> {
        self.repository.save_progress(&self.progress)?;
        if history_dirty {
            self.repository.save_history(&self.history)?;
        }
        if proofs_dirty {
            self.repository.save_proofs(&self.proofs)?;
        }
        Ok(())
    }

    /// Snapshot copy of the current progress mapping.
    #[must_use]
    pub fn all_progress(&self) -> BTreeMap<AcCode, Progress> {
        self.progress.clone()
    }

    /// Snapshot in the shape the aggregation engine consumes.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.progress.iter().map(|(c, p)| (*c, *p)).collect()
    }

    /// Change log, most recent first; `limit` keeps only the last N records.
    #[must_use]
    pub fn history(&self, limit: Option<usize>) -> Vec<HistoryRecord> {
        let take = limit.unwrap_or(self.history.len());
        self.history.iter().rev().take(take).cloned().collect()
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub fn proof(&self, code: AcCode) -> Option<&Proof> {
        self.proofs.get(&code)
    }

    /// Everything currently held, in persistable form (used by export).
    #[must_use]
    pub fn persisted_state(&self) -> PersistedState {
        PersistedState {
            progress: self.progress.clone(),
            history: self.history.clone(),
            proofs: self.proofs.clone(),
        }
    }

    /// Empties progress, history and proofs together, then best-effort
    /// removes the persisted documents. In-memory state is cleared even if
    /// the removal fails.
    pub fn clear(&mut self) -> Option<PersistenceError> {
        self.progress.clear();
        self.history.clear();
        self.proofs.clear();

        let error = self
            .repository
            .clear()
            .map_err(PersistenceError::from)
            .err();
        if let Some(error) = &error {
            warn!(%error, "persisted documents could not be removed");
        }
        error
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
