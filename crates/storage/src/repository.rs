use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

use skilltree_core::model::{AcCode, HistoryRecord, Progress, Proof};

use crate::backend::{MemoryBackend, StorageBackend, StorageError};
use crate::keys::StorageKeys;

/// Everything the store persists, as one value: the progress snapshot, the
/// append-only history and the proof map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedState {
    pub progress: BTreeMap<AcCode, Progress>,
    pub history: Vec<HistoryRecord>,
    pub proofs: BTreeMap<AcCode, Proof>,
}

/// Reads and writes the three persisted documents through an injected
/// key-value backend.
///
/// Loading is tolerant: a document that is missing, unreadable or corrupt
/// hydrates as empty (with a logged warning) instead of failing the session.
/// Writes report their errors but the caller's in-memory state stays
/// authoritative either way.
#[derive(Clone)]
pub struct ProgressRepository {
    backend: Arc<dyn StorageBackend>,
    keys: StorageKeys,
}

impl ProgressRepository {
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>, keys: StorageKeys) -> Self {
        Self { backend, keys }
    }

    /// Repository over a fresh in-memory backend with the default keys.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()), StorageKeys::default())
    }

    #[must_use]
    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// Hydrates the full persisted state, document by document.
    #[must_use]
    pub fn load(&self) -> PersistedState {
        PersistedState {
            progress: self.load_progress(),
            history: self.load_document(self.keys.history(), "history"),
            proofs: self.load_proofs(),
        }
    }

    fn load_progress(&self) -> BTreeMap<AcCode, Progress> {
        let raw: BTreeMap<String, Progress> = self.load_document(self.keys.progress(), "progress");
        parse_coded_keys(raw, "progress")
    }

    fn load_proofs(&self) -> BTreeMap<AcCode, Proof> {
        let raw: BTreeMap<String, Proof> = self.load_document(self.keys.proofs(), "proofs");
        parse_coded_keys(raw, "proofs")
    }

    fn load_document<T: serde::de::DeserializeOwned + Default>(
        &self,
        key: &str,
        document: &'static str,
    ) -> T {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(error) => {
                warn!(%error, document, "could not read persisted document, starting empty");
                return T::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(error) => {
                warn!(%error, document, "persisted document is corrupt, starting empty");
                T::default()
            }
        }
    }

    /// Writes the progress snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if serialization or the backend write fails.
    pub fn save_progress(
        &self,
        progress: &BTreeMap<AcCode, Progress>,
    ) -> Result<(), StorageError> {
        self.save_document(self.keys.progress(), progress)
    }

    /// Writes the history log.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if serialization or the backend write fails.
    pub fn save_history(&self, history: &[HistoryRecord]) -> Result<(), StorageError> {
        self.save_document(self.keys.history(), &history)
    }

    /// Writes the proof map.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if serialization or the backend write fails.
    pub fn save_proofs(&self, proofs: &BTreeMap<AcCode, Proof>) -> Result<(), StorageError> {
        self.save_document(self.keys.proofs(), proofs)
    }

    /// Writes all three documents; stops at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first `StorageError` encountered.
    pub fn save(&self, state: &PersistedState) -> Result<(), StorageError> {
        self.save_progress(&state.progress)?;
        self.save_history(&state.history)?;
        self.save_proofs(&state.proofs)
    }

    /// Removes all three documents. Every removal is attempted even if one
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns the first `StorageError` encountered.
    pub fn clear(&self) -> Result<(), StorageError> {
        let results = [
            self.backend.remove(self.keys.progress()),
            self.backend.remove(self.keys.history()),
            self.backend.remove(self.keys.proofs()),
        ];
        results.into_iter().collect()
    }

    fn save_document<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.backend.set(key, &raw)
    }
}

// A stray unparsable key (hand-edited save, older draft format) only drops
// that entry, never the whole document.
fn parse_coded_keys<V>(raw: BTreeMap<String, V>, document: &'static str) -> BTreeMap<AcCode, V> {
    raw.into_iter()
        .filter_map(|(key, value)| match key.parse::<AcCode>() {
            Ok(code) => Some((code, value)),
            Err(error) => {
                warn!(%error, %key, document, "skipping entry with malformed AC code");
                None
            }
        })
        .collect()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
