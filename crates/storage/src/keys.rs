use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum KeysError {
    #[error("storage key for {document} cannot be empty")]
    EmptyKey { document: &'static str },

    #[error("storage keys must be distinct")]
    DuplicateKey,
}

/// Names of the three persisted documents in the key-value store.
///
/// Defaults match the keys the original save files were written under, so a
/// migrated store keeps reading existing data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    progress: String,
    history: String,
    proofs: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            progress: "sae3.03_progress".to_owned(),
            history: "sae3.03_historique".to_owned(),
            proofs: "sae3.03_preuves".to_owned(),
        }
    }
}

impl StorageKeys {
    /// Builds a custom key set.
    ///
    /// # Errors
    ///
    /// Returns `KeysError` if a key is empty or two keys collide.
    pub fn new(
        progress: impl Into<String>,
        history: impl Into<String>,
        proofs: impl Into<String>,
    ) -> Result<Self, KeysError> {
        let progress = progress.into();
        let history = history.into();
        let proofs = proofs.into();

        for (document, key) in [
            ("progress", &progress),
            ("history", &history),
            ("proofs", &proofs),
        ] {
            if key.trim().is_empty() {
                return Err(KeysError::EmptyKey { document });
            }
        }
        if progress == history || progress == proofs || history == proofs {
            return Err(KeysError::DuplicateKey);
        }

        Ok(Self {
            progress,
            history,
            proofs,
        })
    }

    #[must_use]
    pub fn progress(&self) -> &str {
        &self.progress
    }

    #[must_use]
    pub fn history(&self) -> &str {
        &self.history
    }

    #[must_use]
    pub fn proofs(&self) -> &str {
        &self.proofs
    }
}
