//! Shared error types for the services crate.

use thiserror::Error;

use storage::StorageError;

/// A failed write toward the key-value store.
///
/// Reported, never fatal: the in-memory state stays authoritative for the
/// rest of the session, the worst outcome is that this session's changes
/// are not saved.
#[derive(Debug, Error)]
#[error("persistence failed: {source}")]
pub struct PersistenceError {
    #[from]
    source: StorageError,
}

/// Errors emitted while producing the export file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExportError {
    #[error("could not serialize export document: {0}")]
    Serialization(String),

    #[error("could not write export file: {0}")]
    Io(String),
}
