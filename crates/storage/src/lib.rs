#![forbid(unsafe_code)]

pub mod backend;
pub mod json_file;
pub mod keys;
pub mod repository;

pub use backend::{MemoryBackend, StorageBackend, StorageError};
pub use json_file::JsonFileBackend;
pub use keys::{KeysError, StorageKeys};
pub use repository::{PersistedState, ProgressRepository};
