#![forbid(unsafe_code)]

pub mod error;
pub mod export;
pub mod store;
pub mod tracker;
pub mod view;

pub use skilltree_core::Clock;

pub use error::{ExportError, PersistenceError};
pub use export::ExportDocument;
pub use store::{ProgressStore, SetOutcome};
pub use tracker::{Aggregates, AppliedChange, ChangeReport, ProgressTracker, SkipReason};
pub use view::ProgressView;
