pub mod code;
mod history;
mod progress;
mod proof;
pub mod referential;

pub use code::{AcCode, MalformedCodeError};
pub use history::HistoryRecord;
pub use progress::{Progress, RawProgress};
pub use proof::Proof;
pub use referential::{
    AcDef, Competency, Level, Referential, ReferentialError, ResolvedAc, UnknownCodeError,
};
