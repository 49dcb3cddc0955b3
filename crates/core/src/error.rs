use thiserror::Error;

use crate::model::{MalformedCodeError, ReferentialError, UnknownCodeError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    MalformedCode(#[from] MalformedCodeError),
    #[error(transparent)]
    UnknownCode(#[from] UnknownCodeError),
    #[error(transparent)]
    Referential(#[from] ReferentialError),
}
