use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("cannot encode change event: {0}")]
    Encode(String),
    #[error("cannot decode change event: {0}")]
    Decode(String),
    #[error(transparent)]
    Backend(#[from] StoreError),
    #[error("notification registry poisoned: {0}")]
    Poisoned(&'static str),
}
