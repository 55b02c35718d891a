use thiserror::Error;

/// Errors returned by the keyed remote store and the clients behind it.
///
/// Every variant is a "backend-unavailable" flavour from the point of view of
/// entity state: callers fall back to local values instead of surfacing them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backend could not be reached or refused the request.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    /// The backend did not answer within the client's bounded wait.
    #[error("backend timed out after {0} ms")]
    Timeout(u64),
    /// A key holds a value of a different kind than the operation expects.
    #[error("wrong value type stored at {key}")]
    WrongType { key: String },
    /// An in-process lock guarding client state was poisoned.
    #[error("store lock poisoned during {0}")]
    LockPoisoned(&'static str),
}
