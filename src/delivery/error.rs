use thiserror::Error;

use crate::store::StoreError;

/// Error type for delivery coordination.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Another holder kept the key for the whole acquisition wait.
    #[error("timed out after {waited_ms}ms waiting for exclusive delivery on {key}")]
    Timeout { key: String, waited_ms: u64 },
    /// The distributed lease ran out before it was released; another holder
    /// may have run concurrently.
    #[error("delivery lease on {key} expired before release")]
    LeaseLost { key: String },
    /// The shared store failed.
    #[error(transparent)]
    Backend(#[from] StoreError),
    /// A local lock primitive was poisoned by a panicking holder.
    #[error("delivery lock poisoned: {0}")]
    Poisoned(&'static str),
}
