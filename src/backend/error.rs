use thiserror::Error;

use super::Family;

/// Startup failures. Everything else about backend selection degrades to
/// local-only instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
    /// The family must be cluster-wide but no distributed backend answered.
    #[error("{family} requires a distributed backend but none is available")]
    DistributedRequired { family: Family },
    #[error("unknown {family} provider {name:?}")]
    UnknownProvider { family: Family, name: String },
    #[error("invalid backend configuration: {0}")]
    Config(String),
    #[error("invalid endpoint {0:?}")]
    InvalidEndpoint(String),
}
