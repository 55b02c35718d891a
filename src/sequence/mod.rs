//! Monotonic id generators: redo-log sequence numbers and transaction ids.
//!
//! Both families share one trait; they differ only in the shared key they
//! count on, so a cluster keeps two independent counters.

mod distributed;
mod local;

pub use distributed::DistributedSequenceGenerator;
pub use local::LocalSequenceGenerator;

use crate::store::StoreError;

/// Shared-store key of the redo-log sequence counter.
pub const SEQUENCE_KEY: &str = "redolog:seq";
/// Shared-store key of the transaction id counter.
pub const TXN_ID_KEY: &str = "redolog:txnid";

/// Range over which `next()` is guaranteed strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Process,
    Cluster,
}

pub trait SequenceGenerator: Send + Sync {
    /// Allocate the next value. Strictly greater than every value previously
    /// returned within [`scope`](Self::scope).
    fn next(&self) -> Result<i64, StoreError>;

    /// Last value handed out, or 0 when none has been.
    fn current(&self) -> Result<i64, StoreError>;

    fn scope(&self) -> Scope;
}
