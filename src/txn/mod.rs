//! Per-mailbox registry of in-flight redo-log transactions.

mod distributed;
mod local;

pub use distributed::DistributedTxnTracker;
pub use local::LocalTxnTracker;

use crate::store::StoreError;

pub trait TxnTracker: Send + Sync {
    /// Record `txn_id` as active for `mailbox_id`.
    fn add_active(&self, mailbox_id: i32, txn_id: i64) -> Result<(), StoreError>;

    /// Forget `txn_id`. Returns whether it was active.
    fn remove_active(&self, mailbox_id: i32, txn_id: i64) -> Result<bool, StoreError>;

    /// Active transaction ids of the mailbox, ascending.
    fn active(&self, mailbox_id: i32) -> Result<Vec<i64>, StoreError>;

    fn has_active(&self, mailbox_id: i32) -> Result<bool, StoreError> {
        Ok(!self.active(mailbox_id)?.is_empty())
    }
}
