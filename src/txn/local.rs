use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use super::TxnTracker;
use crate::store::StoreError;

#[derive(Debug, Default)]
pub struct LocalTxnTracker {
    active: Mutex<HashMap<i32, BTreeSet<i64>>>,
}

impl LocalTxnTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TxnTracker for LocalTxnTracker {
    fn add_active(&self, mailbox_id: i32, txn_id: i64) -> Result<(), StoreError> {
        let mut active = self
            .active
            .lock()
            .map_err(|_| StoreError::LockPoisoned("txn tracker"))?;
        active.entry(mailbox_id).or_default().insert(txn_id);
        Ok(())
    }

    fn remove_active(&self, mailbox_id: i32, txn_id: i64) -> Result<bool, StoreError> {
        let mut active = self
            .active
            .lock()
            .map_err(|_| StoreError::LockPoisoned("txn tracker"))?;
        let Some(ids) = active.get_mut(&mailbox_id) else {
            return Ok(false);
        };
        let removed = ids.remove(&txn_id);
        if ids.is_empty() {
            active.remove(&mailbox_id);
        }
        Ok(removed)
    }

    fn active(&self, mailbox_id: i32) -> Result<Vec<i64>, StoreError> {
        let active = self
            .active
            .lock()
            .map_err(|_| StoreError::LockPoisoned("txn tracker"))?;
        Ok(active
            .get(&mailbox_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default())
    }
}
