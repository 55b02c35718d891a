use std::sync::Arc;

use tracing::{debug, error};

use super::TxnTracker;
use crate::store::{KeyValueClient, StoreError};

/// Active transactions kept as a shared set per mailbox, visible to every
/// node.
pub struct DistributedTxnTracker {
    client: Arc<dyn KeyValueClient>,
}

impl DistributedTxnTracker {
    pub fn new(client: Arc<dyn KeyValueClient>) -> Self {
        Self { client }
    }

    fn key(mailbox_id: i32) -> String {
        format!("txn:active:{}", mailbox_id)
    }
}

impl TxnTracker for DistributedTxnTracker {
    fn add_active(&self, mailbox_id: i32, txn_id: i64) -> Result<(), StoreError> {
        self.client.sadd(&Self::key(mailbox_id), &txn_id.to_string())?;
        debug!(mailbox_id, txn_id, "transaction active");
        Ok(())
    }

    fn remove_active(&self, mailbox_id: i32, txn_id: i64) -> Result<bool, StoreError> {
        self.client.srem(&Self::key(mailbox_id), &txn_id.to_string())
    }

    fn active(&self, mailbox_id: i32) -> Result<Vec<i64>, StoreError> {
        let mut ids: Vec<i64> = self
            .client
            .smembers(&Self::key(mailbox_id))?
            .into_iter()
            .filter_map(|member| match member.parse() {
                Ok(id) => Some(id),
                Err(_) => {
                    error!(mailbox_id, member = %member, "ignoring malformed transaction id");
                    None
                }
            })
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }
}
