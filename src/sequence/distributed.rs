use std::sync::Arc;

use tracing::debug;

use super::{Scope, SequenceGenerator};
use crate::store::{KeyValueClient, StoreError};

/// Cluster-wide counter on an atomically incremented shared key.
pub struct DistributedSequenceGenerator {
    client: Arc<dyn KeyValueClient>,
    key: String,
}

impl DistributedSequenceGenerator {
    pub fn new(client: Arc<dyn KeyValueClient>, key: impl Into<String>) -> Self {
        Self {
            client,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl SequenceGenerator for DistributedSequenceGenerator {
    fn next(&self) -> Result<i64, StoreError> {
        let value = self.client.incr(&self.key)?;
        debug!(key = %self.key, value, "allocated sequence value");
        Ok(value)
    }

    fn current(&self) -> Result<i64, StoreError> {
        match self.client.get(&self.key)? {
            None => Ok(0),
            Some(raw) => raw
                .as_int()
                .or_else(|| raw.as_str().and_then(|s| s.parse().ok()))
                .ok_or_else(|| StoreError::WrongType {
                    key: self.key.clone(),
                }),
        }
    }

    fn scope(&self) -> Scope {
        Scope::Cluster
    }
}
