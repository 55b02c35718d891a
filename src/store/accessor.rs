use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::{KeyValueClient, StoreError, StoreValue};

/// Per-entity handle onto the distributed mirror of that entity's fields.
///
/// All keys are scoped to one namespace derived from the entity id. The
/// handle is shared by every field slot of the entity but never owned by
/// them: dropping a slot does not touch the remote namespace, only
/// `delete()` does.
pub trait SharedStateAccessor: Send + Sync + fmt::Debug {
    fn get(&self, key: &str) -> Result<Option<StoreValue>, StoreError>;

    fn set(&self, key: &str, value: StoreValue) -> Result<(), StoreError>;

    fn unset(&self, key: &str) -> Result<(), StoreError>;

    /// Remove the entity's entire namespace.
    fn delete(&self) -> Result<(), StoreError>;

    /// True if the entity is currently held "hot" in the distributed tier,
    /// even when the key being read has no value yet.
    fn is_in_use(&self) -> Result<bool, StoreError>;
}

/// Namespace for one mailbox item's shared fields.
pub fn item_namespace(mailbox_id: i32, item_id: i32) -> String {
    format!("mbox:{}:item:{}", mailbox_id, item_id)
}

/// `SharedStateAccessor` backed by a hash namespace on a `KeyValueClient`.
///
/// "In use" means the namespace exists: some process has written at least
/// one field of this entity and nobody has detached it since.
#[derive(Clone)]
pub struct DistributedSharedState {
    client: Arc<dyn KeyValueClient>,
    namespace: String,
}

impl DistributedSharedState {
    pub fn new(client: Arc<dyn KeyValueClient>, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    pub fn for_item(client: Arc<dyn KeyValueClient>, mailbox_id: i32, item_id: i32) -> Self {
        Self::new(client, item_namespace(mailbox_id, item_id))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl fmt::Debug for DistributedSharedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributedSharedState")
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl SharedStateAccessor for DistributedSharedState {
    fn get(&self, key: &str) -> Result<Option<StoreValue>, StoreError> {
        self.client.hget(&self.namespace, key)
    }

    fn set(&self, key: &str, value: StoreValue) -> Result<(), StoreError> {
        debug!(namespace = %self.namespace, key, %value, "shared state set");
        self.client.hset(&self.namespace, key, value)
    }

    fn unset(&self, key: &str) -> Result<(), StoreError> {
        self.client.hdel(&self.namespace, key).map(|_| ())
    }

    fn delete(&self) -> Result<(), StoreError> {
        debug!(namespace = %self.namespace, "shared state delete");
        self.client.del(&self.namespace).map(|_| ())
    }

    fn is_in_use(&self) -> Result<bool, StoreError> {
        self.client.exists(&self.namespace)
    }
}

/// Hands out per-item mirrors for the "field mirror" backend family.
///
/// A local-only deployment gets a factory without a client, which never
/// produces a mirror: entity state then stays purely local.
#[derive(Clone, Default)]
pub struct SharedStateFactory {
    client: Option<Arc<dyn KeyValueClient>>,
}

impl SharedStateFactory {
    pub fn distributed(client: Arc<dyn KeyValueClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    pub fn local_only() -> Self {
        Self { client: None }
    }

    pub fn is_distributed(&self) -> bool {
        self.client.is_some()
    }

    /// Mirror handle for an item, or `None` when sharing is not available.
    pub fn accessor(&self, mailbox_id: i32, item_id: i32) -> Option<Arc<dyn SharedStateAccessor>> {
        self.client.as_ref().map(|client| {
            Arc::new(DistributedSharedState::for_item(
                Arc::clone(client),
                mailbox_id,
                item_id,
            )) as Arc<dyn SharedStateAccessor>
        })
    }
}

impl fmt::Debug for SharedStateFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedStateFactory")
            .field("distributed", &self.is_distributed())
            .finish()
    }
}
