use std::sync::Arc;
use std::time::Duration;

use super::{StoreError, StoreValue};

/// Callback invoked for every message delivered on a subscribed channel.
pub type MessageHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Opaque key-value RPC client for the distributed tier.
///
/// This is the only surface the crate needs from a networked backend. A
/// Redis-style client (standalone, sentinel-managed or cluster) fits it
/// directly; `InMemoryKeyValueClient` implements it for tests and
/// single-process deployments.
///
/// Every call is blocking and may fail with a `StoreError`. Implementations
/// must be safe to share across threads.
pub trait KeyValueClient: Send + Sync {
    /// Round-trip liveness check.
    fn ping(&self) -> Result<(), StoreError>;

    // --- per-namespace hashes (entity mirrors) ---

    /// Read one key of a namespace.
    fn hget(&self, namespace: &str, key: &str) -> Result<Option<StoreValue>, StoreError>;

    /// Write one key of a namespace, creating the namespace if needed.
    fn hset(&self, namespace: &str, key: &str, value: StoreValue) -> Result<(), StoreError>;

    /// Remove one key of a namespace. Returns true if it existed.
    fn hdel(&self, namespace: &str, key: &str) -> Result<bool, StoreError>;

    /// Remove a whole namespace. Returns true if it existed.
    fn del(&self, namespace: &str) -> Result<bool, StoreError>;

    /// Whether the namespace currently exists (holds at least one key).
    fn exists(&self, namespace: &str) -> Result<bool, StoreError>;

    // --- scalars and counters ---

    fn get(&self, key: &str) -> Result<Option<StoreValue>, StoreError>;

    fn set(&self, key: &str, value: StoreValue) -> Result<(), StoreError>;

    /// Atomically increment an integer key (missing keys start at 0) and
    /// return the new value.
    fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// Set `key` to `value` only if absent, with a lease after which the key
    /// expires on its own. Returns true if the key was set.
    fn set_nx_px(&self, key: &str, value: &str, lease: Duration) -> Result<bool, StoreError>;

    /// Delete `key` only if it still holds `expected`. Returns true if deleted.
    fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, StoreError>;

    /// Reset the lease on `key` to `lease` from now, only if it still holds
    /// `expected`. Returns false if the key expired or changed hands.
    fn extend_lease(&self, key: &str, expected: &str, lease: Duration) -> Result<bool, StoreError>;

    // --- sets ---

    fn sadd(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    fn srem(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError>;

    // --- pub/sub ---

    /// Publish a message on a channel. Returns the number of receivers.
    fn publish(&self, channel: &str, message: &str) -> Result<usize, StoreError>;

    /// Register a handler for a channel. Returns a subscription id.
    fn subscribe(&self, channel: &str, handler: MessageHandler) -> Result<u64, StoreError>;

    /// Drop a subscription. Returns true if it was registered.
    fn unsubscribe(&self, subscription: u64) -> Result<bool, StoreError>;
}
