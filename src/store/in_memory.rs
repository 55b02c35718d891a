//! In-memory key-value client for testing and single-process scenarios.
//!
//! Clones share the same storage, so handing clones to several
//! `MailItemState`s (or several "processes" in a test) behaves like many
//! clients talking to one distributed tier.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use super::{KeyValueClient, MessageHandler, StoreError, StoreValue};

#[derive(Default)]
struct Storage {
    hashes: HashMap<String, HashMap<String, StoreValue>>,
    scalars: HashMap<String, StoreValue>,
    leases: HashMap<String, (String, Instant)>,
    sets: HashMap<String, BTreeSet<String>>,
}

struct Channels {
    handlers: HashMap<String, Vec<(u64, MessageHandler)>>,
}

/// In-memory `KeyValueClient` backed by `Arc<RwLock<..>>` maps.
///
/// Availability can be toggled with `set_available(false)` to simulate a
/// backend outage: every call then fails with `StoreError::Unavailable`.
#[derive(Clone)]
pub struct InMemoryKeyValueClient {
    storage: Arc<RwLock<Storage>>,
    channels: Arc<Mutex<Channels>>,
    next_subscription: Arc<AtomicU64>,
    available: Arc<AtomicBool>,
}

impl Default for InMemoryKeyValueClient {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryKeyValueClient {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(Storage::default())),
            channels: Arc::new(Mutex::new(Channels {
                handlers: HashMap::new(),
            })),
            next_subscription: Arc::new(AtomicU64::new(1)),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Simulate the backend going away (or coming back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Direct inspection: does the namespace exist? Ignores availability.
    pub fn namespace_exists(&self, namespace: &str) -> bool {
        self.storage
            .read()
            .map(|s| s.hashes.contains_key(namespace))
            .unwrap_or(false)
    }

    /// Direct inspection: a copy of every key in a namespace.
    pub fn namespace_fields(&self, namespace: &str) -> HashMap<String, StoreValue> {
        self.storage
            .read()
            .ok()
            .and_then(|s| s.hashes.get(namespace).cloned())
            .unwrap_or_default()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory backend offline".into()))
        }
    }

    fn read(&self, op: &'static str) -> Result<std::sync::RwLockReadGuard<'_, Storage>, StoreError> {
        self.check()?;
        self.storage.read().map_err(|_| StoreError::LockPoisoned(op))
    }

    fn write(&self, op: &'static str) -> Result<std::sync::RwLockWriteGuard<'_, Storage>, StoreError> {
        self.check()?;
        self.storage.write().map_err(|_| StoreError::LockPoisoned(op))
    }
}

impl KeyValueClient for InMemoryKeyValueClient {
    fn ping(&self) -> Result<(), StoreError> {
        self.check()
    }

    fn hget(&self, namespace: &str, key: &str) -> Result<Option<StoreValue>, StoreError> {
        let storage = self.read("hget")?;
        Ok(storage
            .hashes
            .get(namespace)
            .and_then(|fields| fields.get(key))
            .cloned())
    }

    fn hset(&self, namespace: &str, key: &str, value: StoreValue) -> Result<(), StoreError> {
        let mut storage = self.write("hset")?;
        storage
            .hashes
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    fn hdel(&self, namespace: &str, key: &str) -> Result<bool, StoreError> {
        let mut storage = self.write("hdel")?;
        let Some(fields) = storage.hashes.get_mut(namespace) else {
            return Ok(false);
        };
        let removed = fields.remove(key).is_some();
        // An emptied hash stops existing, as it would in Redis.
        if fields.is_empty() {
            storage.hashes.remove(namespace);
        }
        Ok(removed)
    }

    fn del(&self, namespace: &str) -> Result<bool, StoreError> {
        let mut storage = self.write("del")?;
        Ok(storage.hashes.remove(namespace).is_some())
    }

    fn exists(&self, namespace: &str) -> Result<bool, StoreError> {
        let storage = self.read("exists")?;
        Ok(storage.hashes.contains_key(namespace))
    }

    fn get(&self, key: &str) -> Result<Option<StoreValue>, StoreError> {
        let storage = self.read("get")?;
        Ok(storage.scalars.get(key).cloned())
    }

    fn set(&self, key: &str, value: StoreValue) -> Result<(), StoreError> {
        let mut storage = self.write("set")?;
        storage.scalars.insert(key.to_string(), value);
        Ok(())
    }

    fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut storage = self.write("incr")?;
        let current = match storage.scalars.get(key) {
            None => 0,
            Some(StoreValue::Int(n)) => *n,
            Some(StoreValue::Str(s)) => s.parse::<i64>().map_err(|_| StoreError::WrongType {
                key: key.to_string(),
            })?,
        };
        let next = current + 1;
        storage.scalars.insert(key.to_string(), StoreValue::Int(next));
        Ok(next)
    }

    fn set_nx_px(&self, key: &str, value: &str, lease: Duration) -> Result<bool, StoreError> {
        let mut storage = self.write("set_nx_px")?;
        let now = Instant::now();
        if let Some((_, expires)) = storage.leases.get(key) {
            if *expires > now {
                return Ok(false);
            }
        }
        storage
            .leases
            .insert(key.to_string(), (value.to_string(), now + lease));
        Ok(true)
    }

    fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let mut storage = self.write("compare_and_delete")?;
        let matches = matches!(
            storage.leases.get(key),
            Some((holder, expires)) if holder == expected && *expires > Instant::now()
        );
        if matches {
            storage.leases.remove(key);
        }
        Ok(matches)
    }

    fn extend_lease(&self, key: &str, expected: &str, lease: Duration) -> Result<bool, StoreError> {
        let mut storage = self.write("extend_lease")?;
        let now = Instant::now();
        match storage.leases.get_mut(key) {
            Some((holder, expires)) if holder == expected && *expires > now => {
                *expires = now + lease;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn sadd(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut storage = self.write("sadd")?;
        Ok(storage
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string()))
    }

    fn srem(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut storage = self.write("srem")?;
        let Some(members) = storage.sets.get_mut(key) else {
            return Ok(false);
        };
        let removed = members.remove(member);
        if members.is_empty() {
            storage.sets.remove(key);
        }
        Ok(removed)
    }

    fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let storage = self.read("smembers")?;
        Ok(storage
            .sets
            .get(key)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn publish(&self, channel: &str, message: &str) -> Result<usize, StoreError> {
        self.check()?;
        // Copy the handlers out so a handler may publish or subscribe itself.
        let handlers: Vec<MessageHandler> = {
            let channels = self
                .channels
                .lock()
                .map_err(|_| StoreError::LockPoisoned("publish"))?;
            channels
                .handlers
                .get(channel)
                .map(|subs| subs.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default()
        };
        for handler in &handlers {
            handler(message);
        }
        Ok(handlers.len())
    }

    fn subscribe(&self, channel: &str, handler: MessageHandler) -> Result<u64, StoreError> {
        self.check()?;
        let id = self.next_subscription.fetch_add(1, Ordering::SeqCst);
        let mut channels = self
            .channels
            .lock()
            .map_err(|_| StoreError::LockPoisoned("subscribe"))?;
        channels
            .handlers
            .entry(channel.to_string())
            .or_default()
            .push((id, handler));
        Ok(id)
    }

    fn unsubscribe(&self, subscription: u64) -> Result<bool, StoreError> {
        self.check()?;
        let mut channels = self
            .channels
            .lock()
            .map_err(|_| StoreError::LockPoisoned("unsubscribe"))?;
        let mut removed = false;
        for subs in channels.handlers.values_mut() {
            let before = subs.len();
            subs.retain(|(id, _)| *id != subscription);
            removed |= subs.len() != before;
        }
        channels.handlers.retain(|_, subs| !subs.is_empty());
        Ok(removed)
    }
}
