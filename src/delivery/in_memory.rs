use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use tracing::debug;
use uuid::Uuid;

use super::{DeliveryCoordinator, DeliveryError, DeliveryPermit};

/// One key's slot: the holder's token behind a `Mutex` + `Condvar`, with a
/// bounded wait.
struct DeliverySlot {
    holder: Mutex<Option<String>>,
    wake: Condvar,
}

impl DeliverySlot {
    fn new() -> Self {
        DeliverySlot {
            holder: Mutex::new(None),
            wake: Condvar::new(),
        }
    }

    /// Wait until the slot is free and take it with `token`. `None` for the
    /// deadline waits without bound.
    fn acquire(&self, token: &str, deadline: Option<Instant>) -> Result<bool, DeliveryError> {
        let mut holder = self
            .holder
            .lock()
            .map_err(|_| DeliveryError::Poisoned("delivery slot"))?;
        while holder.is_some() {
            holder = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(false);
                    }
                    self.wake
                        .wait_timeout(holder, deadline - now)
                        .map_err(|_| DeliveryError::Poisoned("delivery slot"))?
                        .0
                }
                None => self
                    .wake
                    .wait(holder)
                    .map_err(|_| DeliveryError::Poisoned("delivery slot"))?,
            };
        }
        *holder = Some(token.to_string());
        Ok(true)
    }

    /// Free the slot if `token` still holds it.
    fn release(&self, token: &str) -> Result<bool, DeliveryError> {
        let mut holder = self
            .holder
            .lock()
            .map_err(|_| DeliveryError::Poisoned("delivery slot"))?;
        if holder.as_deref() != Some(token) {
            return Ok(false);
        }
        *holder = None;
        self.wake.notify_one();
        Ok(true)
    }

    fn is_free(&self) -> Result<bool, DeliveryError> {
        Ok(self
            .holder
            .lock()
            .map_err(|_| DeliveryError::Poisoned("delivery slot"))?
            .is_none())
    }
}

/// Process-local delivery coordinator.
///
/// Slots are created on first use of a key and dropped again once the key
/// is free with nobody waiting on it.
pub struct InMemoryDeliveryCoordinator {
    slots: Mutex<HashMap<String, Arc<DeliverySlot>>>,
    timeout: Duration,
}

impl InMemoryDeliveryCoordinator {
    pub fn new(timeout: Duration) -> Self {
        InMemoryDeliveryCoordinator {
            slots: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    fn slots(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Arc<DeliverySlot>>>, DeliveryError> {
        self.slots
            .lock()
            .map_err(|_| DeliveryError::Poisoned("delivery slot map"))
    }

    fn slot(&self, key: &str) -> Result<Arc<DeliverySlot>, DeliveryError> {
        Ok(self
            .slots()?
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(DeliverySlot::new()))
            .clone())
    }

    /// Drop the key's slot if it is free and only the map refers to it.
    fn prune(&self, key: &str) -> Result<(), DeliveryError> {
        let mut slots = self.slots()?;
        let idle = match slots.get(key) {
            Some(slot) => Arc::strong_count(slot) == 1 && slot.is_free()?,
            None => false,
        };
        if idle {
            slots.remove(key);
        }
        Ok(())
    }
}

impl Default for InMemoryDeliveryCoordinator {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::backend::DEFAULT_DELIVERY_WAIT_MS))
    }
}

impl DeliveryCoordinator for InMemoryDeliveryCoordinator {
    fn acquire(&self, key: &str, timeout: Duration) -> Result<DeliveryPermit, DeliveryError> {
        let started = Instant::now();
        let token = Uuid::new_v4().to_string();
        let acquired = self.slot(key)?.acquire(&token, started.checked_add(timeout))?;
        if acquired {
            debug!(key, "delivery slot acquired");
            return Ok(DeliveryPermit::new(key, token));
        }
        self.prune(key)?;
        Err(DeliveryError::Timeout {
            key: key.to_string(),
            waited_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn release(&self, permit: &DeliveryPermit) -> Result<(), DeliveryError> {
        let lost = || DeliveryError::LeaseLost {
            key: permit.key().to_string(),
        };
        let slot = self.slots()?.get(permit.key()).cloned().ok_or_else(lost)?;
        if !slot.release(permit.token())? {
            return Err(lost());
        }
        drop(slot);
        self.prune(permit.key())?;
        debug!(key = permit.key(), "delivery slot released");
        Ok(())
    }

    fn default_timeout(&self) -> Duration {
        self.timeout
    }
}
