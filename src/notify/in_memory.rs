use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tracing::debug;

use super::{ChangeEvent, ChangeHandler, ChangeTransport, NotifyError, Subscription};

/// In-process fan-out. Handlers run synchronously on the publishing thread.
#[derive(Default)]
pub struct InMemoryChangeTransport {
    subscribers: Mutex<HashMap<String, Vec<(u64, ChangeHandler)>>>,
    next_id: AtomicU64,
}

impl InMemoryChangeTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChangeTransport for InMemoryChangeTransport {
    fn publish(&self, event: &ChangeEvent) -> Result<(), NotifyError> {
        let handlers: Vec<ChangeHandler> = {
            let subscribers = self
                .subscribers
                .lock()
                .map_err(|_| NotifyError::Poisoned("subscribers"))?;
            subscribers
                .get(&event.resource)
                .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
                .unwrap_or_default()
        };
        debug!(resource = %event.resource, kind = %event.kind, receivers = handlers.len(), "publishing change");
        for handler in handlers {
            handler(event);
        }
        Ok(())
    }

    fn subscribe(&self, resource: &str, handler: ChangeHandler) -> Result<Subscription, NotifyError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.subscribers
            .lock()
            .map_err(|_| NotifyError::Poisoned("subscribers"))?
            .entry(resource.to_string())
            .or_default()
            .push((id, handler));
        Ok(Subscription {
            id,
            resource: resource.to_string(),
        })
    }

    fn unsubscribe(&self, subscription: &Subscription) -> Result<bool, NotifyError> {
        let mut subscribers = self
            .subscribers
            .lock()
            .map_err(|_| NotifyError::Poisoned("subscribers"))?;
        let Some(list) = subscribers.get_mut(&subscription.resource) else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|(id, _)| *id != subscription.id);
        let removed = list.len() != before;
        if list.is_empty() {
            subscribers.remove(&subscription.resource);
        }
        Ok(removed)
    }
}
