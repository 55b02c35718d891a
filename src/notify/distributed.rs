use std::sync::Arc;

use tracing::{debug, error};
use uuid::Uuid;

use super::{ChangeEvent, ChangeHandler, ChangeTransport, NotifyError, Subscription};
use crate::store::KeyValueClient;

const CHANNEL_PREFIX: &str = "changes:";

/// Change notification over the shared store's pub/sub channels, one
/// channel per resource.
pub struct DistributedChangeTransport {
    client: Arc<dyn KeyValueClient>,
    node_id: String,
}

impl DistributedChangeTransport {
    pub fn new(client: Arc<dyn KeyValueClient>) -> Self {
        Self::with_node_id(client, Uuid::new_v4().to_string())
    }

    pub fn with_node_id(client: Arc<dyn KeyValueClient>, node_id: impl Into<String>) -> Self {
        Self {
            client,
            node_id: node_id.into(),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    fn channel(resource: &str) -> String {
        format!("{}{}", CHANNEL_PREFIX, resource)
    }
}

impl ChangeTransport for DistributedChangeTransport {
    fn publish(&self, event: &ChangeEvent) -> Result<(), NotifyError> {
        let wire = if event.origin.is_empty() {
            event.clone().with_origin(self.node_id.as_str()).to_wire()?
        } else {
            event.to_wire()?
        };
        let receivers = self.client.publish(&Self::channel(&event.resource), &wire)?;
        debug!(resource = %event.resource, kind = %event.kind, receivers, "published change");
        Ok(())
    }

    fn subscribe(&self, resource: &str, handler: ChangeHandler) -> Result<Subscription, NotifyError> {
        let channel = Self::channel(resource);
        let on_message = {
            let channel = channel.clone();
            Arc::new(move |message: &str| match ChangeEvent::from_wire(message) {
                Ok(event) => handler(&event),
                Err(err) => error!(channel = %channel, error = %err, "dropping undecodable change message"),
            })
        };
        let id = self.client.subscribe(&channel, on_message)?;
        Ok(Subscription {
            id,
            resource: resource.to_string(),
        })
    }

    fn unsubscribe(&self, subscription: &Subscription) -> Result<bool, NotifyError> {
        Ok(self.client.unsubscribe(subscription.id)?)
    }
}
