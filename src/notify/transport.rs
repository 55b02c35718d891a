use std::sync::Arc;

use super::{ChangeEvent, NotifyError};

pub type ChangeHandler = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Handle returned by [`ChangeTransport::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub(crate) id: u64,
    pub(crate) resource: String,
}

impl Subscription {
    pub fn resource(&self) -> &str {
        &self.resource
    }
}

/// Cross-node change notification.
///
/// Delivery is at-least-once. Events for one resource reach a handler in
/// publish order whenever the backing transport preserves order.
pub trait ChangeTransport: Send + Sync {
    fn publish(&self, event: &ChangeEvent) -> Result<(), NotifyError>;

    fn subscribe(&self, resource: &str, handler: ChangeHandler) -> Result<Subscription, NotifyError>;

    /// Returns whether the subscription was still registered.
    fn unsubscribe(&self, subscription: &Subscription) -> Result<bool, NotifyError>;
}
