use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::warn;

use super::DeliveryError;

/// Proof of holding a delivery key. Hand it back to the coordinator that
/// issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryPermit {
    key: String,
    token: String,
}

impl DeliveryPermit {
    pub(crate) fn new(key: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            token: token.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Mutual exclusion of deliveries per key (typically a recipient mailbox).
///
/// Implementations guarantee that at most one permit per key is outstanding
/// within their scope: the process for the local coordinator, the cluster
/// for the distributed one.
pub trait DeliveryCoordinator: Send + Sync {
    /// Block until the key is free or `timeout` elapses.
    fn acquire(&self, key: &str, timeout: Duration) -> Result<DeliveryPermit, DeliveryError>;

    /// Give the key back. A permit that no longer owns the key gets
    /// [`DeliveryError::LeaseLost`] and leaves the current holder alone.
    fn release(&self, permit: &DeliveryPermit) -> Result<(), DeliveryError>;

    /// Acquisition wait used by [`DeliveryCoordinatorExt::with_exclusive_delivery`].
    fn default_timeout(&self) -> Duration;

    /// Push back the expiry of a held permit.
    fn renew(&self, _permit: &DeliveryPermit) -> Result<(), DeliveryError> {
        Ok(())
    }

    /// How often a held permit must be renewed, or `None` if it never expires.
    fn renew_interval(&self) -> Option<Duration> {
        None
    }
}

/// Scoped helpers over any [`DeliveryCoordinator`].
pub trait DeliveryCoordinatorExt: DeliveryCoordinator {
    /// Run `action` while holding `key`.
    ///
    /// Expiring permits are renewed from a watchdog thread for as long as
    /// `action` runs. The key is released on every exit path, including a
    /// panic inside `action`. If the permit was lost before release the
    /// action's result is discarded and [`DeliveryError::LeaseLost`] is
    /// returned, since another holder may have run alongside it. Other
    /// release failures are only logged.
    fn with_exclusive_delivery<T, F>(&self, key: &str, action: F) -> Result<T, DeliveryError>
    where
        F: FnOnce() -> T,
    {
        let permit = self.acquire(key, self.default_timeout())?;
        let mut guard = PermitGuard {
            coordinator: self,
            permit: Some(permit),
        };

        let (value, renewed) = match (self.renew_interval(), guard.permit.as_ref()) {
            (Some(interval), Some(permit)) => thread::scope(|scope| {
                let (stop, stopped) = mpsc::channel::<()>();
                let watchdog = scope.spawn(move || keep_alive(self, permit, interval, stopped));
                let value = action();
                drop(stop);
                let renewed = watchdog
                    .join()
                    .unwrap_or(Err(DeliveryError::Poisoned("lease watchdog")));
                (value, renewed)
            }),
            _ => (action(), Ok(())),
        };

        let released = guard.release();
        renewed?;
        match released {
            Err(err @ DeliveryError::LeaseLost { .. }) => Err(err),
            Err(err) => {
                warn!(key, error = %err, "delivery release failed");
                Ok(value)
            }
            Ok(()) => Ok(value),
        }
    }
}

impl<C: DeliveryCoordinator + ?Sized> DeliveryCoordinatorExt for C {}

fn keep_alive<C: DeliveryCoordinator + ?Sized>(
    coordinator: &C,
    permit: &DeliveryPermit,
    interval: Duration,
    stop: Receiver<()>,
) -> Result<(), DeliveryError> {
    loop {
        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => match coordinator.renew(permit) {
                Ok(()) => {}
                Err(DeliveryError::Backend(err)) => {
                    warn!(key = permit.key(), error = %err, "delivery lease renewal failed");
                }
                Err(err) => return Err(err),
            },
            _ => return Ok(()),
        }
    }
}

struct PermitGuard<'a, C: DeliveryCoordinator + ?Sized> {
    coordinator: &'a C,
    permit: Option<DeliveryPermit>,
}

impl<C: DeliveryCoordinator + ?Sized> PermitGuard<'_, C> {
    fn release(&mut self) -> Result<(), DeliveryError> {
        match self.permit.take() {
            Some(permit) => self.coordinator.release(&permit),
            None => Ok(()),
        }
    }
}

impl<C: DeliveryCoordinator + ?Sized> Drop for PermitGuard<'_, C> {
    fn drop(&mut self) {
        if let Some(permit) = self.permit.take() {
            if let Err(err) = self.coordinator.release(&permit) {
                warn!(key = permit.key(), error = %err, "delivery release failed");
            }
        }
    }
}
