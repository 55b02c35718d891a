use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use uuid::Uuid;

use super::{DeliveryCoordinator, DeliveryError, DeliveryPermit};
use crate::store::KeyValueClient;

const KEY_PREFIX: &str = "delivery:";
const POLL_INTERVAL: Duration = Duration::from_millis(25);
/// Shortest lease handed to the store. Anything shorter can expire before
/// the first renewal lands.
pub const MIN_LEASE: Duration = Duration::from_millis(50);

/// Cluster-wide delivery coordinator over a leased key in the shared store.
///
/// Each permit owns a random token; release only deletes the key while it
/// still holds that token, so a holder whose lease expired cannot free a
/// successor's key. Held leases are renewed every third of the lease.
pub struct DistributedDeliveryCoordinator {
    client: Arc<dyn KeyValueClient>,
    lease: Duration,
    timeout: Duration,
}

impl DistributedDeliveryCoordinator {
    pub fn new(client: Arc<dyn KeyValueClient>, lease: Duration, timeout: Duration) -> Self {
        if lease < MIN_LEASE {
            warn!(lease_ms = lease.as_millis() as u64, "delivery lease raised to minimum");
        }
        let lease = lease.max(MIN_LEASE);
        Self {
            client,
            lease,
            timeout,
        }
    }

    fn lease_key(key: &str) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }
}

impl DeliveryCoordinator for DistributedDeliveryCoordinator {
    fn acquire(&self, key: &str, timeout: Duration) -> Result<DeliveryPermit, DeliveryError> {
        let lease_key = Self::lease_key(key);
        let token = Uuid::new_v4().to_string();
        let started = Instant::now();
        let deadline = started.checked_add(timeout);
        loop {
            if self.client.set_nx_px(&lease_key, &token, self.lease)? {
                debug!(key, "delivery lease acquired");
                return Ok(DeliveryPermit::new(key, token));
            }
            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(DeliveryError::Timeout {
                            key: key.to_string(),
                            waited_ms: started.elapsed().as_millis() as u64,
                        });
                    }
                    POLL_INTERVAL.min(deadline - now)
                }
                None => POLL_INTERVAL,
            };
            thread::sleep(pause);
        }
    }

    fn release(&self, permit: &DeliveryPermit) -> Result<(), DeliveryError> {
        let lease_key = Self::lease_key(permit.key());
        if self.client.compare_and_delete(&lease_key, permit.token())? {
            debug!(key = permit.key(), "delivery lease released");
            Ok(())
        } else {
            warn!(key = permit.key(), "delivery lease expired while held");
            Err(DeliveryError::LeaseLost {
                key: permit.key().to_string(),
            })
        }
    }

    fn default_timeout(&self) -> Duration {
        self.timeout
    }

    fn renew(&self, permit: &DeliveryPermit) -> Result<(), DeliveryError> {
        let lease_key = Self::lease_key(permit.key());
        if self.client.extend_lease(&lease_key, permit.token(), self.lease)? {
            Ok(())
        } else {
            warn!(key = permit.key(), "delivery lease lost while held");
            Err(DeliveryError::LeaseLost {
                key: permit.key().to_string(),
            })
        }
    }

    fn renew_interval(&self) -> Option<Duration> {
        Some(self.lease / 3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::DeliveryCoordinatorExt;
    use crate::store::InMemoryKeyValueClient;

    fn coordinator(client: &InMemoryKeyValueClient, lease_ms: u64) -> DistributedDeliveryCoordinator {
        DistributedDeliveryCoordinator::new(
            Arc::new(client.clone()),
            Duration::from_millis(lease_ms),
            Duration::from_millis(60),
        )
    }

    #[test]
    fn two_nodes_exclude_each_other() {
        let client = InMemoryKeyValueClient::new();
        let node_a = coordinator(&client, 10_000);
        let node_b = coordinator(&client, 10_000);

        let permit = node_a.acquire("dave", Duration::from_millis(30)).unwrap();
        assert!(matches!(
            node_b.acquire("dave", Duration::from_millis(30)),
            Err(DeliveryError::Timeout { .. })
        ));
        node_a.release(&permit).unwrap();
        assert!(node_b.acquire("dave", Duration::from_millis(30)).is_ok());
    }

    #[test]
    fn stale_holder_cannot_release_successor() {
        let client = InMemoryKeyValueClient::new();
        let node = coordinator(&client, 50);
        let stale = node.acquire("erin", Duration::from_millis(10)).unwrap();
        thread::sleep(Duration::from_millis(80));

        let fresh = node.acquire("erin", Duration::from_millis(30)).unwrap();
        assert_eq!(
            node.release(&stale),
            Err(DeliveryError::LeaseLost { key: "erin".into() })
        );
        node.release(&fresh).unwrap();
    }

    #[test]
    fn backend_failure_is_not_a_timeout() {
        let client = InMemoryKeyValueClient::new();
        let node = coordinator(&client, 1_000);
        client.set_available(false);
        let err = node.with_exclusive_delivery("frank", || ()).unwrap_err();
        assert!(matches!(err, DeliveryError::Backend(_)));
    }

    #[test]
    fn zero_lease_still_excludes() {
        let client = InMemoryKeyValueClient::new();
        let node_a = coordinator(&client, 0);
        let node_b = coordinator(&client, 0);
        let permit = node_a.acquire("ivy", Duration::from_millis(10)).unwrap();
        assert!(matches!(
            node_b.acquire("ivy", Duration::from_millis(20)),
            Err(DeliveryError::Timeout { .. })
        ));
        node_a.release(&permit).unwrap();
    }

    #[test]
    fn lease_is_renewed_while_action_runs() {
        let client = InMemoryKeyValueClient::new();
        let node_a = Arc::new(coordinator(&client, 90));
        let node_b = coordinator(&client, 90);

        let holder = {
            let node_a = Arc::clone(&node_a);
            thread::spawn(move || {
                node_a.with_exclusive_delivery("jack", || {
                    thread::sleep(Duration::from_millis(400));
                    "delivered"
                })
            })
        };
        thread::sleep(Duration::from_millis(250));
        assert!(matches!(
            node_b.acquire("jack", Duration::from_millis(40)),
            Err(DeliveryError::Timeout { .. })
        ));
        assert_eq!(holder.join().unwrap(), Ok("delivered"));
        assert!(node_b.acquire("jack", Duration::from_millis(40)).is_ok());
    }

    #[test]
    fn lost_lease_is_reported() {
        let client = InMemoryKeyValueClient::new();
        let node = coordinator(&client, 60);
        let outage = client.clone();
        let result = node.with_exclusive_delivery("kate", || {
            outage.set_available(false);
            thread::sleep(Duration::from_millis(150));
            outage.set_available(true);
            thread::sleep(Duration::from_millis(60));
        });
        assert_eq!(result, Err(DeliveryError::LeaseLost { key: "kate".into() }));
    }

    #[test]
    fn huge_timeout_does_not_overflow() {
        let client = InMemoryKeyValueClient::new();
        let node = coordinator(&client, 1_000);
        let permit = node.acquire("liam", Duration::MAX).unwrap();
        node.release(&permit).unwrap();
    }
}
