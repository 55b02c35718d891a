use std::sync::{Arc, Mutex};

use super::Endpoint;
use crate::store::{InMemoryKeyValueClient, KeyValueClient, StoreError};

/// Builds store clients for each topology. Implementations wrap a concrete
/// network client; connecting need not contact the server, since the
/// selector probes every client it gets back.
pub trait Connector: Send + Sync {
    fn connect_cluster(&self, nodes: &[Endpoint]) -> Result<Arc<dyn KeyValueClient>, StoreError>;

    fn connect_single(&self, node: &Endpoint) -> Result<Arc<dyn KeyValueClient>, StoreError>;

    fn connect_sentinel(
        &self,
        master: &str,
        sentinels: &[Endpoint],
    ) -> Result<Arc<dyn KeyValueClient>, StoreError>;
}

/// Connector over in-memory stores. Topologies without a store configured
/// refuse to connect.
#[derive(Default)]
pub struct InMemoryConnector {
    cluster: Option<InMemoryKeyValueClient>,
    single: Option<InMemoryKeyValueClient>,
    attempts: Mutex<Vec<String>>,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cluster(mut self, client: InMemoryKeyValueClient) -> Self {
        self.cluster = Some(client);
        self
    }

    /// Store answering both single-node and sentinel connections.
    pub fn with_single(mut self, client: InMemoryKeyValueClient) -> Self {
        self.single = Some(client);
        self
    }

    /// Connection attempts so far, as `"cluster"`, `"single host:port"` or
    /// `"sentinel master"`.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts
            .lock()
            .map(|attempts| attempts.clone())
            .unwrap_or_default()
    }

    fn record(&self, attempt: String) {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.push(attempt);
        }
    }

    fn connect(
        client: &Option<InMemoryKeyValueClient>,
        target: &str,
    ) -> Result<Arc<dyn KeyValueClient>, StoreError> {
        match client {
            Some(client) => Ok(Arc::new(client.clone())),
            None => Err(StoreError::Unavailable(format!("nothing listening at {}", target))),
        }
    }
}

impl Connector for InMemoryConnector {
    fn connect_cluster(&self, nodes: &[Endpoint]) -> Result<Arc<dyn KeyValueClient>, StoreError> {
        self.record("cluster".to_string());
        let target = nodes
            .iter()
            .map(Endpoint::to_string)
            .collect::<Vec<_>>()
            .join(",");
        Self::connect(&self.cluster, &target)
    }

    fn connect_single(&self, node: &Endpoint) -> Result<Arc<dyn KeyValueClient>, StoreError> {
        self.record(format!("single {}", node));
        Self::connect(&self.single, &node.to_string())
    }

    fn connect_sentinel(
        &self,
        master: &str,
        _sentinels: &[Endpoint],
    ) -> Result<Arc<dyn KeyValueClient>, StoreError> {
        self.record(format!("sentinel {}", master));
        Self::connect(&self.single, master)
    }
}
