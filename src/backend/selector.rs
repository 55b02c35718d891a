use std::fmt;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use tracing::{error, info};

use super::{BackendConfig, Connector};
use crate::store::{KeyValueClient, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    Cluster,
    SingleNode,
    LocalOnly,
}

/// Outcome of the startup probe. Fixed for the life of the process; every
/// family is built from the same selection.
#[derive(Clone)]
pub struct BackendSelection {
    mode: BackendMode,
    client: Option<Arc<dyn KeyValueClient>>,
}

impl BackendSelection {
    pub fn local_only() -> Self {
        Self {
            mode: BackendMode::LocalOnly,
            client: None,
        }
    }

    pub fn distributed(mode: BackendMode, client: Arc<dyn KeyValueClient>) -> Self {
        Self {
            mode,
            client: Some(client),
        }
    }

    pub fn mode(&self) -> BackendMode {
        self.mode
    }

    pub fn client(&self) -> Option<&Arc<dyn KeyValueClient>> {
        self.client.as_ref()
    }

    pub fn is_distributed(&self) -> bool {
        self.client.is_some()
    }
}

impl fmt::Debug for BackendSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSelection")
            .field("mode", &self.mode)
            .field("connected", &self.client.is_some())
            .finish()
    }
}

/// Probes the configured topology once.
///
/// ```text
/// no endpoints ─────────────────────────────────────────────► LocalOnly
/// cluster_mode: connect_cluster + ping ──── ok ─────────────► Cluster
/// sentinel configured: connect_sentinel + ping ── ok ───────► SingleNode
/// otherwise: connect_single(first url) + ping ── ok ────────► SingleNode
/// ──────────────────────────────────────────────────────────► LocalOnly
/// ```
///
/// Each probe is a single ping bounded by `probe_timeout_ms`, never
/// retried. Selection itself never fails.
pub struct BackendSelector<'a> {
    config: &'a BackendConfig,
    connector: &'a dyn Connector,
}

impl<'a> BackendSelector<'a> {
    pub fn new(config: &'a BackendConfig, connector: &'a dyn Connector) -> Self {
        Self { config, connector }
    }

    pub fn select(&self) -> BackendSelection {
        if !self.config.has_endpoints() {
            info!("no shared store endpoints configured, running local-only");
            return BackendSelection::local_only();
        }
        let endpoints = match self.config.endpoints() {
            Ok(endpoints) => endpoints,
            Err(err) => {
                error!(error = %err, "cannot parse shared store endpoints, running local-only");
                return BackendSelection::local_only();
            }
        };

        if self.config.cluster_mode && !endpoints.is_empty() {
            match self.try_connect(|| self.connector.connect_cluster(&endpoints)) {
                Ok(client) => {
                    info!(nodes = endpoints.len(), "using shared store cluster");
                    return BackendSelection::distributed(BackendMode::Cluster, client);
                }
                Err(err) => info!(error = %err, "shared store cluster unavailable, trying single node"),
            }
        }

        let single = match (self.config.sentinel(), endpoints.first()) {
            (Some(master), _) => match self.config.sentinel_endpoints() {
                Ok(sentinels) => {
                    info!(master, sentinels = sentinels.len(), "using sentinels");
                    self.try_connect(|| self.connector.connect_sentinel(master, &sentinels))
                }
                Err(err) => Err(StoreError::Unavailable(err.to_string())),
            },
            (None, Some(node)) => self.try_connect(|| self.connector.connect_single(node)),
            (None, None) => Err(StoreError::Unavailable("no single-node endpoint".into())),
        };
        match single {
            Ok(client) => {
                info!("using single-node shared store");
                BackendSelection::distributed(BackendMode::SingleNode, client)
            }
            Err(err) => {
                info!(error = %err, "shared store unavailable, running local-only");
                BackendSelection::local_only()
            }
        }
    }

    fn try_connect<F>(&self, connect: F) -> Result<Arc<dyn KeyValueClient>, StoreError>
    where
        F: FnOnce() -> Result<Arc<dyn KeyValueClient>, StoreError>,
    {
        let client = connect()?;
        probe(Arc::clone(&client), self.config.probe_timeout())?;
        Ok(client)
    }
}

/// One ping, abandoned (not cancelled) after `timeout`.
fn probe(client: Arc<dyn KeyValueClient>, timeout: Duration) -> Result<(), StoreError> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("store-probe".into())
        .spawn(move || {
            let _ = tx.send(client.ping());
        })
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;
    rx.recv_timeout(timeout)
        .unwrap_or(Err(StoreError::Timeout(timeout.as_millis() as u64)))
}
