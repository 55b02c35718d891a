//! Startup backend selection and construction of every coordination family.
//!
//! ```text
//! BackendConfig ──► BackendSelector::select() ──► BackendSelection (immutable)
//!                          (probe once)                 │
//!                                                       ▼
//!                    Registries: family -> provider name -> constructor
//!                                                       │
//!                                                       ▼
//!   Backends { shared_state, sequence, txn_ids, txn_tracker, delivery, notifications }
//! ```
//!
//! A family with no provider configured follows the selection: `distributed`
//! when a store answered the probe, `local` otherwise. Only the id
//! generators can refuse to start, and only with `require_distributed`: they
//! then need a distributed selection and a cluster-scoped provider.

mod config;
mod connector;
mod error;
mod registry;
mod selector;

pub use config::{
    BackendConfig, Endpoint, DEFAULT_DELIVERY_LEASE_MS, DEFAULT_DELIVERY_WAIT_MS, DEFAULT_PORT,
    DEFAULT_PROBE_TIMEOUT_MS, DEFAULT_SENTINEL_PORT, MAX_DELIVERY_MS,
};
pub use connector::{Connector, InMemoryConnector};
pub use error::InitError;
pub use registry::{Constructor, ProviderRegistry, Registries, DISTRIBUTED, LOCAL};
pub use selector::{BackendMode, BackendSelection, BackendSelector};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::info;

use crate::delivery::DeliveryCoordinator;
use crate::notify::ChangeTransport;
use crate::sequence::{Scope, SequenceGenerator};
use crate::store::SharedStateFactory;
use crate::txn::TxnTracker;

/// Independently configurable backend families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    SharedState,
    Sequence,
    TxnId,
    TxnTracker,
    Delivery,
    Notification,
}

impl Family {
    pub const ALL: [Family; 6] = [
        Family::SharedState,
        Family::Sequence,
        Family::TxnId,
        Family::TxnTracker,
        Family::Delivery,
        Family::Notification,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Family::SharedState => "shared_state",
            Family::Sequence => "sequence",
            Family::TxnId => "txn_id",
            Family::TxnTracker => "txn_tracker",
            Family::Delivery => "delivery",
            Family::Notification => "notification",
        }
    }

    /// Families that must be cluster-wide under `require_distributed`.
    pub fn is_mandatory_distributed(self) -> bool {
        matches!(self, Family::Sequence | Family::TxnId)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = InitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Family::ALL
            .into_iter()
            .find(|family| family.as_str() == s)
            .ok_or_else(|| InitError::Config(format!("unknown backend family {:?}", s)))
    }
}

/// Every coordination family, built from one selection.
#[derive(Clone)]
pub struct Backends {
    pub selection: BackendSelection,
    pub shared_state: SharedStateFactory,
    pub sequence: Arc<dyn SequenceGenerator>,
    pub txn_ids: Arc<dyn SequenceGenerator>,
    pub txn_tracker: Arc<dyn TxnTracker>,
    pub delivery: Arc<dyn DeliveryCoordinator>,
    pub notifications: Arc<dyn ChangeTransport>,
}

impl Backends {
    /// Validate `config`, probe the store once and build every family.
    pub fn initialize(config: &BackendConfig, connector: &dyn Connector) -> Result<Self, InitError> {
        config.validate()?;
        let selection = BackendSelector::new(config, connector).select();
        Self::from_selection(config, selection, &Registries::default())
    }

    pub fn from_selection(
        config: &BackendConfig,
        selection: BackendSelection,
        registries: &Registries,
    ) -> Result<Self, InitError> {
        let sequence = build(&registries.sequence, config, &selection)?;
        let txn_ids = build(&registries.txn_ids, config, &selection)?;
        let backends = Self {
            shared_state: build(&registries.shared_state, config, &selection)?,
            sequence: cluster_scoped(config, Family::Sequence, sequence)?,
            txn_ids: cluster_scoped(config, Family::TxnId, txn_ids)?,
            txn_tracker: build(&registries.txn_tracker, config, &selection)?,
            delivery: build(&registries.delivery, config, &selection)?,
            notifications: build(&registries.notification, config, &selection)?,
            selection,
        };
        info!(mode = ?backends.selection.mode(), "backends initialized");
        Ok(backends)
    }
}

impl fmt::Debug for Backends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backends")
            .field("selection", &self.selection)
            .field("shared_state", &self.shared_state)
            .field("sequence_scope", &self.sequence.scope())
            .field("txn_id_scope", &self.txn_ids.scope())
            .finish_non_exhaustive()
    }
}

fn build<T>(
    registry: &ProviderRegistry<T>,
    config: &BackendConfig,
    selection: &BackendSelection,
) -> Result<T, InitError> {
    let family = registry.family();
    if config.require_distributed && family.is_mandatory_distributed() && !selection.is_distributed() {
        return Err(InitError::DistributedRequired { family });
    }
    let name = config.provider(family).unwrap_or(if selection.is_distributed() {
        DISTRIBUTED
    } else {
        LOCAL
    });
    info!(%family, provider = name, "building backend");
    registry.build(name, selection, config)
}

/// Under `require_distributed`, an id generator must be cluster-wide no
/// matter which provider built it.
fn cluster_scoped(
    config: &BackendConfig,
    family: Family,
    generator: Arc<dyn SequenceGenerator>,
) -> Result<Arc<dyn SequenceGenerator>, InitError> {
    if config.require_distributed && family.is_mandatory_distributed() && generator.scope() != Scope::Cluster {
        return Err(InitError::DistributedRequired { family });
    }
    Ok(generator)
}
