use std::collections::BTreeMap;
use std::sync::Arc;

use super::{BackendConfig, BackendSelection, Family, InitError};
use crate::delivery::{DeliveryCoordinator, DistributedDeliveryCoordinator, InMemoryDeliveryCoordinator};
use crate::notify::{ChangeTransport, DistributedChangeTransport, InMemoryChangeTransport};
use crate::sequence::{DistributedSequenceGenerator, LocalSequenceGenerator, SequenceGenerator, SEQUENCE_KEY, TXN_ID_KEY};
use crate::store::{KeyValueClient, SharedStateFactory};
use crate::txn::{DistributedTxnTracker, LocalTxnTracker, TxnTracker};

pub const LOCAL: &str = "local";
pub const DISTRIBUTED: &str = "distributed";

/// Builds one family's implementation from the startup selection.
pub type Constructor<T> = fn(&BackendSelection, &BackendConfig) -> Result<T, InitError>;

/// Name to constructor table for one family.
pub struct ProviderRegistry<T> {
    family: Family,
    providers: BTreeMap<String, Constructor<T>>,
}

impl<T> ProviderRegistry<T> {
    pub fn new(family: Family) -> Self {
        Self {
            family,
            providers: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, constructor: Constructor<T>) -> &mut Self {
        self.providers.insert(name.into(), constructor);
        self
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    pub fn build(
        &self,
        name: &str,
        selection: &BackendSelection,
        config: &BackendConfig,
    ) -> Result<T, InitError> {
        let constructor = self
            .providers
            .get(name)
            .ok_or_else(|| InitError::UnknownProvider {
                family: self.family,
                name: name.to_string(),
            })?;
        constructor(selection, config)
    }
}

fn client_for(family: Family, selection: &BackendSelection) -> Result<Arc<dyn KeyValueClient>, InitError> {
    selection
        .client()
        .cloned()
        .ok_or(InitError::DistributedRequired { family })
}

/// One registry per family, preloaded with the `local` and `distributed`
/// providers.
pub struct Registries {
    pub shared_state: ProviderRegistry<SharedStateFactory>,
    pub sequence: ProviderRegistry<Arc<dyn SequenceGenerator>>,
    pub txn_ids: ProviderRegistry<Arc<dyn SequenceGenerator>>,
    pub txn_tracker: ProviderRegistry<Arc<dyn TxnTracker>>,
    pub delivery: ProviderRegistry<Arc<dyn DeliveryCoordinator>>,
    pub notification: ProviderRegistry<Arc<dyn ChangeTransport>>,
}

impl Default for Registries {
    fn default() -> Self {
        let mut shared_state: ProviderRegistry<SharedStateFactory> = ProviderRegistry::new(Family::SharedState);
        shared_state
            .register(LOCAL, |_, _| Ok(SharedStateFactory::local_only()))
            .register(DISTRIBUTED, |selection, _| {
                Ok(SharedStateFactory::distributed(client_for(Family::SharedState, selection)?))
            });

        let mut sequence: ProviderRegistry<Arc<dyn SequenceGenerator>> = ProviderRegistry::new(Family::Sequence);
        sequence
            .register(LOCAL, |_, _| Ok(Arc::new(LocalSequenceGenerator::new())))
            .register(DISTRIBUTED, |selection, _| {
                let client = client_for(Family::Sequence, selection)?;
                Ok(Arc::new(DistributedSequenceGenerator::new(client, SEQUENCE_KEY)))
            });

        let mut txn_ids: ProviderRegistry<Arc<dyn SequenceGenerator>> = ProviderRegistry::new(Family::TxnId);
        txn_ids
            .register(LOCAL, |_, _| Ok(Arc::new(LocalSequenceGenerator::new())))
            .register(DISTRIBUTED, |selection, _| {
                let client = client_for(Family::TxnId, selection)?;
                Ok(Arc::new(DistributedSequenceGenerator::new(client, TXN_ID_KEY)))
            });

        let mut txn_tracker: ProviderRegistry<Arc<dyn TxnTracker>> = ProviderRegistry::new(Family::TxnTracker);
        txn_tracker
            .register(LOCAL, |_, _| Ok(Arc::new(LocalTxnTracker::new())))
            .register(DISTRIBUTED, |selection, _| {
                Ok(Arc::new(DistributedTxnTracker::new(client_for(Family::TxnTracker, selection)?)))
            });

        let mut delivery: ProviderRegistry<Arc<dyn DeliveryCoordinator>> = ProviderRegistry::new(Family::Delivery);
        delivery
            .register(LOCAL, |_, config| {
                Ok(Arc::new(InMemoryDeliveryCoordinator::new(config.delivery_wait())))
            })
            .register(DISTRIBUTED, |selection, config| {
                Ok(Arc::new(DistributedDeliveryCoordinator::new(
                    client_for(Family::Delivery, selection)?,
                    config.delivery_lease(),
                    config.delivery_wait(),
                )))
            });

        let mut notification: ProviderRegistry<Arc<dyn ChangeTransport>> =
            ProviderRegistry::new(Family::Notification);
        notification
            .register(LOCAL, |_, _| Ok(Arc::new(InMemoryChangeTransport::new())))
            .register(DISTRIBUTED, |selection, _| {
                Ok(Arc::new(DistributedChangeTransport::new(client_for(
                    Family::Notification,
                    selection,
                )?)))
            });

        Self {
            shared_state,
            sequence,
            txn_ids,
            txn_tracker,
            delivery,
            notification,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered() {
        let registries = Registries::default();
        assert_eq!(registries.delivery.names(), vec![DISTRIBUTED, LOCAL]);
        assert_eq!(registries.sequence.family(), Family::Sequence);
    }

    #[test]
    fn unknown_name_is_an_error() {
        let registries = Registries::default();
        let err = registries
            .txn_tracker
            .build("memcached", &BackendSelection::local_only(), &BackendConfig::default())
            .err()
            .unwrap();
        assert_eq!(
            err,
            InitError::UnknownProvider {
                family: Family::TxnTracker,
                name: "memcached".into()
            }
        );
    }

    #[test]
    fn distributed_needs_a_client() {
        let registries = Registries::default();
        let err = registries
            .shared_state
            .build(DISTRIBUTED, &BackendSelection::local_only(), &BackendConfig::default())
            .err()
            .unwrap();
        assert_eq!(err, InitError::DistributedRequired { family: Family::SharedState });
    }

    #[test]
    fn custom_providers_can_be_added() {
        let mut registries = Registries::default();
        registries
            .sequence
            .register("from-100", |_, _| Ok(Arc::new(LocalSequenceGenerator::starting_after(100))));
        let seq = registries
            .sequence
            .build("from-100", &BackendSelection::local_only(), &BackendConfig::default())
            .unwrap();
        assert_eq!(seq.next().unwrap(), 101);
    }
}
