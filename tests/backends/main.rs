use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use mailstate::backend::{
    BackendConfig, BackendMode, BackendSelection, Backends, Family, InMemoryConnector, InitError,
    Registries,
};
use mailstate::delivery::{DeliveryCoordinatorExt, DeliveryError};
use mailstate::notify::ChangeEvent;
use mailstate::sequence::Scope;
use mailstate::state::{ItemData, ItemType, MailItemState};
use mailstate::store::InMemoryKeyValueClient;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config(json: &str) -> BackendConfig {
    BackendConfig::from_json(json).unwrap()
}

/// Two nodes started against the same store.
fn cluster_pair() -> (Backends, Backends) {
    let store = InMemoryKeyValueClient::new();
    let connector = InMemoryConnector::new().with_cluster(store);
    let cfg = config(r#"{"urls": ["redis://store-1:7000", "redis://store-2:7000"], "delivery_wait_ms": 100}"#);
    (
        Backends::initialize(&cfg, &connector).unwrap(),
        Backends::initialize(&cfg, &connector).unwrap(),
    )
}

#[test]
fn no_store_means_local_everything() {
    init_tracing();
    let backends = Backends::initialize(&BackendConfig::default(), &InMemoryConnector::new()).unwrap();
    assert_eq!(backends.selection.mode(), BackendMode::LocalOnly);
    assert!(!backends.shared_state.is_distributed());
    assert!(backends.shared_state.accessor(1, 2).is_none());
    assert_eq!(backends.sequence.scope(), Scope::Process);
    assert_eq!(backends.txn_ids.scope(), Scope::Process);
}

#[test]
fn unreachable_store_degrades_to_local() {
    init_tracing();
    let down = InMemoryKeyValueClient::new();
    down.set_available(false);
    let connector = InMemoryConnector::new().with_cluster(down.clone()).with_single(down);
    let backends =
        Backends::initialize(&config(r#"{"urls": ["redis://store:6379"]}"#), &connector).unwrap();
    assert_eq!(backends.selection.mode(), BackendMode::LocalOnly);
    assert_eq!(backends.sequence.scope(), Scope::Process);
}

#[test]
fn mandatory_distributed_fails_startup() {
    let err = Backends::initialize(
        &config(r#"{"urls": ["redis://store"], "require_distributed": true}"#),
        &InMemoryConnector::new(),
    )
    .err()
    .unwrap();
    assert_eq!(err, InitError::DistributedRequired { family: Family::Sequence });
}

#[test]
fn single_node_satisfies_mandatory_distributed() {
    let connector = InMemoryConnector::new().with_single(InMemoryKeyValueClient::new());
    let backends = Backends::initialize(
        &config(r#"{"urls": ["store"], "require_distributed": true}"#),
        &connector,
    )
    .unwrap();
    assert_eq!(backends.selection.mode(), BackendMode::SingleNode);
    assert_eq!(backends.sequence.scope(), Scope::Cluster);
}

#[test]
fn mandatory_distributed_rejects_process_scoped_overrides() {
    for providers in [r#"{"sequence": "local"}"#, r#"{"txn_id": "local"}"#] {
        let connector = InMemoryConnector::new().with_cluster(InMemoryKeyValueClient::new());
        let json = format!(
            r#"{{"urls": ["a:1"], "require_distributed": true, "providers": {}}}"#,
            providers
        );
        let err = Backends::initialize(&config(&json), &connector).err().unwrap();
        assert!(matches!(err, InitError::DistributedRequired { .. }), "{providers}: {err}");
    }

    let connector = InMemoryConnector::new().with_cluster(InMemoryKeyValueClient::new());
    let backends = Backends::initialize(
        &config(r#"{"urls": ["a:1"], "require_distributed": true, "providers": {"delivery": "local"}}"#),
        &connector,
    )
    .unwrap();
    assert_eq!(backends.sequence.scope(), Scope::Cluster);
    assert_eq!(backends.txn_ids.scope(), Scope::Cluster);
}

#[test]
fn provider_overrides_apply_per_family() {
    let connector = InMemoryConnector::new().with_cluster(InMemoryKeyValueClient::new());
    let backends = Backends::initialize(
        &config(r#"{"urls": ["store"], "providers": {"sequence": "local", "shared_state": "local"}}"#),
        &connector,
    )
    .unwrap();
    assert_eq!(backends.selection.mode(), BackendMode::Cluster);
    assert_eq!(backends.sequence.scope(), Scope::Process);
    assert_eq!(backends.txn_ids.scope(), Scope::Cluster);
    assert!(!backends.shared_state.is_distributed());
}

#[test]
fn unknown_provider_fails_startup() {
    let err = Backends::initialize(
        &config(r#"{"providers": {"delivery": "memcached"}}"#),
        &InMemoryConnector::new(),
    )
    .err()
    .unwrap();
    assert_eq!(
        err,
        InitError::UnknownProvider {
            family: Family::Delivery,
            name: "memcached".into()
        }
    );
}

#[test]
fn explicit_local_selection_builds() {
    let backends = Backends::from_selection(
        &BackendConfig::default(),
        BackendSelection::local_only(),
        &Registries::default(),
    )
    .unwrap();
    assert_eq!(backends.sequence.next().unwrap(), 1);
}

#[test]
fn nodes_share_item_state() {
    init_tracing();
    let (node_a, node_b) = cluster_pair();
    let data = ItemData::new(3, 99, ItemType::Message);

    let mut on_a = MailItemState::new(data.clone());
    on_a.attach_remote_mirror(node_a.shared_state.accessor(3, 99).unwrap());
    let mut on_b = MailItemState::new(data);
    on_b.attach_remote_mirror(node_b.shared_state.accessor(3, 99).unwrap());

    on_a.set_unread_count(12);
    assert_eq!(on_b.unread_count(), 12);
}

#[test]
fn id_generators_are_cluster_wide_and_independent() {
    let (node_a, node_b) = cluster_pair();
    assert_eq!(node_a.sequence.next().unwrap(), 1);
    assert_eq!(node_b.sequence.next().unwrap(), 2);
    assert_eq!(node_b.txn_ids.next().unwrap(), 1);
    assert_eq!(node_a.sequence.current().unwrap(), 2);
}

#[test]
fn txn_tracker_is_shared() {
    let (node_a, node_b) = cluster_pair();
    let txn = node_a.txn_ids.next().unwrap();
    node_a.txn_tracker.add_active(3, txn).unwrap();
    assert_eq!(node_b.txn_tracker.active(3).unwrap(), vec![txn]);
    assert!(node_b.txn_tracker.remove_active(3, txn).unwrap());
    assert!(!node_a.txn_tracker.has_active(3).unwrap());
}

#[test]
fn delivery_is_exclusive_across_nodes() {
    init_tracing();
    let (node_a, node_b) = cluster_pair();
    let node_b = Arc::new(node_b);

    let blocked = node_a
        .delivery
        .with_exclusive_delivery("alice@example.com", || {
            let node_b = Arc::clone(&node_b);
            thread::spawn(move || node_b.delivery.with_exclusive_delivery("alice@example.com", || ()))
                .join()
                .unwrap()
        })
        .unwrap();
    assert!(matches!(blocked, Err(DeliveryError::Timeout { .. })));

    assert!(node_b
        .delivery
        .with_exclusive_delivery("alice@example.com", || ())
        .is_ok());
    assert!(node_a
        .delivery
        .acquire("bob@example.com", Duration::from_millis(10))
        .is_ok());
}

#[test]
fn changes_reach_other_nodes() {
    let (node_a, node_b) = cluster_pair();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    node_b
        .notifications
        .subscribe(
            "mbox:3",
            Arc::new(move |event: &ChangeEvent| sink.lock().unwrap().push(event.kind.clone())),
        )
        .unwrap();

    for kind in ["created", "modified", "deleted"] {
        node_a
            .notifications
            .publish(&ChangeEvent::new("mbox:3", kind, Vec::new()))
            .unwrap();
    }
    assert_eq!(*seen.lock().unwrap(), vec!["created", "modified", "deleted"]);
}
