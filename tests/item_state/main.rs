mod support;

use mailstate::state::schema::{F_FLAGS, F_FOLDER_ID, F_METADATA, F_SIZE, F_SUBJECT, F_TAGS};
use mailstate::state::{
    rights, AccessMode, Acl, Color, EncodeMetadata, FieldValue, Flag, GranteeType, ItemData,
    ItemType, MailItemState, Policy, RetentionPolicy, StateError,
};
use mailstate::store::{InMemoryKeyValueClient, StoreValue};
use support::*;

#[test]
fn unattached_state_behaves_like_plain_fields() {
    init_tracing();
    let mut state = MailItemState::new(message());

    state.set_subject(Some("renamed".into()));
    state.set_folder_id(5);
    state.set_size(10);
    state.set_tags(vec!["a".into(), "b".into()]).unwrap();
    state.set_color(Color::mapped(4));

    assert_eq!(state.subject().as_deref(), Some("renamed"));
    assert_eq!(state.folder_id(), 5);
    assert_eq!(state.size(), 10);
    assert_eq!(state.tags(), vec!["a", "b"]);
    assert_eq!(state.color(), Color::mapped(4));
    assert_eq!(state.item_type(), ItemType::Message);
    assert!(!state.has_remote_mirror());
}

#[test]
fn flags_written_elsewhere_win_on_next_read() {
    init_tracing();
    let store = InMemoryKeyValueClient::new();
    let mut state = MailItemState::new(message());

    state.set_flags(5);
    assert_eq!(state.flags(), 5);

    state.attach_remote_mirror(mirror(&store));
    assert_eq!(state.flags(), 5);

    mirror(&store).set(F_FLAGS, StoreValue::Int(9)).unwrap();
    assert_eq!(state.flags(), 9);
    assert_eq!(state.data().flags, 9);
}

#[test]
fn two_nodes_see_each_others_writes() {
    init_tracing();
    let store = InMemoryKeyValueClient::new();
    let mut node_a = attached(&store, message());
    let mut node_b = attached(&store, message());

    node_a.set_subject(Some("from a".into()));
    node_a.set_flag(Flag::Unread);
    node_a.set_tags(vec!["work".into()]).unwrap();

    assert_eq!(node_b.subject().as_deref(), Some("from a"));
    assert!(node_b.is_set(Flag::Unread));
    assert_eq!(node_b.tags(), vec!["work"]);

    node_b.unset_flag(Flag::Unread);
    assert!(!node_a.is_set(Flag::Unread));
}

#[test]
fn in_use_mirror_answers_empty_for_unwritten_fields() {
    let store = InMemoryKeyValueClient::new();
    let mut state = attached(&store, message());
    state.set_flags(1);

    // Another holder has the item hot; fields it never wrote read as empty.
    assert_eq!(state.subject(), None);
    assert!(state.tags().is_empty());
    assert_eq!(state.data().subject, None);
}

#[test]
fn unset_clears_both_tiers() {
    let store = InMemoryKeyValueClient::new();
    let mut state = attached(&store, message());
    state.set_subject(Some("x".into()));
    state.set_tags(vec!["t".into()]).unwrap();

    state.unset_field(F_SUBJECT).unwrap();
    state.unset_field(F_TAGS).unwrap();

    let fields = store.namespace_fields(NAMESPACE);
    assert!(!fields.contains_key(F_SUBJECT));
    assert!(!fields.contains_key(F_TAGS));
    assert_eq!(state.data().subject, None);
    assert!(state.data().tags.is_empty());
}

#[test]
fn resync_populates_an_empty_mirror() {
    init_tracing();
    let store = InMemoryKeyValueClient::new();
    let mut data = message();
    data.tags = vec!["x".into()];
    let snapshot = data.clone();
    let mut state = MailItemState::new(data);
    state.set_rights(Some(Acl::new().grant("bob", GranteeType::User, rights::READ).clone()));

    state.attach_remote_mirror(mirror(&store));
    assert!(!store.namespace_exists(NAMESPACE));

    let report = state.resync_all(&snapshot);
    assert!(report.is_complete());
    assert!(report.snapshot_pushed);

    let fields = store.namespace_fields(NAMESPACE);
    assert_eq!(fields.get(F_SUBJECT), Some(&StoreValue::from("quarterly report")));
    assert_eq!(fields.get(F_FOLDER_ID), Some(&StoreValue::Int(2)));
    assert_eq!(fields.get(F_SIZE), Some(&StoreValue::Int(4096)));
    assert_eq!(fields.get(F_TAGS), Some(&StoreValue::from("x")));
    assert_eq!(
        fields.get(F_METADATA),
        Some(&StoreValue::Str(snapshot.encode_metadata().unwrap()))
    );
    // the pushed blob does not leak into the local metadata
    assert_eq!(state.data().metadata, None);

    let mut other = attached(&store, ItemData::new(MAILBOX, ITEM, ItemType::Unknown));
    assert_eq!(other.item_type(), ItemType::Message);
    assert_eq!(other.rights().map(|acl| acl.rights_for("bob")), Some(rights::READ));
}

#[test]
fn resync_prefers_local_metadata_over_snapshot() {
    let store = InMemoryKeyValueClient::new();
    let mut data = message();
    data.metadata = Some("meta-v1".into());
    let snapshot = data.clone();
    let mut state = attached(&store, data);

    let report = state.resync_all(&snapshot);
    assert!(report.synced.contains(&F_METADATA));
    assert!(!report.snapshot_pushed);
    assert_eq!(
        store.namespace_fields(NAMESPACE).get(F_METADATA),
        Some(&StoreValue::from("meta-v1"))
    );
}

#[test]
fn resync_without_mirror_does_nothing() {
    let mut state = MailItemState::new(message());
    let snapshot = message();
    let report = state.resync_all(&snapshot);
    assert!(report.synced.is_empty());
    assert!(!report.snapshot_pushed);
}

#[test]
fn detach_deletes_the_namespace() {
    let store = InMemoryKeyValueClient::new();
    let mut state = attached(&store, message());
    state.set_flags(3);
    assert!(store.namespace_exists(NAMESPACE));

    state.detach_remote_mirror().unwrap();
    assert!(!store.namespace_exists(NAMESPACE));
    assert!(!state.has_remote_mirror());

    state.set_flags(4);
    assert!(!store.namespace_exists(NAMESPACE));
    assert_eq!(state.flags(), 4);
}

#[test]
fn detach_drops_the_handle_even_when_delete_fails() {
    let store = InMemoryKeyValueClient::new();
    let mut state = attached(&store, message());
    state.set_flags(3);
    store.set_available(false);

    let err = state.detach_remote_mirror().unwrap_err();
    assert!(err.is_backend());
    assert!(!state.has_remote_mirror());
}

#[test]
fn outage_falls_back_to_local_values() {
    init_tracing();
    let store = InMemoryKeyValueClient::new();
    let mut state = attached(&store, message());
    state.set_folder_id(8);

    store.set_available(false);
    state.set_folder_id(9);
    assert_eq!(state.folder_id(), 9);
    assert_eq!(state.size(), 4096);

    store.set_available(true);
    // the mirror missed the write made during the outage
    assert_eq!(state.folder_id(), 8);
}

#[test]
fn undecodable_remote_value_is_treated_as_absent() {
    let store = InMemoryKeyValueClient::new();
    let mut state = attached(&store, message());
    mirror(&store).set(F_SIZE, StoreValue::from("lots")).unwrap();

    // namespace is in use, so the field reads as the empty value
    assert_eq!(state.size(), 0);
    assert_eq!(state.get_value(F_SIZE).unwrap(), FieldValue::Long(None));
}

#[test]
fn access_modes_pick_tiers() {
    let store = InMemoryKeyValueClient::new();
    let mut state = attached(&store, message());

    state.set_rights_with_mode(
        Some(Acl::new().grant("eve", GranteeType::Guest, rights::READ | rights::WRITE).clone()),
        AccessMode::LocalOnly,
    );
    assert!(!store.namespace_exists(NAMESPACE));

    let policy = RetentionPolicy {
        keep: vec![Policy::user("90d")],
        purge: vec![],
    };
    state.set_retention_policy_with_mode(Some(policy.clone()), AccessMode::RemoteOnly);
    assert!(store.namespace_exists(NAMESPACE));
    assert_eq!(state.retention_policy(), Some(policy));

    state.set_metadata_version_with_mode(6, AccessMode::Default);
    assert_eq!(state.metadata_version(), 6);
    assert_eq!(state.increment_metadata_version(), 7);
}

#[test]
fn generic_access_reports_what_typed_accessors_mask() {
    let mut state = MailItemState::new(message());
    assert!(matches!(
        state.set_value(F_SIZE, FieldValue::Str(Some("big".into())), AccessMode::Default),
        Err(StateError::TypeMismatch { .. })
    ));
    assert!(matches!(state.get_value("bogus"), Err(StateError::UnknownField(_))));
    assert!(matches!(
        state.set_smart_folders(vec![String::new()]),
        Err(StateError::InvalidListElement { .. })
    ));
}
