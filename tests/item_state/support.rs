#![allow(dead_code)]

use std::sync::Arc;

use mailstate::state::{ItemData, ItemType, MailItemState};
use mailstate::store::{DistributedSharedState, InMemoryKeyValueClient, SharedStateAccessor};

pub const MAILBOX: i32 = 7;
pub const ITEM: i32 = 300;
pub const NAMESPACE: &str = "mbox:7:item:300";

/// Opt-in log output: `RUST_LOG=mailstate=debug cargo test`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn message() -> ItemData {
    let mut data = ItemData::new(MAILBOX, ITEM, ItemType::Message);
    data.folder_id = 2;
    data.size = 4096;
    data.subject = Some("quarterly report".into());
    data
}

pub fn mirror(store: &InMemoryKeyValueClient) -> Arc<dyn SharedStateAccessor> {
    Arc::new(DistributedSharedState::for_item(Arc::new(store.clone()), MAILBOX, ITEM))
}

/// An item state on "another node" sharing `store`.
pub fn attached(store: &InMemoryKeyValueClient, data: ItemData) -> MailItemState {
    let mut state = MailItemState::new(data);
    state.attach_remote_mirror(mirror(store));
    state
}
