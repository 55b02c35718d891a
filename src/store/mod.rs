//! Keyed remote store - the distributed tier as seen by this crate.
//!
//! ```text
//! MailItemState ──► SharedStateAccessor (one namespace per item)
//!                          │
//!                          ▼
//!                   KeyValueClient (opaque RPC client)
//!                   │                │
//!        InMemoryKeyValueClient   networked client
//!           (included)              (external)
//! ```

mod accessor;
mod client;
mod error;
mod in_memory;
mod value;

pub use accessor::{item_namespace, DistributedSharedState, SharedStateAccessor, SharedStateFactory};
pub use client::{KeyValueClient, MessageHandler};
pub use error::StoreError;
pub use in_memory::InMemoryKeyValueClient;
pub use value::StoreValue;
