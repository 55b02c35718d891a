//! Shared mailbox-item state and cluster coordination primitives.
//!
//! Every primitive comes as a local in-process implementation and a
//! distributed one over an opaque [`KeyValueClient`]; [`Backends::initialize`]
//! probes the store once at startup and builds each family from that single
//! decision.
//!
//! ```text
//!                       ┌──────────────────────────────┐
//!   BackendConfig ────► │ backend: select + registries │
//!                       └──────────────┬───────────────┘
//!          ┌────────────┬──────────────┼──────────────┬───────────────┐
//!          ▼            ▼              ▼              ▼               ▼
//!   SharedStateFactory  sequence /   txn tracker   delivery       notify
//!          │            txn ids                    coordinator    transport
//!          ▼
//!   MailItemState ── ItemField ── SharedStateAccessor ── KeyValueClient
//! ```

pub mod backend;
pub mod delivery;
pub mod notify;
pub mod sequence;
pub mod state;
pub mod store;
pub mod txn;

pub use backend::{BackendConfig, BackendMode, BackendSelection, BackendSelector, Backends, Connector, InitError};
pub use delivery::{DeliveryCoordinator, DeliveryCoordinatorExt, DeliveryError};
pub use notify::{ChangeEvent, ChangeTransport, NotifyError};
pub use sequence::SequenceGenerator;
pub use state::{AccessMode, ItemData, MailItemState, StateError};
pub use store::{KeyValueClient, SharedStateAccessor, SharedStateFactory, StoreError, StoreValue};
pub use txn::TxnTracker;
