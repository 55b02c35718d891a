//! Exclusive delivery per key.
//!
//! ```text
//! with_exclusive_delivery(key, action)
//!   acquire(key, wait) ──► action() ──► release(permit)   (guard, runs on panic too)
//!        │
//!        ├── InMemoryDeliveryCoordinator     holder token + Condvar per key
//!        └── DistributedDeliveryCoordinator  set-if-absent lease, renewed while held,
//!                                            token compare-and-delete
//! ```

mod coordinator;
mod distributed;
mod error;
mod in_memory;

pub use coordinator::{DeliveryCoordinator, DeliveryCoordinatorExt, DeliveryPermit};
pub use distributed::DistributedDeliveryCoordinator;
pub use error::DeliveryError;
pub use in_memory::InMemoryDeliveryCoordinator;
