//! Cross-node change notification.
//!
//! ```text
//! publish(ChangeEvent) ──► InMemoryChangeTransport     in-process fan-out
//!                     └──► DistributedChangeTransport  "changes:{resource}" channel
//!                                                     base64(bitcode(event))
//! ```

mod distributed;
mod error;
mod event;
mod in_memory;
mod transport;

pub use distributed::DistributedChangeTransport;
pub use error::NotifyError;
pub use event::ChangeEvent;
pub use in_memory::InMemoryChangeTransport;
pub use transport::{ChangeHandler, ChangeTransport, Subscription};
