//! Mailbox item state with optional shared mirroring.
//!
//! ```text
//! MailItemState
//!   ├── ItemLocal (ItemData + version counters, color, rights, retention)
//!   ├── fields: name -> ItemField ──┐
//!   └── Option<Arc<dyn SharedStateAccessor>> <── every ItemField borrows it
//! ```
//!
//! Unattached, every field is a plain local variable. Attached, reads go
//! through the mirror and overwrite the local value whenever the mirror has
//! one (or is in use by another holder), and writes go to whichever tiers the
//! [`AccessMode`] selects. Shared-tier failures never escape the typed
//! accessors: they are logged and the local value answers.

mod access_mode;
mod data;
mod error;
mod field;
mod item;
pub mod schema;
mod types;
mod value;

pub use access_mode::AccessMode;
pub use data::{EncodeMetadata, ItemData};
pub use error::StateError;
pub use field::ItemField;
pub use item::{MailItemState, ResyncReport};
pub use schema::Schema;
pub use types::{
    rights, Acl, Color, Flag, Grant, GranteeType, ItemType, NormalizedTags, Policy, PolicyKind,
    RetentionPolicy, MAX_MAPPED_COLOR,
};
pub use value::{validate_list, FieldType, FieldValue, LIST_DELIMITER};
