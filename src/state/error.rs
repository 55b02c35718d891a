use thiserror::Error;

use crate::store::StoreError;

/// Errors raised by field slots and entity state.
///
/// Most of these never reach an accessor's caller: `MailItemState` logs and
/// masks them. They are still returned as values by the slot-level
/// operations so the masking decision stays explicit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// The shared tier failed while reading or writing a field.
    #[error("shared state unavailable for field {field}: {source}")]
    Backend {
        field: String,
        #[source]
        source: StoreError,
    },
    /// A stored value could not be decoded into the field's type.
    #[error("cannot decode field {field} from {raw}: {reason}")]
    Decode {
        field: String,
        raw: String,
        reason: String,
    },
    /// A value could not be encoded for the shared tier.
    #[error("cannot encode field {field}: {reason}")]
    Encode { field: String, reason: String },
    /// No slot is registered under this name for the entity's schema.
    #[error("no field registered under {0}")]
    UnknownField(String),
    /// A value of the wrong type was offered to (or read from) a slot.
    #[error("field {field} holds {expected} values, got {actual}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },
    /// A list element would not survive the delimiter-joined encoding.
    #[error("field {field} cannot hold list element {element:?}")]
    InvalidListElement { field: String, element: String },
    /// The full-entity snapshot could not be produced.
    #[error("cannot encode entity snapshot: {0}")]
    Snapshot(String),
}

impl StateError {
    pub(crate) fn backend(field: &str, source: StoreError) -> Self {
        StateError::Backend {
            field: field.to_string(),
            source,
        }
    }

    /// True for failures of the shared tier itself (as opposed to data or
    /// programming errors).
    pub fn is_backend(&self) -> bool {
        matches!(self, StateError::Backend { .. })
    }
}
