//! Field values and their encoding in the shared tier.
//!
//! | type      | shared encoding                          | none / empty       |
//! |-----------|------------------------------------------|--------------------|
//! | Str       | string                                   | key removed        |
//! | Int, Long | integer                                  | key removed        |
//! | List      | elements joined on `,`                   | `""` (both)        |
//! | Color     | integer metadata code                    | key removed        |
//! | Rights    | JSON metadata string                     | `""`               |
//! | Retention | JSON metadata string                     | `""`               |

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::types::{Acl, Color, RetentionPolicy};
use super::StateError;
use crate::store::StoreValue;

pub const LIST_DELIMITER: &str = ",";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Str,
    Int,
    Long,
    List,
    Color,
    Rights,
    Retention,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Str => "string",
            FieldType::Int => "int",
            FieldType::Long => "long",
            FieldType::List => "string list",
            FieldType::Color => "color",
            FieldType::Rights => "rights",
            FieldType::Retention => "retention policy",
        }
    }

    /// The value a field of this type takes when the shared tier has no
    /// value for it.
    pub fn empty(self) -> FieldValue {
        match self {
            FieldType::Str => FieldValue::Str(None),
            FieldType::Int => FieldValue::Int(None),
            FieldType::Long => FieldValue::Long(None),
            FieldType::List => FieldValue::List(Some(Vec::new())),
            FieldType::Color => FieldValue::Color(None),
            FieldType::Rights => FieldValue::Rights(None),
            FieldType::Retention => FieldValue::Retention(None),
        }
    }

    /// Encode a value for the shared tier. `Ok(None)` means the key should
    /// be removed rather than written.
    pub fn encode(self, field: &str, value: &FieldValue) -> Result<Option<StoreValue>, StateError> {
        self.check(field, value)?;
        let encoded = match value {
            FieldValue::Str(v) => v.clone().map(StoreValue::Str),
            FieldValue::Int(v) => v.map(|n| StoreValue::Int(n as i64)),
            FieldValue::Long(v) => v.map(StoreValue::Int),
            FieldValue::List(v) => {
                let items = v.as_deref().unwrap_or_default();
                validate_list(field, items)?;
                Some(StoreValue::Str(items.join(LIST_DELIMITER)))
            }
            FieldValue::Color(v) => v.map(|c| StoreValue::Int(c.to_metadata())),
            FieldValue::Rights(v) => Some(StoreValue::Str(encode_meta(field, v.as_ref())?)),
            FieldValue::Retention(v) => Some(StoreValue::Str(encode_meta(field, v.as_ref())?)),
        };
        Ok(encoded)
    }

    /// Decode a raw shared-tier value (or its absence) into this type.
    pub fn decode(self, field: &str, raw: Option<&StoreValue>) -> Result<FieldValue, StateError> {
        let Some(raw) = raw else {
            return Ok(self.empty());
        };
        let fail = |reason: String| StateError::Decode {
            field: field.to_string(),
            raw: raw.to_string(),
            reason,
        };
        let value = match self {
            FieldType::Str => FieldValue::Str(Some(match raw {
                StoreValue::Str(s) => s.clone(),
                StoreValue::Int(n) => n.to_string(),
            })),
            FieldType::Int => {
                let n = raw_int(raw).map_err(&fail)?;
                let n = i32::try_from(n).map_err(|_| fail(format!("{} out of int range", n)))?;
                FieldValue::Int(Some(n))
            }
            FieldType::Long => FieldValue::Long(Some(raw_int(raw).map_err(&fail)?)),
            FieldType::List => {
                let joined = raw_str(raw).map_err(&fail)?;
                FieldValue::List(Some(split_list(joined)))
            }
            FieldType::Color => {
                let code = raw_int(raw).map_err(&fail)?;
                FieldValue::Color(Some(Color::from_metadata(code).map_err(&fail)?))
            }
            FieldType::Rights => {
                FieldValue::Rights(decode_meta::<Acl>(raw_str(raw).map_err(&fail)?).map_err(&fail)?)
            }
            FieldType::Retention => FieldValue::Retention(
                decode_meta::<RetentionPolicy>(raw_str(raw).map_err(&fail)?).map_err(&fail)?,
            ),
        };
        Ok(value)
    }

    /// Whether a local value is worth pushing to the shared tier on sync.
    pub fn has_data(self, value: &FieldValue) -> bool {
        match value {
            FieldValue::List(v) => v.as_ref().is_some_and(|items| !items.is_empty()),
            other => !other.is_none(),
        }
    }

    pub(crate) fn check(self, field: &str, value: &FieldValue) -> Result<(), StateError> {
        if value.field_type() == self {
            Ok(())
        } else {
            Err(StateError::TypeMismatch {
                field: field.to_string(),
                expected: self.as_str(),
                actual: value.field_type().as_str(),
            })
        }
    }
}

/// A field value in transit between a slot, its local binding and the
/// shared tier. `None` is the "null" of the value's type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Str(Option<String>),
    Int(Option<i32>),
    Long(Option<i64>),
    List(Option<Vec<String>>),
    Color(Option<Color>),
    Rights(Option<Acl>),
    Retention(Option<RetentionPolicy>),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Str(_) => FieldType::Str,
            FieldValue::Int(_) => FieldType::Int,
            FieldValue::Long(_) => FieldType::Long,
            FieldValue::List(_) => FieldType::List,
            FieldValue::Color(_) => FieldType::Color,
            FieldValue::Rights(_) => FieldType::Rights,
            FieldValue::Retention(_) => FieldType::Retention,
        }
    }

    pub fn is_none(&self) -> bool {
        match self {
            FieldValue::Str(v) => v.is_none(),
            FieldValue::Int(v) => v.is_none(),
            FieldValue::Long(v) => v.is_none(),
            FieldValue::List(v) => v.is_none(),
            FieldValue::Color(v) => v.is_none(),
            FieldValue::Rights(v) => v.is_none(),
            FieldValue::Retention(v) => v.is_none(),
        }
    }
}

/// Reject list elements that would not survive a join/split on the
/// delimiter: elements containing it, and empty elements.
pub fn validate_list(field: &str, items: &[String]) -> Result<(), StateError> {
    match items
        .iter()
        .find(|item| item.is_empty() || item.contains(LIST_DELIMITER))
    {
        Some(bad) => Err(StateError::InvalidListElement {
            field: field.to_string(),
            element: bad.clone(),
        }),
        None => Ok(()),
    }
}

fn split_list(joined: &str) -> Vec<String> {
    if joined.is_empty() {
        return Vec::new();
    }
    joined.split(LIST_DELIMITER).map(str::to_string).collect()
}

fn raw_int(raw: &StoreValue) -> Result<i64, String> {
    match raw {
        StoreValue::Int(n) => Ok(*n),
        StoreValue::Str(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("not an integer: {}", e)),
    }
}

fn raw_str(raw: &StoreValue) -> Result<&str, String> {
    raw.as_str().ok_or_else(|| "expected a string".to_string())
}

fn encode_meta<T: Serialize>(field: &str, value: Option<&T>) -> Result<String, StateError> {
    match value {
        None => Ok(String::new()),
        Some(v) => serde_json::to_string(v).map_err(|e| StateError::Encode {
            field: field.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn decode_meta<T: DeserializeOwned>(encoded: &str) -> Result<Option<T>, String> {
    if encoded.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(encoded)
        .map(Some)
        .map_err(|e| e.to_string())
}
