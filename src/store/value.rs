use std::fmt;

/// A flat value as held by the distributed tier: strings or 64-bit integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreValue {
    Str(String),
    Int(i64),
}

impl StoreValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            StoreValue::Str(s) => Some(s),
            StoreValue::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            StoreValue::Int(n) => Some(*n),
            StoreValue::Str(_) => None,
        }
    }
}

impl fmt::Display for StoreValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreValue::Str(s) => write!(f, "{:?}", s),
            StoreValue::Int(n) => write!(f, "{}", n),
        }
    }
}

impl From<String> for StoreValue {
    fn from(value: String) -> Self {
        StoreValue::Str(value)
    }
}

impl From<&str> for StoreValue {
    fn from(value: &str) -> Self {
        StoreValue::Str(value.to_string())
    }
}

impl From<i64> for StoreValue {
    fn from(value: i64) -> Self {
        StoreValue::Int(value)
    }
}

impl From<i32> for StoreValue {
    fn from(value: i32) -> Self {
        StoreValue::Int(value as i64)
    }
}
