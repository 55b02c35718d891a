use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::NotifyError;

/// A change to a shared resource (usually a mailbox), fanned out to every
/// node that subscribed to that resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub id: String,
    /// Routing key, e.g. a mailbox id.
    pub resource: String,
    /// Change kind, e.g. "modified" or "deleted".
    pub kind: String,
    /// Opaque payload, bitcode-encoded by [`ChangeEvent::encode`].
    pub payload: Vec<u8>,
    /// Node that published the event; filled in by the transport.
    pub origin: String,
    pub metadata: Vec<(String, String)>,
}

impl ChangeEvent {
    pub fn new(resource: impl Into<String>, kind: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            resource: resource.into(),
            kind: kind.into(),
            payload,
            origin: String::new(),
            metadata: Vec::new(),
        }
    }

    /// Build an event with a bitcode-serialized payload.
    pub fn encode<T: Serialize>(
        resource: impl Into<String>,
        kind: impl Into<String>,
        payload: &T,
    ) -> Result<Self, NotifyError> {
        let bytes = bitcode::serialize(payload).map_err(|e| NotifyError::Encode(e.to_string()))?;
        Ok(Self::new(resource, kind, bytes))
    }

    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, NotifyError> {
        bitcode::deserialize(&self.payload).map_err(|e| NotifyError::Decode(e.to_string()))
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Text form carried over the shared store's pub/sub channels:
    /// base64 of the bitcode-encoded event.
    pub fn to_wire(&self) -> Result<String, NotifyError> {
        let bytes = bitcode::serialize(self).map_err(|e| NotifyError::Encode(e.to_string()))?;
        Ok(STANDARD.encode(bytes))
    }

    pub fn from_wire(message: &str) -> Result<Self, NotifyError> {
        let bytes = STANDARD
            .decode(message)
            .map_err(|e| NotifyError::Decode(e.to_string()))?;
        bitcode::deserialize(&bytes).map_err(|e| NotifyError::Decode(e.to_string()))
    }
}
