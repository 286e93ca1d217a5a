//! Protocol messages.
//!
//! The bridge only understands the handshake messages. Everything else is
//! carried as a [`RawMessage`] and passes through untouched.

use crate::InstanceIdentity;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value, json};

/// Channel tag used for every message this instance sends.
pub const CHANNEL_APP: &str = "app";

/// An opaque message: a JSON object with a string `type` field.
///
/// Field order is kept as received.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    fields: Map<String, Value>,
}

impl RawMessage {
    /// Validate a JSON value as a message without changing any field.
    pub fn from_value(value: Value) -> Result<Self, MessageError> {
        let Value::Object(fields) = value else {
            return Err(MessageError::NotAnObject);
        };
        match fields.get("type") {
            Some(Value::String(_)) => Ok(Self { fields }),
            Some(_) => Err(MessageError::NonStringType),
            None => Err(MessageError::MissingType),
        }
    }

    /// The discriminator.
    pub fn kind(&self) -> &str {
        self.fields
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

impl Serialize for RawMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RawMessage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

/// Messages exchanged with the dataspace.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Announce this instance (outbound).
    Register { uri: InstanceIdentity },
    /// Join the dataspace after registration (outbound).
    Connect { dataspace: String },
    /// Registration acknowledged (inbound). Payload is ignored.
    Registered,
    /// Anything else, in either direction.
    Passthrough(RawMessage),
}

impl Message {
    /// Classify a message delivered by the dataspace.
    pub fn inbound(value: Value) -> Result<Self, MessageError> {
        let raw = RawMessage::from_value(value)?;
        if raw.kind() == "registered" {
            return Ok(Self::Registered);
        }
        Ok(Self::Passthrough(raw))
    }

    /// Classify a message emitted by the UI.
    ///
    /// UI messages are never interpreted, only checked for a `type`.
    pub fn outbound(value: Value) -> Result<Self, MessageError> {
        RawMessage::from_value(value).map(Self::Passthrough)
    }

    /// The `type` discriminator of this message.
    pub fn kind(&self) -> &str {
        match self {
            Self::Register { .. } => "register",
            Self::Connect { .. } => "connect",
            Self::Registered => "registered",
            Self::Passthrough(raw) => raw.kind(),
        }
    }

    /// The wire shape of this message.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Register { uri } => json!({ "type": "register", "uri": uri.as_uri() }),
            Self::Connect { dataspace } => json!({ "type": "connect", "dataspace": dataspace }),
            Self::Registered => json!({ "type": "registered" }),
            Self::Passthrough(raw) => Value::Object(raw.fields.clone()),
        }
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Passthrough(raw) => raw.serialize(serializer),
            other => other.to_value().serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::inbound(value).map_err(serde::de::Error::custom)
    }
}

/// A message that cannot be carried by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    #[error("message must be a JSON object")]
    NotAnObject,
    #[error("message has no 'type' field")]
    MissingType,
    #[error("message 'type' field must be a string")]
    NonStringType,
}
