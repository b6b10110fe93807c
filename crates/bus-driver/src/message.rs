//! # Messages and Payloads
//!
//! A message crossing a driver is either raw bytes straight off a transport
//! or a typed value pushed from inside the process. The shape is resolved once
//! at the transport/application boundary by [`Message::decode`].

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::BusError;

/// Values that can travel on a topic.
///
/// Payloads are JSON on the wire, cloned when delivered in-process.
pub trait Payload: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static {}

impl<T> Payload for T where T: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static
{}

/// Runtime tag identifying a topic's payload type.
#[derive(Clone, Copy)]
pub struct PayloadType {
    id: TypeId,
    name: &'static str,
}

impl PayloadType {
    /// Tag for `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Tag used for untyped byte messages.
    #[must_use]
    pub fn raw() -> Self {
        Self::of::<Vec<u8>>()
    }

    /// Fully qualified type name, for error messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for PayloadType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PayloadType {}

impl fmt::Debug for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Object-safe view of a [`Payload`].
trait ErasedPayload: fmt::Debug + Send + Sync {
    fn to_json(&self) -> serde_json::Result<Vec<u8>>;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Payload> ErasedPayload for T {
    fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A message handed to a driver or delivered to a consumer.
#[derive(Clone, Debug)]
pub enum Message {
    /// Encoded body as received from a transport.
    Raw(Vec<u8>),
    /// In-process value with its type tag.
    Typed(TypedMessage),
}

/// Typed half of [`Message`].
#[derive(Clone, Debug)]
pub struct TypedMessage {
    payload_type: PayloadType,
    value: Arc<dyn ErasedPayload>,
}

impl Message {
    /// Wrap a typed payload.
    pub fn typed<T: Payload>(value: T) -> Self {
        Self::Typed(TypedMessage {
            payload_type: PayloadType::of::<T>(),
            value: Arc::new(value),
        })
    }

    /// Wrap raw bytes.
    pub fn raw(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Raw(bytes.into())
    }

    /// Type tag of the carried value; raw messages report `Vec<u8>`.
    #[must_use]
    pub fn payload_type(&self) -> PayloadType {
        match self {
            Self::Raw(_) => PayloadType::raw(),
            Self::Typed(typed) => typed.payload_type,
        }
    }

    /// Serialize the message to its wire body.
    ///
    /// Raw messages are passed through untouched.
    pub fn encode(&self) -> Result<Vec<u8>, BusError> {
        match self {
            Self::Raw(bytes) => Ok(bytes.clone()),
            Self::Typed(typed) => Ok(typed.value.to_json()?),
        }
    }

    /// Resolve the message into `T`.
    ///
    /// Raw bytes are parsed as JSON; typed values are cloned out if the tag
    /// matches and rejected with [`BusError::PayloadMismatch`] otherwise.
    pub fn decode<T: Payload>(&self, topic: &str) -> Result<T, BusError> {
        match self {
            Self::Raw(bytes) => Ok(serde_json::from_slice(bytes)?),
            Self::Typed(typed) => typed
                .value
                .as_any()
                .downcast_ref::<T>()
                .cloned()
                .ok_or_else(|| BusError::PayloadMismatch {
                    topic: topic.to_string(),
                    expected: type_name::<T>(),
                    actual: typed.payload_type.name(),
                }),
        }
    }
}
