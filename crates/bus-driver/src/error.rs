//! # Bus Errors
//!
//! One error surface for every driver and for the bus handle. Variants are
//! grouped by how a caller is expected to react:
//!
//! - **Configuration**: abort startup, never retry.
//! - **Subscription state**: caller misuse of a bus handle.
//! - **Topology**: declare/bind failures, retry is a caller concern.
//! - **Transport**: per-connection or per-message failures.
//! - **Programming**: payload does not match the topic it was pushed on.

use thiserror::Error;

/// Errors returned by the bus handle and by drivers.
#[derive(Debug, Error)]
pub enum BusError {
    // =========================================================================
    // CONFIGURATION
    // =========================================================================
    /// No driver registered under the requested name.
    #[error("bus: unknown driver {0:?} (forgotten register call?)")]
    UnknownDriver(String),

    /// A required driver parameter is missing or malformed.
    #[error("bus configuration error: {0}")]
    Config(String),

    /// Topic name does not have `resource.action` segments.
    #[error("invalid topic {name:?}: {reason}")]
    InvalidTopic { name: String, reason: &'static str },

    /// A topic was registered for consumption without a consumer function.
    #[error("topic {0:?} has no consumer bound")]
    MissingConsumer(String),

    // =========================================================================
    // SUBSCRIPTION STATE
    // =========================================================================
    /// `subscribe` called before any consumer was registered.
    #[error("unable to subscribe: no consumers registered")]
    NoConsumers,

    /// `subscribe` called while a previous subscription is still active.
    #[error("unable to subscribe: subscription already open")]
    AlreadySubscribed,

    // =========================================================================
    // TOPOLOGY
    // =========================================================================
    /// Exchange/queue declaration or binding failed.
    #[error("topology error: {0}")]
    Topology(String),

    // =========================================================================
    // TRANSPORT
    // =========================================================================
    /// Connection, channel or delivery stream failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The broker negatively acknowledged a publish.
    #[error("confirmation failed: {0}")]
    ConfirmationFailed(String),

    /// A mandatory publish was returned because nothing is bound to its key.
    #[error("message to exchange {exchange:?} with routing key {routing_key:?} was returned unroutable: {reason}")]
    Unroutable {
        exchange: String,
        routing_key: String,
        reason: String,
    },

    /// Inbound routing key has fewer than three dot-delimited segments.
    #[error("routing key improperly formatted: {0:?} cannot process message")]
    MalformedRoutingKey(String),

    /// Inbound routing key matched none of the registered topics.
    #[error("no registered topic matches routing key {0:?}")]
    NoMatchingTopic(String),

    /// The operation's cancellation context fired first.
    #[error("operation cancelled")]
    Cancelled,

    // =========================================================================
    // PROGRAMMING
    // =========================================================================
    /// Message payload type differs from the topic's declared payload type.
    #[error("message type: {actual} does not match topic {topic:?} type: {expected}")]
    PayloadMismatch {
        topic: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Payload could not be encoded or decoded as JSON.
    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BusError {
    /// Configuration errors must abort startup rather than be retried.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnknownDriver(_)
                | Self::Config(_)
                | Self::InvalidTopic { .. }
                | Self::MissingConsumer(_)
        )
    }
}

/// Convenience alias used across the driver crates.
pub type BusResult<T> = Result<T, BusError>;
