//! # Driver Capabilities
//!
//! A transport plugs into the bus by implementing three traits:
//!
//! ```text
//! Driver ──open_connector()──→ Connector ──connect()──→ Connection
//!                                   │                     ├─ push(topic, message)
//!                                   └─ (many)             └─ subscribe(topics)
//! ```
//!
//! Connections are short-lived and consumed by the operation they perform.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::CancelContext;
use crate::error::BusError;
use crate::message::Message;
use crate::topic::Topic;

/// Entry point registered under a driver name.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Validate configuration and connectivity, returning a connector.
    async fn open_connector(&self) -> Result<Arc<dyn Connector>, BusError>;
}

/// Produces connections to the transport.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a fresh connection.
    async fn connect(&self) -> Result<Box<dyn Connection>, BusError>;
}

/// One open connection to the transport.
#[async_trait]
pub trait Connection: Send {
    /// Emit `message` on `topic`. Drivers should abandon the push when `ctx`
    /// is cancelled.
    async fn push(
        self: Box<Self>,
        ctx: &CancelContext,
        topic: &Topic,
        message: Message,
    ) -> Result<(), BusError>;

    /// Consume `topics` until `ctx` is cancelled or the transport fails.
    async fn subscribe(
        self: Box<Self>,
        ctx: CancelContext,
        topics: Arc<[Topic]>,
    ) -> Result<(), BusError>;
}
