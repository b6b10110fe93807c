//! # Bus Driver
//!
//! Interfaces implemented by event bus drivers and used by the `event-bus`
//! handle. The split mirrors a database driver layer: the handle owns
//! registration and subscription state, drivers own the transport.
//!
//! ## Data Flow
//!
//! ```text
//! Bus::push ──→ Connector::connect ──→ Connection::push ──→ transport
//!
//! transport ──→ Connection::subscribe ──→ Topic::deliver ──→ consumer
//!                         ↑                     │
//!                         └── ack / nack ←──────┘ ConsumerOutcome
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod context;
pub mod driver;
pub mod error;
pub mod message;
pub mod outcome;
pub mod topic;

pub use context::{CancelContext, CancelHandle};
pub use driver::{Connection, Connector, Driver};
pub use error::{BusError, BusResult};
pub use message::{Message, Payload, PayloadType, TypedMessage};
pub use outcome::ConsumerOutcome;
pub use topic::{ConsumeFuture, Consumer, Topic, TopicDescriptor, WILDCARD};
