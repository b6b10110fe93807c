//! # RabbitMQ Bus Driver
//!
//! AMQP 0-9-1 transport for the event bus, registered as `"rabbit"`.
//!
//! ## Topology
//!
//! On subscribe, for the configured service name `N` and prefix `P`:
//!
//! ```text
//! exchange P<exchange>  (topic, durable)   one per distinct exchange
//!        │  bind: topic name verbatim
//!        ▼
//! queue P<N>  (durable, quorum, x-expires 3 days)
//!        │  manual ack
//!        ▼
//! routing key resource.action.* ──► first matching topic ──► consumer
//! ```
//!
//! Pushes publish in confirm mode with `mandatory`, persistent delivery and
//! the routing key `<topic name>*`.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod config;
mod connection;
mod connector;
mod driver;
pub mod error;
pub mod publish;
pub mod routing;
pub mod topology;

use std::sync::Arc;

pub use config::RabbitConfig;
pub use connection::RabbitConnection;
pub use connector::RabbitConnector;
pub use driver::RabbitDriver;
pub use error::RabbitError;
pub use routing::RoutingKey;

/// Name the driver registers under.
pub const DRIVER_NAME: &str = "rabbit";

/// Register the environment-configured driver as `"rabbit"`.
///
/// # Panics
///
/// If called more than once per process.
pub fn register() {
    event_bus::register(DRIVER_NAME, Arc::new(RabbitDriver::default()));
}
