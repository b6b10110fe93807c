//! # Memory Bus Driver
//!
//! Reference transport for tests and local demos: one delivery lane per
//! topic name, shared process-wide, drained by one task per subscribed
//! topic.
//!
//! Consumer failures are logged and the message is dropped; there is no
//! redelivery. See [`lanes`] for the backpressure behaviour of pushes made
//! while no subscriber is draining.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

mod connection;
mod driver;
pub mod lanes;

use std::sync::Arc;

pub use driver::{MemoryConnector, MemoryDriver};

/// Name the driver registers under.
pub const DRIVER_NAME: &str = "memory";

/// Register the shared-lane memory driver as `"memory"`.
///
/// # Panics
///
/// If called more than once per process.
pub fn register() {
    event_bus::register(DRIVER_NAME, Arc::new(MemoryDriver::default()));
}
