//! # Event Bus
//!
//! Transport-agnostic publish/subscribe. Application code pushes typed
//! messages onto named topics and registers per-topic consumers; delivery is
//! supplied by a driver chosen at runtime by name.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   register()   ┌──────────────────┐
//! │ bus-memory   │ ─────────────→ │  DriverRegistry  │
//! │ bus-rabbit   │                │  name → Driver   │
//! └──────────────┘                └────────┬─────────┘
//!                                          │ Bus::open(name)
//!                                          ▼
//!                                 ┌──────────────────┐
//!                                 │       Bus        │
//!                                 │ register_consumer│
//!                                 │ subscribe / push │
//!                                 └──────────────────┘
//! ```
//!
//! ## Startup
//!
//! 1. Each driver crate's `register()` is called once
//! 2. `Bus::open(driver)` resolves the driver and opens its connector
//! 3. Consumers are registered, then `subscribe()` runs on its own task

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod bus;
pub mod config;
pub mod registry;
pub mod topics;

pub use bus::Bus;
pub use config::BusConfig;
pub use registry::{drivers, register, DriverRegistry};
pub use topics::{MovieReleaseMessage, MOVIE_RELEASE};

pub use bus_driver::{
    BusError, CancelContext, CancelHandle, ConsumerOutcome, Message, Payload, PayloadType, Topic,
    TopicDescriptor,
};
