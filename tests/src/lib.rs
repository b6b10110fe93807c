//! # Event Bus Test Suite
//!
//! Cross-crate flows that need more than one crate wired together.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── flows.rs      # push → lane → consumer through a Bus handle
//!     └── registry.rs   # process-wide registry, driver selection, config
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p bus-tests
//! cargo test -p bus-tests integration::flows::
//! ```

#![allow(dead_code)]

pub mod integration;
