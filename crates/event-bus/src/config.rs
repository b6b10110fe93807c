//! Bus configuration from environment variables.

use std::env;

/// Driver used when `BUS_DRIVER` is unset.
pub const DEFAULT_DRIVER: &str = "memory";

/// Which driver a service opens its bus with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Registered driver name ("memory", "rabbit", ...).
    pub driver: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            driver: DEFAULT_DRIVER.to_string(),
        }
    }
}

impl BusConfig {
    /// - `BUS_DRIVER`: driver name (default: memory)
    pub fn from_env() -> Self {
        Self {
            driver: env::var("BUS_DRIVER")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DRIVER.to_string()),
        }
    }
}
