//! # Bus Telemetry
//!
//! Logging bootstrap and Prometheus metrics shared by the bus drivers.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bus_telemetry::{init_telemetry, TelemetryConfig};
//!
//! init_telemetry(&TelemetryConfig::from_env()).expect("Failed to init telemetry");
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `BUS_SERVICE_NAME` | `event-bus` | Service name in log lines |
//! | `BUS_LOG_LEVEL` | `info` | Log level filter (`RUST_LOG` wins) |
//! | `BUS_JSON_LOGS` | `false` | JSON output for log shippers |
//! | `BUS_CONSOLE_OUTPUT` | `true` | Disable to silence stdout |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_tracing;
pub use metrics::{gather_metrics, register_metrics, SubscriptionGauge};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_tracing(config)
}
