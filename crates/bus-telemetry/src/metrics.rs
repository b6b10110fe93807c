//! Prometheus metrics for bus drivers.
//!
//! All metrics follow the naming convention: `bus_<metric>_<unit>` and carry a
//! `driver` label so several transports can share one registry.

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Messages accepted by a transport
    pub static ref MESSAGES_PUBLISHED: IntCounterVec = IntCounterVec::new(
        Opts::new("bus_messages_published_total", "Total messages accepted by the transport"),
        &["driver", "topic"]
    ).expect("metric creation failed");

    /// Pushes that returned an error
    pub static ref PUBLISH_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("bus_publish_failures_total", "Total pushes that failed"),
        &["driver", "topic"]
    ).expect("metric creation failed");

    /// Deliveries handed to a consumer
    pub static ref MESSAGES_CONSUMED: IntCounterVec = IntCounterVec::new(
        Opts::new("bus_messages_consumed_total", "Total deliveries processed by consumers"),
        &["driver", "topic", "outcome"]  // outcome: ack/nack
    ).expect("metric creation failed");

    /// Deliveries that could not be routed to any consumer
    pub static ref DELIVERIES_REJECTED: IntCounterVec = IntCounterVec::new(
        Opts::new("bus_deliveries_rejected_total", "Total deliveries rejected before reaching a consumer"),
        &["driver", "reason"]  // reason: malformed_routing_key/no_matching_topic
    ).expect("metric creation failed");

    /// Subscriptions currently running
    pub static ref ACTIVE_SUBSCRIPTIONS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("bus_active_subscriptions", "Number of subscribe loops currently running"),
        &["driver"]
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let collectors: [Box<dyn prometheus::core::Collector>; 5] = [
        Box::new(MESSAGES_PUBLISHED.clone()),
        Box::new(PUBLISH_FAILURES.clone()),
        Box::new(MESSAGES_CONSUMED.clone()),
        Box::new(DELIVERIES_REJECTED.clone()),
        Box::new(ACTIVE_SUBSCRIPTIONS.clone()),
    ];

    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Render the registry in Prometheus text exposition format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

pub fn record_published(driver: &str, topic: &str) {
    MESSAGES_PUBLISHED.with_label_values(&[driver, topic]).inc();
}

pub fn record_publish_failure(driver: &str, topic: &str) {
    PUBLISH_FAILURES.with_label_values(&[driver, topic]).inc();
}

pub fn record_consumed(driver: &str, topic: &str, outcome: &str) {
    MESSAGES_CONSUMED
        .with_label_values(&[driver, topic, outcome])
        .inc();
}

pub fn record_rejected(driver: &str, reason: &str) {
    DELIVERIES_REJECTED.with_label_values(&[driver, reason]).inc();
}

/// Tracks one running subscribe loop; decrements on drop.
pub struct SubscriptionGauge {
    driver: &'static str,
}

impl SubscriptionGauge {
    pub fn start(driver: &'static str) -> Self {
        ACTIVE_SUBSCRIPTIONS.with_label_values(&[driver]).inc();
        Self { driver }
    }
}

impl Drop for SubscriptionGauge {
    fn drop(&mut self) {
        ACTIVE_SUBSCRIPTIONS.with_label_values(&[self.driver]).dec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics_twice() {
        register_metrics().unwrap();
        register_metrics().unwrap();
    }

    #[test]
    fn test_counter_increment() {
        record_published("test-driver", "movie.release.*");
        assert!(
            MESSAGES_PUBLISHED
                .with_label_values(&["test-driver", "movie.release.*"])
                .get()
                >= 1
        );
    }

    #[test]
    fn test_subscription_gauge_drops_back() {
        let gauge = ACTIVE_SUBSCRIPTIONS.with_label_values(&["gauge-test"]);
        {
            let _guard = SubscriptionGauge::start("gauge-test");
            assert_eq!(gauge.get(), 1);
        }
        assert_eq!(gauge.get(), 0);
    }

    #[test]
    fn test_gather_contains_registered_metrics() {
        register_metrics().unwrap();
        record_rejected("gather-test", "malformed_routing_key");
        let text = gather_metrics().unwrap();
        assert!(text.contains("bus_deliveries_rejected_total"));
    }
}
