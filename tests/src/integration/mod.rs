//! Integration tests across the bus, its drivers and telemetry.

pub mod flows;
pub mod registry;

use std::sync::Once;
use std::time::Duration;

use event_bus::Bus;
use tokio::time::timeout;

static REGISTER: Once = Once::new();

/// Register the shared memory driver once for the whole test binary.
pub fn register_drivers() {
    REGISTER.call_once(|| {
        bus_memory::register();
        bus_rabbit::register();
    });
}

/// Wait until `bus` has an open subscription.
pub async fn wait_subscribed(bus: &Bus) {
    timeout(Duration::from_secs(1), async {
        while !bus.is_subscribed() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("subscription should start");
}
