//! # Registry and Driver Selection
//!
//! Driver lookup by name through the process-wide registry, selection from
//! configuration, and driver open failures that must abort startup.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bus_driver::BusError;
    use bus_rabbit::{RabbitConfig, RabbitDriver};
    use event_bus::{Bus, BusConfig, DriverRegistry};

    use crate::integration::register_drivers;

    fn expect_err(result: Result<Bus, BusError>) -> BusError {
        match result {
            Ok(_) => panic!("bus opened unexpectedly"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_drivers_lists_registered_names() {
        register_drivers();
        let names = event_bus::drivers();
        assert!(names.contains(&"memory".to_string()));
        assert!(names.contains(&"rabbit".to_string()));

        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[tokio::test]
    async fn test_unknown_driver_is_fatal() {
        register_drivers();
        let err = expect_err(Bus::open("kafka").await);

        assert!(matches!(&err, BusError::UnknownDriver(name) if name == "kafka"));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_open_from_config() {
        register_drivers();
        let config = BusConfig {
            driver: "memory".to_string(),
        };

        let bus = Bus::open_from_config(&config).await.unwrap();
        assert_eq!(bus.driver_name(), "memory");
        assert!(bus.topics().is_empty());
    }

    #[tokio::test]
    async fn test_rabbit_without_queue_name_fails_at_open() {
        let registry = DriverRegistry::new();
        registry.register(
            "rabbit",
            Arc::new(RabbitDriver::with_config(RabbitConfig::default())),
        );

        let err = expect_err(registry.open("rabbit").await);
        assert!(matches!(err, BusError::Config(_)));
        assert!(err.is_fatal());
    }

    #[test]
    #[should_panic(expected = "register called twice")]
    fn test_registering_a_driver_twice_panics() {
        register_drivers();
        bus_memory::register();
    }
}
