use std::sync::Arc;

use async_trait::async_trait;
use bus_driver::{BusError, Connector, Driver};
use tracing::info;

use crate::config::RabbitConfig;
use crate::connector::RabbitConnector;

/// AMQP 0-9-1 driver.
///
/// The default instance reads [`RabbitConfig::from_env`] each time a
/// connector is opened; the connector keeps that snapshot for its lifetime.
#[derive(Debug, Default)]
pub struct RabbitDriver {
    config: Option<RabbitConfig>,
}

impl RabbitDriver {
    pub fn with_config(config: RabbitConfig) -> Self {
        Self {
            config: Some(config),
        }
    }

    fn resolve_config(&self) -> RabbitConfig {
        self.config.clone().unwrap_or_else(RabbitConfig::from_env)
    }
}

#[async_trait]
impl Driver for RabbitDriver {
    async fn open_connector(&self) -> Result<Arc<dyn Connector>, BusError> {
        let config = self.resolve_config();
        config.validate()?;
        let connector = RabbitConnector::new(config);

        // create a connection to ensure it works
        connector.dial().await?.close().await;
        info!(name = %connector.config().name, "Rabbit connector opened");

        Ok(Arc::new(connector))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_without_name_is_fatal() {
        let driver = RabbitDriver::with_config(RabbitConfig::default());
        let err = match driver.open_connector().await {
            Ok(_) => panic!("connector opened without a queue name"),
            Err(e) => e,
        };
        assert!(matches!(err, BusError::Config(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_open_with_bad_port_is_fatal() {
        let driver = RabbitDriver::with_config(RabbitConfig {
            name: "demo".to_string(),
            port: "not-a-port".to_string(),
            ..Default::default()
        });
        let err = match driver.open_connector().await {
            Ok(_) => panic!("connector opened with an invalid port"),
            Err(e) => e,
        };
        assert!(err.is_fatal());
    }
}
