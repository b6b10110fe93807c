use std::sync::Arc;

use async_trait::async_trait;
use bus_driver::{BusError, Connection, Connector};
use lapin::ConnectionProperties;
use tracing::debug;

use crate::config::RabbitConfig;
use crate::connection::RabbitConnection;
use crate::error::RabbitError;

/// Dials the broker once per push or subscription.
pub struct RabbitConnector {
    config: Arc<RabbitConfig>,
}

impl RabbitConnector {
    pub(crate) fn new(config: RabbitConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &RabbitConfig {
        &self.config
    }

    pub(crate) async fn dial(&self) -> Result<RabbitConnection, RabbitError> {
        let properties =
            ConnectionProperties::default().with_connection_name(self.config.name.clone().into());

        let conn = lapin::Connection::connect(&self.config.uri(), properties)
            .await
            .map_err(RabbitError::Connect)?;

        let channel = match conn.create_channel().await {
            Ok(channel) => channel,
            Err(e) => {
                let _ = conn.close(200, "OK").await;
                return Err(RabbitError::Channel(e));
            }
        };

        debug!(host = %self.config.host, name = %self.config.name, "Connected to broker");
        Ok(RabbitConnection::new(Arc::clone(&self.config), conn, channel))
    }
}

#[async_trait]
impl Connector for RabbitConnector {
    async fn connect(&self) -> Result<Box<dyn Connection>, BusError> {
        Ok(Box::new(self.dial().await?))
    }
}
