//! Memory driver and connector.

use std::sync::Arc;

use async_trait::async_trait;
use bus_driver::{BusError, Connection, Connector, Driver};
use tracing::debug;

use crate::connection::MemoryConnection;
use crate::lanes::{LaneTable, SHARED_LANES};

/// In-process reference driver.
///
/// The default instance shares one lane table across the whole process, so
/// a bus opened in one place sees pushes made through any other.
pub struct MemoryDriver {
    lanes: Arc<LaneTable>,
}

impl MemoryDriver {
    /// Driver with a private lane table, for tests.
    pub fn isolated() -> Self {
        Self {
            lanes: Arc::new(LaneTable::new()),
        }
    }

    pub fn lanes(&self) -> &LaneTable {
        &self.lanes
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self {
            lanes: Arc::clone(&SHARED_LANES),
        }
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    async fn open_connector(&self) -> Result<Arc<dyn Connector>, BusError> {
        let connector = MemoryConnector {
            lanes: Arc::clone(&self.lanes),
        };

        // create a connection to ensure it works
        connector.connect().await?;
        debug!("Memory connector opened");

        Ok(Arc::new(connector))
    }
}

pub struct MemoryConnector {
    lanes: Arc<LaneTable>,
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<Box<dyn Connection>, BusError> {
        Ok(Box::new(MemoryConnection::new(Arc::clone(&self.lanes))))
    }
}
