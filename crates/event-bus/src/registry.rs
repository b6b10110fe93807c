//! # Driver Registry
//!
//! Maps a driver name to its implementation. Each driver crate exposes a
//! `register()` that the composition root calls once at startup; lookups
//! happen every time a bus handle is opened.
//!
//! Registration is write-once per name. Registering a name twice leaves the
//! process with an ambiguous registry, so it panics instead of returning an
//! error.

use std::collections::HashMap;
use std::sync::Arc;

use bus_driver::{BusError, Driver};
use lazy_static::lazy_static;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::bus::Bus;

lazy_static! {
    /// Process-wide registry used by [`register`] and [`Bus::open`].
    static ref DRIVERS: DriverRegistry = DriverRegistry::new();
}

/// Name → driver table guarded by a read-mostly lock.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: RwLock<HashMap<String, Arc<dyn Driver>>>,
}

impl DriverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `driver` under `name`.
    ///
    /// # Panics
    ///
    /// If `name` is empty or already registered.
    pub fn register(&self, name: &str, driver: Arc<dyn Driver>) {
        if name.is_empty() {
            panic!("bus: register called with an empty driver name");
        }

        let mut drivers = self.drivers.write();
        if drivers.contains_key(name) {
            panic!("bus: register called twice for driver {name}");
        }
        drivers.insert(name.to_string(), driver);
        debug!(driver = name, "Bus driver registered");
    }

    /// Resolve a driver by name.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Driver>, BusError> {
        self.drivers
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| BusError::UnknownDriver(name.to_string()))
    }

    /// Registered driver names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.drivers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Open a bus handle through this registry.
    pub async fn open(&self, driver_name: &str) -> Result<Bus, BusError> {
        let driver = self.lookup(driver_name)?;
        let connector = driver.open_connector().await?;
        info!(driver = driver_name, "Event bus opened");
        Ok(Bus::from_connector(driver_name, connector))
    }
}

/// Register a driver in the process-wide registry.
///
/// # Panics
///
/// If `name` is empty or already registered.
pub fn register(name: &str, driver: Arc<dyn Driver>) {
    DRIVERS.register(name, driver);
}

/// Names registered in the process-wide registry, sorted.
pub fn drivers() -> Vec<String> {
    DRIVERS.names()
}

pub(crate) fn global() -> &'static DriverRegistry {
    &DRIVERS
}
