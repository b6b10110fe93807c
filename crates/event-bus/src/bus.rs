//! # Bus Handle
//!
//! The facade applications use: open by driver name, register consumer
//! topics, subscribe (blocking), push (one short-lived connection per call).
//!
//! ```rust,ignore
//! bus_memory::register();
//!
//! let mut bus = Bus::open("memory").await?;
//! bus.register_consumer(MOVIE_RELEASE.with_consumer(|movie| async move {
//!     tracing::info!(title = %movie.title, "New movie released");
//!     Ok(())
//! }))?;
//!
//! let bus = Arc::new(bus);
//! tokio::spawn({
//!     let bus = Arc::clone(&bus);
//!     async move { bus.subscribe().await }
//! });
//!
//! bus.push_payload(&MOVIE_RELEASE, "*", movie).await?;
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bus_driver::{
    BusError, CancelContext, CancelHandle, Connector, Message, Payload, Topic, TopicDescriptor,
};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::BusConfig;
use crate::registry;

struct ActiveSubscription {
    id: u64,
    /// Taken by `cancel_subscription`; the slot stays claimed until the
    /// subscription has shut down.
    cancel: Option<CancelHandle>,
}

/// Releases the subscription slot however `subscribe` ends, including when
/// its future is dropped.
struct SubscriptionGuard<'a> {
    bus: &'a Bus,
    id: u64,
}

impl Drop for SubscriptionGuard<'_> {
    fn drop(&mut self) {
        self.bus.release_subscription(self.id);
    }
}

/// Handle on an event bus opened through a driver.
pub struct Bus {
    driver_name: String,
    connector: Arc<dyn Connector>,
    topics: Vec<Topic>,
    /// Claimed by a running `subscribe` until it returns or is dropped.
    subscription: Mutex<Option<ActiveSubscription>>,
    next_subscription: AtomicU64,
}

impl Bus {
    /// Open a bus through the process-wide driver registry.
    pub async fn open(driver_name: &str) -> Result<Self, BusError> {
        registry::global().open(driver_name).await
    }

    /// Open the driver named by `config`.
    pub async fn open_from_config(config: &BusConfig) -> Result<Self, BusError> {
        Self::open(&config.driver).await
    }

    /// Wrap an already opened connector.
    pub fn from_connector(driver_name: impl Into<String>, connector: Arc<dyn Connector>) -> Self {
        Self {
            driver_name: driver_name.into(),
            connector,
            topics: Vec::new(),
            subscription: Mutex::new(None),
            next_subscription: AtomicU64::new(0),
        }
    }

    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    /// Topics registered for consumption, in registration order.
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    /// Register a consumer topic.
    ///
    /// Registration order is dispatch priority: the first matching topic wins.
    /// Complete all registrations before calling [`Bus::subscribe`].
    pub fn register_consumer(&mut self, topic: Topic) -> Result<(), BusError> {
        topic.validate()?;
        if !topic.has_consumer() {
            return Err(BusError::MissingConsumer(topic.name().to_string()));
        }
        debug!(topic = %topic.name(), exchange = %topic.exchange(), "Consumer registered");
        self.topics.push(topic);
        Ok(())
    }

    /// Subscribe all registered topics.
    ///
    /// Blocks until [`Bus::cancel_subscription`] is called or the transport
    /// fails, so run it on its own task. Only one subscription may be open
    /// per handle. Dropping the returned future ends the subscription.
    pub async fn subscribe(&self) -> Result<(), BusError> {
        if self.topics.is_empty() {
            return Err(BusError::NoConsumers);
        }

        let (_guard, ctx) = {
            let mut slot = self.subscription.lock();
            if slot.is_some() {
                return Err(BusError::AlreadySubscribed);
            }
            let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
            let (handle, ctx) = CancelContext::new();
            *slot = Some(ActiveSubscription {
                id,
                cancel: Some(handle),
            });
            (SubscriptionGuard { bus: self, id }, ctx)
        };

        info!(
            driver = %self.driver_name,
            topics = self.topics.len(),
            "Subscription starting"
        );

        let result = match self.connector.connect().await {
            Ok(conn) => conn.subscribe(ctx, Arc::from(self.topics.clone())).await,
            Err(e) => Err(e),
        };

        info!(driver = %self.driver_name, ok = result.is_ok(), "Subscription ended");
        result
    }

    /// Ask the open subscription to stop. Returns whether one was running
    /// and not already cancelled.
    ///
    /// The handle stays subscribed until the driver has shut the
    /// subscription down, so a new [`Bus::subscribe`] in that window returns
    /// [`BusError::AlreadySubscribed`] instead of overlapping the old one.
    pub fn cancel_subscription(&self) -> bool {
        let handle = self
            .subscription
            .lock()
            .as_mut()
            .and_then(|active| active.cancel.take());

        match handle {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether a subscription is running, including one still shutting down.
    pub fn is_subscribed(&self) -> bool {
        self.subscription.lock().is_some()
    }

    /// Push `message` on `topic`.
    ///
    /// `tenant` is reserved for multi-tenant routing; no driver interprets it.
    pub async fn push(
        &self,
        topic: &Topic,
        tenant: &str,
        message: Message,
    ) -> Result<(), BusError> {
        self.push_context(&CancelContext::background(), topic, tenant, message)
            .await
    }

    /// Push `message` on `topic`, abandoning it if `ctx` is cancelled.
    pub async fn push_context(
        &self,
        ctx: &CancelContext,
        topic: &Topic,
        tenant: &str,
        message: Message,
    ) -> Result<(), BusError> {
        debug!(topic = %topic.name(), tenant, "Pushing message");
        let conn = self.connector.connect().await?;
        conn.push(ctx, topic, message).await
    }

    /// Push a typed payload on a well-known topic.
    pub async fn push_payload<T: Payload>(
        &self,
        descriptor: &TopicDescriptor<T>,
        tenant: &str,
        payload: T,
    ) -> Result<(), BusError> {
        self.push(&descriptor.topic(), tenant, descriptor.message(payload))
            .await
    }

    // Only clear the slot if it still belongs to this subscription.
    fn release_subscription(&self, id: u64) {
        let mut slot = self.subscription.lock();
        if matches!(slot.as_ref(), Some(active) if active.id == id) {
            *slot = None;
        }
    }
}

impl Drop for Bus {
    fn drop(&mut self) {
        self.cancel_subscription();
    }
}
