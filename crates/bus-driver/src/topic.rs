//! # Topics
//!
//! A [`Topic`] names a subject (`resource.action.*`), its delivery group
//! (the AMQP exchange), its payload type and, once composed with a consumer,
//! the function that handles deliveries.
//!
//! Well-known subjects are declared once as a typed [`TopicDescriptor`] and
//! turned into topics at startup:
//!
//! ```rust,ignore
//! static PING: TopicDescriptor<Ping> = TopicDescriptor::new("ping.sent.*", "ping");
//!
//! let topic = PING.with_consumer(|ping| async move {
//!     tracing::info!(seq = ping.seq, "ping");
//!     Ok(())
//! });
//! ```

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{error, warn};

use crate::error::BusError;
use crate::message::{Message, Payload, PayloadType};
use crate::outcome::ConsumerOutcome;

/// Wildcard segment accepted in a topic's resource or action position.
pub const WILDCARD: &str = "*";

/// Future returned by a consumer.
pub type ConsumeFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// Consumer bound to a topic.
pub type Consumer = Arc<dyn Fn(Message) -> ConsumeFuture + Send + Sync>;

/// A named subject with its delivery group, payload type and consumer.
#[derive(Clone)]
pub struct Topic {
    name: String,
    exchange: String,
    payload_type: PayloadType,
    consumer: Option<Consumer>,
}

impl Topic {
    /// Topic without a consumer, usable for pushing.
    pub fn new(
        name: impl Into<String>,
        exchange: impl Into<String>,
        payload_type: PayloadType,
    ) -> Self {
        Self {
            name: name.into(),
            exchange: exchange.into(),
            payload_type,
            consumer: None,
        }
    }

    /// Bind a consumer that receives the message as the driver delivered it.
    #[must_use]
    pub fn with_raw_consumer<F, Fut>(mut self, consumer: F) -> Self
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let consumer: Consumer =
            Arc::new(move |message: Message| -> ConsumeFuture { Box::pin(consumer(message)) });
        self.consumer = Some(consumer);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Delivery group (exchange) the topic publishes to.
    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn payload_type(&self) -> PayloadType {
        self.payload_type
    }

    pub fn has_consumer(&self) -> bool {
        self.consumer.is_some()
    }

    /// First dot-delimited segment: the resource type.
    pub fn resource(&self) -> &str {
        self.name.split('.').next().unwrap_or_default()
    }

    /// Second dot-delimited segment: the verb acting on the resource.
    pub fn action(&self) -> &str {
        self.name.split('.').nth(1).unwrap_or_default()
    }

    /// Check the `resource.action` shape and the delivery group.
    pub fn validate(&self) -> Result<(), BusError> {
        let invalid = |reason| BusError::InvalidTopic {
            name: self.name.clone(),
            reason,
        };

        if self.name.is_empty() {
            return Err(invalid("name is empty"));
        }
        if self.name.split('.').count() < 2 {
            return Err(invalid("name needs at least resource.action segments"));
        }
        if self.resource().is_empty() || self.action().is_empty() {
            return Err(invalid("resource and action segments must not be empty"));
        }
        if self.exchange.is_empty() {
            return Err(invalid("delivery group (exchange) is empty"));
        }
        Ok(())
    }

    /// Reject a message whose payload type differs from the topic's.
    ///
    /// A raw message only passes on a topic declared with the raw payload
    /// type.
    pub fn check_message(&self, message: &Message) -> Result<(), BusError> {
        let actual = message.payload_type();
        if actual != self.payload_type {
            return Err(BusError::PayloadMismatch {
                topic: self.name.clone(),
                expected: self.payload_type.name(),
                actual: actual.name(),
            });
        }
        Ok(())
    }

    /// Run the bound consumer and map its result to an outcome.
    ///
    /// Consumer failures are logged here and never propagated.
    pub async fn deliver(&self, message: Message) -> ConsumerOutcome {
        let Some(consumer) = &self.consumer else {
            error!(topic = %self.name, "delivery for topic without consumer");
            return ConsumerOutcome::requeue();
        };

        let result = consumer(message).await;
        if let Err(e) = &result {
            warn!(
                topic = %self.name,
                error = %e,
                "consumer had an issue processing an event message"
            );
        }
        ConsumerOutcome::from_result(&result)
    }
}

impl fmt::Debug for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Topic")
            .field("name", &self.name)
            .field("exchange", &self.exchange)
            .field("payload_type", &self.payload_type)
            .field("consumer", &self.consumer.is_some())
            .finish()
    }
}

/// Compile-time declaration of a well-known topic with payload type `T`.
pub struct TopicDescriptor<T> {
    name: &'static str,
    exchange: &'static str,
    _payload: PhantomData<fn() -> T>,
}

impl<T> TopicDescriptor<T> {
    pub const fn new(name: &'static str, exchange: &'static str) -> Self {
        Self {
            name,
            exchange,
            _payload: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn exchange(&self) -> &'static str {
        self.exchange
    }
}

impl<T: Payload> TopicDescriptor<T> {
    /// Topic without a consumer, for pushing.
    pub fn topic(&self) -> Topic {
        Topic::new(self.name, self.exchange, PayloadType::of::<T>())
    }

    /// Compose the descriptor with a typed consumer.
    ///
    /// Raw deliveries are decoded from JSON, in-process deliveries are
    /// downcast; both reach `consumer` as `T`.
    pub fn with_consumer<F, Fut>(&self, consumer: F) -> Topic
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let name = self.name;
        let consumer = Arc::new(consumer);
        self.topic().with_raw_consumer(move |message: Message| {
            let consumer = Arc::clone(&consumer);
            async move {
                let payload = message.decode::<T>(name)?;
                consumer(payload).await
            }
        })
    }

    /// Wrap a payload for this topic.
    pub fn message(&self, payload: T) -> Message {
        Message::typed(payload)
    }
}
