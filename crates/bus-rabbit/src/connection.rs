//! One AMQP connection plus channel, used for a single push or subscription.
//!
//! Both operations close the channel and connection when they return, so
//! every push pays full connection setup.

use std::sync::Arc;

use async_trait::async_trait;
use bus_driver::{BusError, CancelContext, Connection, ConsumerOutcome, Message, Topic};
use bus_telemetry::{metrics, SubscriptionGauge};
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions,
    ConfirmSelectOptions,
};
use lapin::types::FieldTable;
use lapin::Channel;
use tokio::task::JoinSet;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

use crate::config::RabbitConfig;
use crate::error::RabbitError;
use crate::publish::{self, check_confirmation, encode_body};
use crate::routing::{self, publish_routing_key};
use crate::topology;
use crate::DRIVER_NAME;

const REPLY_SUCCESS: u16 = 200;

pub struct RabbitConnection {
    config: Arc<RabbitConfig>,
    conn: lapin::Connection,
    channel: Channel,
}

impl RabbitConnection {
    pub(crate) fn new(config: Arc<RabbitConfig>, conn: lapin::Connection, channel: Channel) -> Self {
        Self {
            config,
            conn,
            channel,
        }
    }

    pub(crate) async fn close(self) {
        if let Err(e) = self.channel.close(REPLY_SUCCESS, "OK").await {
            debug!(error = %e, "Channel close failed");
        }
        if let Err(e) = self.conn.close(REPLY_SUCCESS, "OK").await {
            debug!(error = %e, "Connection close failed");
        }
    }

    async fn publish(
        &self,
        ctx: &CancelContext,
        topic: &Topic,
        message: &Message,
    ) -> Result<(), BusError> {
        let body = encode_body(topic, message)?;

        self.channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(RabbitError::ConfirmMode)?;

        let exchange = self.config.prefixed(topic.exchange());
        let routing_key = publish_routing_key(topic);
        let options = BasicPublishOptions {
            mandatory: true,
            ..Default::default()
        };

        let confirmed = async {
            let pending = self
                .channel
                .basic_publish(&exchange, &routing_key, options, &body, publish::properties())
                .await?;
            pending.await
        };

        let confirmation = tokio::select! {
            confirmation = confirmed => confirmation.map_err(RabbitError::from)?,
            _ = ctx.cancelled() => return Err(BusError::Cancelled),
        };
        check_confirmation(confirmation, &exchange, &routing_key)
    }

    async fn consume(&self, ctx: &CancelContext, topics: &Arc<[Topic]>) -> Result<(), BusError> {
        if let Some(topic) = topics.iter().find(|t| !t.has_consumer()) {
            return Err(BusError::MissingConsumer(topic.name().to_string()));
        }

        let queue = topology::declare(&self.channel, &self.config, topics).await?;
        let mut deliveries = self
            .channel
            .basic_consume(
                &queue,
                "",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|source| RabbitError::Consume {
                queue: queue.clone(),
                source,
            })?;

        let _gauge = SubscriptionGauge::start(DRIVER_NAME);
        let mut in_flight = JoinSet::new();
        info!(queue = %queue, "Consuming");

        let result = loop {
            tokio::select! {
                _ = ctx.cancelled() => break Ok(()),
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Delivery task failed");
                    }
                }
                next = deliveries.next() => match next {
                    Some(Ok(delivery)) => {
                        in_flight.spawn(handle_delivery(Arc::clone(topics), delivery));
                    }
                    Some(Err(e)) => break Err(BusError::from(RabbitError::from(e))),
                    None => break Err(RabbitError::StreamClosed.into()),
                },
            }
        };

        // Acks need the channel, so settle in-flight deliveries before closing.
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Delivery task failed");
            }
        }
        info!(queue = %queue, "Stopped consuming");
        result
    }
}

#[async_trait]
impl Connection for RabbitConnection {
    async fn push(
        self: Box<Self>,
        ctx: &CancelContext,
        topic: &Topic,
        message: Message,
    ) -> Result<(), BusError> {
        let result = self.publish(ctx, topic, &message).await;
        match &result {
            Ok(()) => metrics::record_published(DRIVER_NAME, topic.name()),
            Err(e) => {
                warn!(topic = %topic.name(), error = %e, "Publish failed");
                metrics::record_publish_failure(DRIVER_NAME, topic.name());
            }
        }
        self.close().await;
        result
    }

    async fn subscribe(
        self: Box<Self>,
        ctx: CancelContext,
        topics: Arc<[Topic]>,
    ) -> Result<(), BusError> {
        let result = self.consume(&ctx, &topics).await;
        self.close().await;
        result
    }
}

async fn handle_delivery(topics: Arc<[Topic]>, mut delivery: Delivery) {
    let routing_key = delivery.routing_key.as_str().to_string();
    let body = std::mem::take(&mut delivery.data);

    let acked = match routing::dispatch(&topics, &routing_key, body).await {
        ConsumerOutcome::Ack => delivery.acker.ack(BasicAckOptions::default()).await,
        ConsumerOutcome::Nack { requeue } => {
            delivery
                .acker
                .nack(BasicNackOptions {
                    multiple: false,
                    requeue,
                })
                .await
        }
    };
    if let Err(e) = acked {
        warn!(routing_key = %routing_key, error = %e, "rabbit acknowledgement unsuccessful");
    }
}
