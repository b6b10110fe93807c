//! In-memory connection: push onto a lane, drain lanes into consumers.

use std::sync::Arc;

use async_trait::async_trait;
use bus_driver::{BusError, CancelContext, Connection, ConsumerOutcome, Message, Topic};
use bus_telemetry::metrics;
use bus_telemetry::SubscriptionGauge;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::lanes::{Lane, LaneTable};
use crate::DRIVER_NAME;

pub(crate) struct MemoryConnection {
    lanes: Arc<LaneTable>,
}

impl MemoryConnection {
    pub(crate) fn new(lanes: Arc<LaneTable>) -> Self {
        Self { lanes }
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn push(
        self: Box<Self>,
        ctx: &CancelContext,
        topic: &Topic,
        message: Message,
    ) -> Result<(), BusError> {
        if let Err(e) = topic.check_message(&message) {
            metrics::record_publish_failure(DRIVER_NAME, topic.name());
            return Err(e);
        }
        let lane = self.lanes.lane(topic.name());

        tokio::select! {
            _ = lane.send(message) => {
                metrics::record_published(DRIVER_NAME, topic.name());
                Ok(())
            }
            _ = ctx.cancelled() => {
                metrics::record_publish_failure(DRIVER_NAME, topic.name());
                Err(BusError::Cancelled)
            }
        }
    }

    async fn subscribe(
        self: Box<Self>,
        ctx: CancelContext,
        topics: Arc<[Topic]>,
    ) -> Result<(), BusError> {
        if let Some(topic) = topics.iter().find(|t| !t.has_consumer()) {
            return Err(BusError::MissingConsumer(topic.name().to_string()));
        }

        let _gauge = SubscriptionGauge::start(DRIVER_NAME);
        let mut drains = JoinSet::new();
        for topic in topics.iter() {
            let lane = self.lanes.lane(topic.name());
            drains.spawn(drain(lane, topic.clone(), ctx.clone()));
        }
        info!(topics = topics.len(), "Memory subscription started");

        ctx.cancelled().await;

        while let Some(joined) = drains.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Memory drain task failed");
            }
        }
        info!("Memory subscription stopped");
        Ok(())
    }
}

/// Hand every message on `lane` to `topic`'s consumer until cancelled.
///
/// Consumer failures are logged; the lane has no redelivery.
async fn drain(lane: Arc<Lane>, topic: Topic, ctx: CancelContext) {
    loop {
        let message = tokio::select! {
            _ = ctx.cancelled() => break,
            message = lane.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        let outcome = topic.deliver(message).await;
        metrics::record_consumed(DRIVER_NAME, topic.name(), outcome.label());
        if let ConsumerOutcome::Nack { .. } = outcome {
            warn!(topic = %topic.name(), "Error consuming message, dropped by memory lane");
        }
    }
    debug!(topic = %topic.name(), "Memory drain stopped");
}
