//! Exchange, queue and binding declarations made before consuming.
//!
//! Every declaration is idempotent against a broker that already holds a
//! matching one. The queue arguments are not: changing either of them for
//! an existing queue makes the broker refuse the declare, and the service
//! cannot start until the queue is removed or the values restored.

use std::collections::BTreeSet;

use bus_driver::Topic;
use lapin::options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions};
use lapin::protocol::{AMQPErrorKind, AMQPSoftError};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{Channel, ExchangeKind};
use tracing::{debug, info};

use crate::config::RabbitConfig;
use crate::error::RabbitError;

/// Idle time in milliseconds after which the broker deletes a queue with no
/// consumers. Three days.
pub const QUEUE_EXPIRES_MS: i64 = 259_200_000;

/// Quorum queues are replicated; the type can only be set by the client.
pub const QUEUE_TYPE: &str = "quorum";

/// Distinct exchange names referenced by `topics`, prefixed, sorted.
pub fn exchange_names(config: &RabbitConfig, topics: &[Topic]) -> Vec<String> {
    topics
        .iter()
        .map(|t| config.prefixed(t.exchange()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn queue_arguments() -> FieldTable {
    let mut args = FieldTable::default();
    args.insert("x-expires".into(), AMQPValue::LongLongInt(QUEUE_EXPIRES_MS));
    args.insert("x-queue-type".into(), AMQPValue::LongString(QUEUE_TYPE.into()));
    args
}

/// Declare exchanges, the service queue and one binding per topic.
pub async fn declare(
    channel: &Channel,
    config: &RabbitConfig,
    topics: &[Topic],
) -> Result<String, RabbitError> {
    declare_exchanges(channel, config, topics).await?;
    let queue = declare_queue(channel, config).await?;
    bind_topics(channel, config, &queue, topics).await?;
    info!(queue = %queue, topics = topics.len(), "Queue topology declared");
    Ok(queue)
}

async fn declare_exchanges(
    channel: &Channel,
    config: &RabbitConfig,
    topics: &[Topic],
) -> Result<(), RabbitError> {
    let options = ExchangeDeclareOptions {
        durable: true,
        auto_delete: false,
        internal: false,
        ..Default::default()
    };

    for exchange in exchange_names(config, topics) {
        channel
            .exchange_declare(&exchange, ExchangeKind::Topic, options, FieldTable::default())
            .await
            .map_err(|source| RabbitError::DeclareExchange {
                exchange: exchange.clone(),
                source,
            })?;
        debug!(exchange = %exchange, "Exchange declared");
    }
    Ok(())
}

async fn declare_queue(channel: &Channel, config: &RabbitConfig) -> Result<String, RabbitError> {
    let queue = config.queue_name();
    let options = QueueDeclareOptions {
        durable: true,
        auto_delete: false,
        exclusive: false,
        ..Default::default()
    };

    channel
        .queue_declare(&queue, options, queue_arguments())
        .await
        .map_err(|source| {
            if is_precondition_failed(&source) {
                RabbitError::QueueArgumentsMismatch {
                    queue: queue.clone(),
                    source,
                }
            } else {
                RabbitError::DeclareQueue {
                    queue: queue.clone(),
                    source,
                }
            }
        })?;
    Ok(queue)
}

async fn bind_topics(
    channel: &Channel,
    config: &RabbitConfig,
    queue: &str,
    topics: &[Topic],
) -> Result<(), RabbitError> {
    for topic in topics {
        let exchange = config.prefixed(topic.exchange());
        channel
            .queue_bind(
                queue,
                &exchange,
                topic.name(),
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|source| RabbitError::Bind {
                queue: queue.to_string(),
                exchange: exchange.clone(),
                topic: topic.name().to_string(),
                source,
            })?;
        debug!(queue, exchange = %exchange, topic = %topic.name(), "Topic bound");
    }
    Ok(())
}

fn is_precondition_failed(err: &lapin::Error) -> bool {
    matches!(
        err,
        lapin::Error::ProtocolError(e)
            if matches!(e.kind(), AMQPErrorKind::Soft(AMQPSoftError::PRECONDITIONFAILED))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bus_driver::PayloadType;

    fn topic(name: &str, exchange: &str) -> Topic {
        Topic::new(name, exchange, PayloadType::raw())
    }

    #[test]
    fn test_queue_arguments() {
        let args = queue_arguments();
        let inner = args.inner();

        assert_eq!(inner.len(), 2);
        assert_eq!(
            inner.get("x-expires"),
            Some(&AMQPValue::LongLongInt(259_200_000))
        );
        assert_eq!(
            inner.get("x-queue-type"),
            Some(&AMQPValue::LongString("quorum".into()))
        );
    }

    #[test]
    fn test_one_exchange_per_distinct_name() {
        let config = RabbitConfig {
            name: "catalog".to_string(),
            prefix: "dev-".to_string(),
            ..Default::default()
        };
        let topics = vec![
            topic("movie.release.*", "movie"),
            topic("movie.retract.*", "movie"),
            topic("actor.create.*", "people"),
        ];

        assert_eq!(exchange_names(&config, &topics), vec!["dev-movie", "dev-people"]);
    }

    #[test]
    fn test_precondition_check_ignores_other_errors() {
        let err = lapin::Error::InvalidChannelState(lapin::ChannelState::Closed);
        assert!(!is_precondition_failed(&err));
    }
}
