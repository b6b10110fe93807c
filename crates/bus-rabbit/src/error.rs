//! AMQP driver errors.

use bus_driver::BusError;
use thiserror::Error;

/// Failures local to the AMQP driver. Converted into [`BusError`] at the
/// driver trait boundary.
#[derive(Debug, Error)]
pub enum RabbitError {
    #[error("bus name variable is not set, each service needs this set in order to declare a queue")]
    MissingName,

    #[error("invalid broker port {0:?}")]
    InvalidPort(String),

    #[error("unable to connect to rabbitmq: {0}")]
    Connect(#[source] lapin::Error),

    #[error("unable to open unique channel: {0}")]
    Channel(#[source] lapin::Error),

    #[error("unable to declare exchange {exchange:?}: {source}")]
    DeclareExchange {
        exchange: String,
        #[source]
        source: lapin::Error,
    },

    #[error("unable to create queue {queue:?}: {source}")]
    DeclareQueue {
        queue: String,
        #[source]
        source: lapin::Error,
    },

    /// The queue already exists with different `x-expires`/`x-queue-type`.
    #[error("queue {queue:?} already declared with different arguments: {source}")]
    QueueArgumentsMismatch {
        queue: String,
        #[source]
        source: lapin::Error,
    },

    #[error("unable to bind queue {queue:?} with exchange {exchange:?} for topic {topic:?}: {source}")]
    Bind {
        queue: String,
        exchange: String,
        topic: String,
        #[source]
        source: lapin::Error,
    },

    #[error("unable to consume message from queue {queue:?}: {source}")]
    Consume {
        queue: String,
        #[source]
        source: lapin::Error,
    },

    #[error("channel could not be put into confirm mode: {0}")]
    ConfirmMode(#[source] lapin::Error),

    #[error("unable to acknowledge the message on rabbit mq")]
    Nacked,

    #[error("publish was not confirmed by the broker")]
    NotConfirmed,

    #[error("delivery stream closed by the broker")]
    StreamClosed,

    #[error(transparent)]
    Amqp(#[from] lapin::Error),
}

impl From<RabbitError> for BusError {
    fn from(err: RabbitError) -> Self {
        match err {
            RabbitError::MissingName
            | RabbitError::InvalidPort(_)
            | RabbitError::QueueArgumentsMismatch { .. } => BusError::Config(err.to_string()),

            RabbitError::DeclareExchange { .. }
            | RabbitError::DeclareQueue { .. }
            | RabbitError::Bind { .. } => BusError::Topology(err.to_string()),

            RabbitError::Nacked | RabbitError::NotConfirmed => {
                BusError::ConfirmationFailed(err.to_string())
            }

            RabbitError::Connect(_)
            | RabbitError::Channel(_)
            | RabbitError::Consume { .. }
            | RabbitError::ConfirmMode(_)
            | RabbitError::StreamClosed
            | RabbitError::Amqp(_) => BusError::Transport(err.to_string()),
        }
    }
}
