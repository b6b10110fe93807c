//! Consumer outcome contract.
//!
//! Every driver maps a consumer's result through [`ConsumerOutcome`] and then
//! onto its own native semantics (AMQP ack/nack, in-memory log).

/// What should happen to a delivery after its consumer ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerOutcome {
    /// Processed; remove from the transport.
    Ack,
    /// Not processed; optionally hand back to the transport for redelivery.
    Nack { requeue: bool },
}

impl ConsumerOutcome {
    /// Negative acknowledgement asking for redelivery.
    #[must_use]
    pub const fn requeue() -> Self {
        Self::Nack { requeue: true }
    }

    /// Dispatch policy shared by all drivers: success acks, failure requeues.
    #[must_use]
    pub fn from_result<T, E>(result: &Result<T, E>) -> Self {
        match result {
            Ok(_) => Self::Ack,
            Err(_) => Self::requeue(),
        }
    }

    #[must_use]
    pub fn is_ack(&self) -> bool {
        matches!(self, Self::Ack)
    }

    /// Metric label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ack => "ack",
            Self::Nack { .. } => "nack",
        }
    }
}
