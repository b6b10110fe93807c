//! Routing-key parsing and topic matching for inbound deliveries.
//!
//! Published keys are `resource.action.*`. A key is matched against the
//! registered topics in registration order; the first topic whose resource
//! and action each equal the key's segment (or are `*`) receives it.

use bus_driver::{BusError, ConsumerOutcome, Message, Topic, WILDCARD};
use bus_telemetry::metrics;
use tracing::error;

use crate::DRIVER_NAME;

/// Parsed inbound routing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingKey<'a> {
    pub resource: &'a str,
    pub action: &'a str,
}

impl<'a> RoutingKey<'a> {
    /// Split `key` on `.`; fewer than three segments is malformed.
    pub fn parse(key: &'a str) -> Result<Self, BusError> {
        let mut segments = key.split('.');
        match (segments.next(), segments.next(), segments.next()) {
            (Some(resource), Some(action), Some(_)) => Ok(Self { resource, action }),
            _ => Err(BusError::MalformedRoutingKey(key.to_string())),
        }
    }

    /// First topic in `topics` that accepts this key.
    pub fn match_topic<'t>(&self, topics: &'t [Topic]) -> Option<&'t Topic> {
        topics.iter().find(|t| {
            segment_matches(t.resource(), self.resource) && segment_matches(t.action(), self.action)
        })
    }
}

fn segment_matches(pattern: &str, segment: &str) -> bool {
    pattern == segment || pattern == WILDCARD
}

/// Routing key a push is published with: the topic name followed by `*`.
pub fn publish_routing_key(topic: &Topic) -> String {
    format!("{}{}", topic.name(), WILDCARD)
}

/// Route one delivery to its consumer and decide how to acknowledge it.
///
/// Malformed or unmatched keys never reach a consumer and are requeued.
/// A requeued malformed key is redelivered immediately, so a buggy
/// producer can cause a redelivery loop.
pub async fn dispatch(topics: &[Topic], routing_key: &str, body: Vec<u8>) -> ConsumerOutcome {
    let topic = match RoutingKey::parse(routing_key) {
        Ok(key) => match key.match_topic(topics) {
            Some(topic) => topic,
            None => {
                let err = BusError::NoMatchingTopic(routing_key.to_string());
                error!(error = %err, "Rejecting delivery");
                metrics::record_rejected(DRIVER_NAME, "no_matching_topic");
                return ConsumerOutcome::requeue();
            }
        },
        Err(err) => {
            error!(error = %err, "Rejecting delivery");
            metrics::record_rejected(DRIVER_NAME, "malformed_routing_key");
            return ConsumerOutcome::requeue();
        }
    };

    let outcome = topic.deliver(Message::raw(body)).await;
    metrics::record_consumed(DRIVER_NAME, topic.name(), outcome.label());
    outcome
}
