//! Outgoing message encoding and AMQP publish properties.

use bus_driver::{BusError, Message, Topic};
use chrono::Utc;
use lapin::publisher_confirm::Confirmation;
use lapin::BasicProperties;
use uuid::Uuid;

use crate::error::RabbitError;

pub const CONTENT_TYPE: &str = "application/json";

/// AMQP delivery mode that makes the broker persist the message.
pub const PERSISTENT: u8 = 2;

/// Check `message` against the topic's payload type and encode it as JSON.
pub fn encode_body(topic: &Topic, message: &Message) -> Result<Vec<u8>, BusError> {
    topic.check_message(message)?;
    message.encode()
}

pub fn properties() -> BasicProperties {
    BasicProperties::default()
        .with_content_type(CONTENT_TYPE.into())
        .with_delivery_mode(PERSISTENT)
        .with_timestamp(Utc::now().timestamp().max(0) as u64)
        .with_message_id(Uuid::new_v4().to_string().into())
}

/// Map a broker confirmation onto the push result.
pub fn check_confirmation(
    confirmation: Confirmation,
    exchange: &str,
    routing_key: &str,
) -> Result<(), BusError> {
    match confirmation {
        Confirmation::Ack(None) => Ok(()),
        // Mandatory publish bounced back: nothing is bound to the key.
        Confirmation::Ack(Some(returned)) => Err(BusError::Unroutable {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            reason: returned.reply_text.to_string(),
        }),
        Confirmation::Nack(_) => Err(RabbitError::Nacked.into()),
        Confirmation::NotRequested => Err(RabbitError::NotConfirmed.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bus_driver::{PayloadType, TopicDescriptor};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Release {
        id: i64,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Retract {
        id: i64,
    }

    static RELEASE: TopicDescriptor<Release> = TopicDescriptor::new("movie.release.", "movie");

    #[test]
    fn test_encode_typed_payload() {
        let body = encode_body(&RELEASE.topic(), &RELEASE.message(Release { id: 7 })).unwrap();
        assert_eq!(body, br#"{"id":7}"#);
    }

    #[test]
    fn test_encode_rejects_other_payload_type() {
        let err = encode_body(&RELEASE.topic(), &Message::typed(Retract { id: 7 })).unwrap_err();
        assert!(matches!(err, BusError::PayloadMismatch { .. }));
    }

    #[test]
    fn test_encode_rejects_raw_message() {
        let err = encode_body(&RELEASE.topic(), &Message::raw(b"{}".to_vec())).unwrap_err();
        assert!(matches!(err, BusError::PayloadMismatch { .. }));
    }

    #[test]
    fn test_raw_topic_accepts_raw_message() {
        let topic = Topic::new("log.line.", "log", PayloadType::raw());
        let body = encode_body(&topic, &Message::raw(b"hello".to_vec())).unwrap();
        assert_eq!(body, b"hello");
    }

    #[test]
    fn test_properties() {
        let props = properties();
        assert_eq!(props.content_type().as_ref().map(|s| s.as_str()), Some(CONTENT_TYPE));
        assert_eq!(*props.delivery_mode(), Some(PERSISTENT));
        assert!(props.timestamp().is_some());
        assert!(props.message_id().is_some());
        assert_ne!(properties().message_id(), props.message_id());
    }

    #[test]
    fn test_confirmation_mapping() {
        assert!(check_confirmation(Confirmation::Ack(None), "movie", "movie.release.*").is_ok());
        assert!(matches!(
            check_confirmation(Confirmation::Nack(None), "movie", "movie.release.*"),
            Err(BusError::ConfirmationFailed(_))
        ));
        assert!(matches!(
            check_confirmation(Confirmation::NotRequested, "movie", "movie.release.*"),
            Err(BusError::ConfirmationFailed(_))
        ));
    }
}
