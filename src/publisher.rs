// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Typed JSON Publisher
//!
//! This module publishes serializable values as JSON messages. Publishing is
//! fire-and-forget: the message is handed to the channel and no publisher confirm is
//! awaited, and unroutable messages may be dropped by the broker without notice.
//! The current OpenTelemetry context travels in the message headers.

use crate::{errors::AmqpError, otel};
use lapin::{options::BasicPublishOptions, types::ShortString, BasicProperties, Channel};
use serde::Serialize;
use tracing::{debug, error};
use uuid::Uuid;

/// Content type of every message published by this crate
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Serializes `value` to the JSON body of a message.
///
/// # Returns
/// The JSON bytes, or `EncodingError` when serde_json rejects the value (for
/// instance a map with non-string keys).
pub fn encode_json<T>(value: &T) -> Result<Vec<u8>, AmqpError>
where
    T: Serialize + ?Sized,
{
    serde_json::to_vec(value).map_err(|err| {
        error!(error = err.to_string(), "failure to marshal json");
        AmqpError::EncodingError(err.to_string())
    })
}

/// Options of every publish: neither mandatory nor immediate, so an unroutable
/// message is dropped by the broker instead of being returned.
pub(crate) fn publish_options() -> BasicPublishOptions {
    BasicPublishOptions {
        immediate: false,
        mandatory: false,
    }
}

/// Properties of every published message: JSON content type, a fresh message id
/// and the current trace context as headers.
pub(crate) fn message_properties() -> BasicProperties {
    BasicProperties::default()
        .with_content_type(ShortString::from(JSON_CONTENT_TYPE))
        .with_message_id(ShortString::from(Uuid::new_v4().to_string()))
        .with_headers(otel::inject_current_context())
}

/// Publishes `value` as JSON to `exchange` under routing key `key`.
///
/// Nothing is sent when `value` cannot be serialized. The channel should be one
/// dedicated to publishing, not a subscription's channel.
///
/// # Parameters
/// * `channel` - Channel the message is handed to
/// * `exchange` - Name of the target exchange
/// * `key` - Routing key of the message
/// * `value` - Payload, serialized with serde_json
///
/// # Returns
/// Ok(()) once the channel accepted the message, `EncodingError` when `value`
/// cannot be serialized, or `PublishingError` when the channel refused it.
///
/// # Example
/// ```no_run
/// # async fn run(channel: &lapin::Channel) -> Result<(), pubsub::errors::AmqpError> {
/// use pubsub::publisher::publish_json;
///
/// publish_json(channel, "peril_direct", "pause", &serde_json::json!({"isPaused": true})).await?;
/// # Ok(())
/// # }
/// ```
pub async fn publish_json<T>(
    channel: &Channel,
    exchange: &str,
    key: &str,
    value: &T,
) -> Result<(), AmqpError>
where
    T: Serialize + ?Sized,
{
    let body = encode_json(value)?;

    match channel
        .basic_publish(
            exchange,
            key,
            publish_options(),
            &body,
            message_properties(),
        )
        .await
    {
        Err(err) => {
            error!(
                error = err.to_string(),
                exchange, key, "error publishing message"
            );
            Err(AmqpError::PublishingError)
        }
        _ => {
            debug!(exchange, key, bytes = body.len(), "message published");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct PlayingState {
        #[serde(rename = "isPaused")]
        is_paused: bool,
    }

    #[test]
    fn values_are_encoded_as_json() {
        let body = encode_json(&PlayingState { is_paused: true }).unwrap();

        assert_eq!(body, br#"{"isPaused":true}"#);
    }

    #[test]
    fn encoded_bodies_decode_to_an_equal_value() {
        let state = PlayingState { is_paused: false };
        let body = encode_json(&state).unwrap();

        assert_eq!(serde_json::from_slice::<PlayingState>(&body).unwrap(), state);
    }

    #[test]
    fn messages_are_json_and_neither_mandatory_nor_immediate() {
        let opts = publish_options();
        assert!(!opts.mandatory);
        assert!(!opts.immediate);

        let props = message_properties();
        assert_eq!(
            props.content_type().as_ref().map(|ct| ct.as_str()),
            Some("application/json")
        );
        assert!(props.headers().is_some());
    }

    #[test]
    fn every_message_gets_its_own_id() {
        let first = message_properties().message_id().clone();
        let second = message_properties().message_id().clone();

        assert!(first.is_some());
        assert!(second.is_some());
        assert_ne!(first, second);
    }

    #[test]
    fn unserializable_values_are_encoding_errors() {
        let mut moves = HashMap::new();
        moves.insert((1u8, 2u8), "europe");

        let err = encode_json(&moves).unwrap_err();

        assert!(matches!(err, AmqpError::EncodingError(_)));
    }
}
