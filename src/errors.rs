// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Error Types for the Pub/Sub Adapter
//!
//! This module provides the error type returned by every fallible operation of the
//! adapter. Setup errors (channel, declare, bind, consume) are returned to the caller
//! of `declare_and_bind`/`subscribe_json`, `EncodingError` is returned by
//! `publish_json`, and the per-message errors (decoding, ack, nack) are only logged
//! by the processing loop.

use thiserror::Error;

/// Represents errors that can occur while talking to the broker.
///
/// Each setup variant identifies the failing step and carries the exchange, queue
/// and key involved, so a caller can tell a failed declare apart from a failed bind
/// without parsing messages.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AmqpError {
    /// Internal errors that don't fit into other categories
    #[error("internal error")]
    InternalError,

    /// Error loading the broker configuration
    #[error("failure to load configs: {0}")]
    ConfigError(String),

    /// Error establishing a connection to the broker
    #[error("failure to connect")]
    ConnectionError,

    /// Error opening a channel on an established connection
    #[error("failure to create a channel {0}")]
    ChannelError(String),

    /// Error declaring an exchange with the given name
    #[error("failure to declare an exchange `{0}`")]
    DeclareExchangeError(String),

    /// Error declaring a queue
    #[error("failure to declare queue `{queue}` (exchange `{exchange}`, key `{key}`)")]
    DeclareQueueError {
        exchange: String,
        queue: String,
        key: String,
    },

    /// Error binding a queue to an exchange
    #[error("failure to bind queue `{queue}` to exchange `{exchange}` with key `{key}`")]
    BindingExchangeToQueueError {
        exchange: String,
        queue: String,
        key: String,
    },

    /// Error starting a consumer on a queue
    #[error("failure to consume queue `{0}`")]
    ConsumeError(String),

    /// Error serializing a payload to JSON
    #[error("failure to encode payload: {0}")]
    EncodingError(String),

    /// Error deserializing a delivery body from JSON
    #[error("failure to decode payload: {0}")]
    DecodingError(String),

    /// Error handing a message to the channel
    #[error("failure to publish")]
    PublishingError,

    /// Error acknowledging a message
    #[error("failure to ack message")]
    AckMessageError,

    /// Error negative-acknowledging a message
    #[error("failure to nack message")]
    NackMessageError,
}
