// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! Typed JSON publish/subscribe over an AMQP 0-9-1 broker.
//!
//! - [`topology::declare_and_bind`] declares a queue from a [`queue::QueueDurability`]
//!   policy and binds it to an exchange.
//! - [`publisher::publish_json`] publishes a serializable value.
//! - [`subscriber::subscribe_json`] runs a handler over a queue and settles every
//!   delivery according to the handler's [`ack::AckDecision`].

mod consumer;
mod otel;

pub mod ack;
pub mod channel;
pub mod configs;
pub mod errors;
pub mod exchange;
pub mod publisher;
pub mod queue;
pub mod subscriber;
pub mod topology;
