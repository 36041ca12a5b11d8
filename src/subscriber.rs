// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Typed JSON Subscriber
//!
//! This module registers a handler on a queue. [`subscribe_json`] declares and binds
//! the queue, opens a manual-ack consumer on it and spawns one task that processes
//! the deliveries for as long as the consumer's stream is open.
//!
//! Registration failures are returned to the caller. Once the task runs, failures
//! are per-message and only show up in logs and traces.

use crate::{
    ack::AckDecision, consumer, errors::AmqpError, queue::QueueDurability,
    topology::declare_and_bind,
};
use lapin::{options::BasicConsumeOptions, types::FieldTable, Connection};
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Handles decoded messages of type `T`.
///
/// Implemented for every `FnMut(T) -> AckDecision`, so a closure is usually enough.
/// A handler is called on its subscription's task, one message at a time, and is
/// expected to always return a decision.
pub trait MessageHandler<T> {
    fn handle(&mut self, message: T) -> AckDecision;
}

impl<T, F> MessageHandler<T> for F
where
    F: FnMut(T) -> AckDecision,
{
    fn handle(&mut self, message: T) -> AckDecision {
        self(message)
    }
}

/// A running subscription.
///
/// Dropping it leaves the processing task running; the task ends when the
/// channel or connection closes.
#[derive(Debug)]
pub struct Subscription {
    queue: String,
    consumer_tag: String,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Name of the consumed queue.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Consumer tag assigned by the broker.
    pub fn consumer_tag(&self) -> &str {
        &self.consumer_tag
    }

    /// Returns true once the delivery stream has ended.
    pub fn is_closed(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the delivery stream to end.
    pub async fn closed(self) -> Result<(), AmqpError> {
        self.task.await.map_err(|err| {
            error!(error = err.to_string(), queue = %self.queue, "subscription task failed");
            AmqpError::InternalError
        })
    }
}

/// Subscribes `handler` to JSON messages of type `T` routed from `exchange` to
/// `queue_name` under `binding_key`.
///
/// The queue is declared and bound first (see [`declare_and_bind`]) and any failure
/// there is returned before consumption starts. Auto-ack is disabled: every delivery
/// is settled by the adapter according to the handler's [`AckDecision`], and bodies
/// that are not valid JSON for `T` are discarded without calling the handler.
///
/// Returns as soon as the processing task is spawned. Must be called from within a
/// tokio runtime.
///
/// # Parameters
/// * `conn` - Connection the subscription's channel is opened on
/// * `exchange` - Name of an already declared exchange to bind to
/// * `queue_name` - Name of the queue to declare and consume
/// * `binding_key` - Routing key (or topic pattern) of the binding
/// * `durability` - Policy the queue's declare flags are derived from
/// * `handler` - Called once per decoded message; its decision settles the delivery
///
/// # Returns
/// * `Result<Subscription, AmqpError>` -
///   A handle on the running subscription, or the declare, bind or consume error
///   that prevented it from starting.
///
/// # Example
/// ```no_run
/// # async fn run(conn: &lapin::Connection) -> Result<(), pubsub::errors::AmqpError> {
/// use pubsub::{ack::AckDecision, queue::QueueDurability, subscriber::subscribe_json};
///
/// #[derive(serde::Deserialize)]
/// struct PlayingState {
///     #[serde(rename = "isPaused")]
///     is_paused: bool,
/// }
///
/// subscribe_json(
///     conn,
///     "peril_direct",
///     "pause.alice",
///     "pause",
///     QueueDurability::Transient,
///     |state: PlayingState| {
///         println!("paused: {}", state.is_paused);
///         AckDecision::Ack
///     },
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn subscribe_json<T, H>(
    conn: &Connection,
    exchange: &str,
    queue_name: &str,
    binding_key: &str,
    durability: QueueDurability,
    handler: H,
) -> Result<Subscription, AmqpError>
where
    T: DeserializeOwned + Send + 'static,
    H: MessageHandler<T> + Send + 'static,
{
    let (channel, queue) =
        declare_and_bind(conn, exchange, queue_name, binding_key, durability).await?;

    let consumer = match channel
        .basic_consume(
            queue.name().as_str(),
            "",
            BasicConsumeOptions {
                no_local: false,
                no_ack: false,
                exclusive: false,
                nowait: false,
            },
            FieldTable::default(),
        )
        .await
    {
        Err(err) => {
            error!(
                error = err.to_string(),
                queue = queue_name,
                "error to create the consumer"
            );
            Err(AmqpError::ConsumeError(queue_name.to_owned()))
        }
        Ok(c) => Ok(c),
    }?;

    let queue = queue.name().to_string();
    let consumer_tag = consumer.tag().to_string();
    debug!(queue, consumer_tag, exchange, binding_key, "consuming queue");

    let task = tokio::spawn({
        let queue = queue.clone();
        async move {
            consumer::run::<T, H, _, _>(queue, consumer, handler).await;
            // the channel belongs to this subscription and closes with it
            drop(channel);
        }
    });

    Ok(Subscription {
        queue,
        consumer_tag,
        task,
    })
}
