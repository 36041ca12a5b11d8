// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Queue Topology Declaration
//!
//! This module ensures a queue exists with the flags of its durability policy and is
//! bound to an exchange under a binding key. Queue declare and queue bind are both
//! idempotent on the broker, so declaring the same (exchange, queue, key, durability)
//! tuple again succeeds without creating a second binding.
//!
//! Each step maps its failure to its own error: [`AmqpError::ChannelError`],
//! [`AmqpError::DeclareQueueError`] or [`AmqpError::BindingExchangeToQueueError`].
//! Nothing is retried here; the caller decides.

use crate::{
    channel::open_channel,
    errors::AmqpError,
    queue::{QueueBinding, QueueDefinition, QueueDurability},
};
use lapin::{options::QueueBindOptions, types::FieldTable, Channel, Connection, Queue};
use tracing::{debug, error};

/// Opens a channel on `conn`, declares `queue_name` and binds it to `exchange`
/// under `binding_key`.
///
/// The returned channel is owned by the caller and is the one the queue was
/// declared on, which matters for transient (exclusive) queues.
///
/// # Parameters
/// * `conn` - Open connection the channel is created on
/// * `exchange` - Name of an already declared exchange to bind to
/// * `queue_name` - Name of the queue to declare
/// * `binding_key` - Routing key (or topic pattern) of the binding
/// * `durability` - Policy the queue's declare flags are derived from
///
/// # Returns
/// * `Result<(Channel, Queue), AmqpError>` -
///   The channel the queue was declared on and the broker's view of the queue, or
///   the error of the first step that failed.
///
/// # Example
/// ```no_run
/// # async fn run(conn: &lapin::Connection) -> Result<(), pubsub::errors::AmqpError> {
/// use pubsub::{queue::QueueDurability, topology::declare_and_bind};
///
/// let (channel, queue) =
///     declare_and_bind(conn, "peril_topic", "game_logs", "game_logs.*", QueueDurability::Durable)
///         .await?;
/// # Ok(())
/// # }
/// ```
pub async fn declare_and_bind(
    conn: &Connection,
    exchange: &str,
    queue_name: &str,
    binding_key: &str,
    durability: QueueDurability,
) -> Result<(Channel, Queue), AmqpError> {
    let binding = QueueBinding::new(queue_name)
        .exchange(exchange)
        .routing_key(binding_key);

    let channel = open_channel(conn).await.map_err(|err| {
        error!(
            error = err.to_string(),
            exchange, queue = queue_name, key = binding_key,
            "failure to open the channel for the queue"
        );
        AmqpError::ChannelError(format!(
            "for queue `{queue_name}` (exchange `{exchange}`, key `{binding_key}`)"
        ))
    })?;

    let def = QueueDefinition::new(queue_name, durability);
    let queue = declare_queue(&channel, &def, &binding).await?;
    bind_queue(&channel, &binding).await?;

    Ok((channel, queue))
}

async fn declare_queue(
    channel: &Channel,
    def: &QueueDefinition,
    binding: &QueueBinding<'_>,
) -> Result<Queue, AmqpError> {
    debug!("creating {} queue: {}", def.durability(), def.name());

    match channel
        .queue_declare(def.name(), def.declare_options(), FieldTable::default())
        .await
    {
        Err(err) => {
            error!(
                error = err.to_string(),
                queue = def.name(),
                "error to declare the queue"
            );
            Err(AmqpError::DeclareQueueError {
                exchange: binding.exchange_name.to_owned(),
                queue: def.name().to_owned(),
                key: binding.routing_key.to_owned(),
            })
        }
        Ok(queue) => {
            debug!("queue: {} was created", def.name());
            Ok(queue)
        }
    }
}

async fn bind_queue(channel: &Channel, binding: &QueueBinding<'_>) -> Result<(), AmqpError> {
    debug!(
        "binding queue: {} to the exchange: {} with the key: {}",
        binding.queue_name, binding.exchange_name, binding.routing_key
    );

    match channel
        .queue_bind(
            binding.queue_name,
            binding.exchange_name,
            binding.routing_key,
            QueueBindOptions { nowait: false },
            FieldTable::default(),
        )
        .await
    {
        Err(err) => {
            error!(error = err.to_string(), "error to bind queue to exchange");

            Err(AmqpError::BindingExchangeToQueueError {
                exchange: binding.exchange_name.to_owned(),
                queue: binding.queue_name.to_owned(),
                key: binding.routing_key.to_owned(),
            })
        }
        _ => {
            debug!("queue was bounded");
            Ok(())
        }
    }
}
