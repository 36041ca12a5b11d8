// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # AMQP Connection and Channel Management
//!
//! This module establishes the connection to the broker and opens the channels the
//! adapter works on. A channel is a single-owner handle: the declarator opens one per
//! subscription, and a publisher is expected to keep one dedicated to publishing.

use crate::{configs::RabbitMQConfigs, errors::AmqpError};
use lapin::{types::LongString, Channel, Connection, ConnectionProperties};
use tracing::{debug, error};

/// Connects to the broker described by `cfg`.
///
/// The connection is named after `cfg.app_name` so it can be identified in the
/// broker's management tools.
///
/// # Parameters
/// * `cfg` - Connection parameters, see [`RabbitMQConfigs::uri`]
///
/// # Returns
/// * `Result<Connection, AmqpError>` -
///   The open connection, or `ConnectionError` when the broker cannot be reached or
///   refuses the credentials.
///
/// # Example
/// ```no_run
/// # async fn run() -> Result<(), pubsub::errors::AmqpError> {
/// let cfg = pubsub::configs::RabbitMQConfigs::load()?;
/// let conn = pubsub::channel::new_amqp_connection(&cfg).await?;
/// # Ok(())
/// # }
/// ```
pub async fn new_amqp_connection(cfg: &RabbitMQConfigs) -> Result<Connection, AmqpError> {
    debug!("creating amqp connection...");
    let options = ConnectionProperties::default()
        .with_connection_name(LongString::from(cfg.app_name.clone()));

    match Connection::connect(&cfg.uri(), options).await {
        Ok(conn) => {
            debug!("amqp connected");
            Ok(conn)
        }
        Err(err) => {
            error!(error = err.to_string(), host = %cfg.host, "failure to connect");
            Err(AmqpError::ConnectionError)
        }
    }
}

/// Opens a new channel on `conn`.
///
/// # Parameters
/// * `conn` - Open connection to create the channel on
///
/// # Returns
/// The new channel. Fails with [`AmqpError::ChannelError`] when the connection is closed or
/// otherwise unusable.
pub async fn open_channel(conn: &Connection) -> Result<Channel, AmqpError> {
    debug!("creating amqp channel...");
    match conn.create_channel().await {
        Ok(channel) => {
            debug!(channel = channel.id(), "channel created");
            Ok(channel)
        }
        Err(err) => {
            error!(error = err.to_string(), "error to create the channel");
            Err(AmqpError::ChannelError(format!(
                "on connection in state {:?}",
                conn.status().state()
            )))
        }
    }
}
