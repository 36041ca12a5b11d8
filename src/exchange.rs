// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Exchange Declaration
//!
//! The adapter publishes to and binds against exchanges it does not own. This module
//! lets a process (or a test harness) make sure those exchanges exist before queues
//! are bound to them. Declaring an existing exchange with the same kind and flags is a
//! no-op on the broker.

use crate::errors::AmqpError;
use lapin::{options::ExchangeDeclareOptions, types::FieldTable, Channel};
use tracing::{debug, error};

/// Represents the types of exchanges available in the broker.
///
/// - Direct: Routes messages to queues based on an exact match of routing keys
/// - Fanout: Broadcasts messages to all bound queues regardless of routing keys
/// - Topic: Routes messages based on wildcard pattern matching of routing keys
/// - Headers: Routes based on message header values instead of routing keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExchangeKind {
    #[default]
    Direct,
    Fanout,
    Topic,
    Headers,
}

impl From<ExchangeKind> for lapin::ExchangeKind {
    fn from(kind: ExchangeKind) -> Self {
        match kind {
            ExchangeKind::Direct => lapin::ExchangeKind::Direct,
            ExchangeKind::Fanout => lapin::ExchangeKind::Fanout,
            ExchangeKind::Headers => lapin::ExchangeKind::Headers,
            ExchangeKind::Topic => lapin::ExchangeKind::Topic,
        }
    }
}

/// Definition of an exchange with its configuration parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeDefinition<'ex> {
    pub(crate) name: &'ex str,
    pub(crate) kind: ExchangeKind,
    pub(crate) durable: bool,
}

impl<'ex> ExchangeDefinition<'ex> {
    /// Creates a new, non-durable direct exchange definition.
    pub fn new(name: &'ex str) -> ExchangeDefinition<'ex> {
        ExchangeDefinition {
            name,
            kind: ExchangeKind::Direct,
            durable: false,
        }
    }

    /// Sets the exchange type.
    pub fn kind(mut self, kind: ExchangeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Shorthand for `kind(ExchangeKind::Direct)`.
    pub fn direct(self) -> Self {
        self.kind(ExchangeKind::Direct)
    }

    /// Shorthand for `kind(ExchangeKind::Topic)`.
    pub fn topic(self) -> Self {
        self.kind(ExchangeKind::Topic)
    }

    /// Shorthand for `kind(ExchangeKind::Fanout)`.
    pub fn fanout(self) -> Self {
        self.kind(ExchangeKind::Fanout)
    }

    /// Makes the exchange durable, persisting across broker restarts.
    pub fn durable(mut self) -> Self {
        self.durable = true;
        self
    }

    fn declare_options(&self) -> ExchangeDeclareOptions {
        ExchangeDeclareOptions {
            passive: false,
            durable: self.durable,
            auto_delete: false,
            internal: false,
            nowait: false,
        }
    }
}

/// Declares the exchange described by `def` on `channel`.
///
/// Declaring an existing exchange with the same kind and durability succeeds;
/// a mismatch is refused by the broker and closes the channel.
///
/// # Parameters
/// * `channel` - Channel to declare the exchange on
/// * `def` - Name, kind and durability of the exchange
///
/// # Returns
/// Ok(()) on success or `DeclareExchangeError` carrying the exchange name
pub async fn declare_exchange(
    channel: &Channel,
    def: &ExchangeDefinition<'_>,
) -> Result<(), AmqpError> {
    debug!("creating exchange: {}", def.name);

    match channel
        .exchange_declare(
            def.name,
            def.kind.into(),
            def.declare_options(),
            FieldTable::default(),
        )
        .await
    {
        Err(err) => {
            error!(
                error = err.to_string(),
                name = def.name,
                "error to declare the exchange"
            );
            Err(AmqpError::DeclareExchangeError(def.name.to_owned()))
        }
        _ => {
            debug!("exchange: {} was created", def.name);
            Ok(())
        }
    }
}
