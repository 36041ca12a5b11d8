// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Queue Definitions
//!
//! This module provides the types describing a queue and its binding to an exchange.
//! A queue's broker flags are never set one by one: they are derived from a
//! [`QueueDurability`] policy, so only the two valid combinations can be declared.

use lapin::options::QueueDeclareOptions;
use std::fmt;

/// Persistence and lifecycle policy of a queue.
///
/// | Durability  | durable | auto_delete | exclusive |
/// |-------------|---------|-------------|-----------|
/// | `Durable`   | true    | false       | false     |
/// | `Transient` | false   | true        | true      |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueDurability {
    /// Survives a broker restart and can be shared between connections.
    Durable,
    /// Scoped to the declaring connection and deleted once unused.
    Transient,
}

impl QueueDurability {
    /// Declare options for this policy, see the table above. Never passive and
    /// never `nowait`.
    pub fn declare_options(self) -> QueueDeclareOptions {
        match self {
            QueueDurability::Durable => QueueDeclareOptions {
                passive: false,
                durable: true,
                auto_delete: false,
                exclusive: false,
                nowait: false,
            },
            QueueDurability::Transient => QueueDeclareOptions {
                passive: false,
                durable: false,
                auto_delete: true,
                exclusive: true,
                nowait: false,
            },
        }
    }
}

impl fmt::Display for QueueDurability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueDurability::Durable => f.write_str("durable"),
            QueueDurability::Transient => f.write_str("transient"),
        }
    }
}

/// Definition of a queue: its name and durability policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QueueDefinition {
    pub(crate) name: String,
    pub(crate) durability: QueueDurability,
}

impl QueueDefinition {
    pub(crate) fn new(name: &str, durability: QueueDurability) -> QueueDefinition {
        QueueDefinition {
            name: name.to_owned(),
            durability,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn durability(&self) -> QueueDurability {
        self.durability
    }

    pub(crate) fn declare_options(&self) -> QueueDeclareOptions {
        self.durability.declare_options()
    }
}

/// Configuration for binding a queue to an exchange.
///
/// Queue bindings define how messages flow from exchanges to queues based on
/// routing keys and exchange types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct QueueBinding<'qeb> {
    pub(crate) queue_name: &'qeb str,
    pub(crate) exchange_name: &'qeb str,
    pub(crate) routing_key: &'qeb str,
}

impl<'qeb> QueueBinding<'qeb> {
    /// Creates a new queue binding for the given queue.
    ///
    /// By default, the exchange name and routing key are empty strings.
    /// These should be set using the `exchange` and `routing_key` methods.
    pub(crate) fn new(queue: &'qeb str) -> QueueBinding<'qeb> {
        QueueBinding {
            queue_name: queue,
            exchange_name: "",
            routing_key: "",
        }
    }

    /// Sets the exchange to bind the queue to.
    pub(crate) fn exchange(mut self, exchange: &'qeb str) -> Self {
        self.exchange_name = exchange;
        self
    }

    /// Sets the routing key for the binding.
    pub(crate) fn routing_key(mut self, key: &'qeb str) -> Self {
        self.routing_key = key;
        self
    }
}
