// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Acknowledgment Policy
//!
//! [`AckDecision`] is what a message handler returns. The subscriber turns every
//! decision into exactly one broker call (ack, or nack with or without requeue), so
//! handlers never touch delivery tags or the channel.

use std::fmt;

/// Outcome of handling one decoded message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckDecision {
    /// Processed; remove the message from the queue.
    Ack,
    /// Not processed; have the broker redeliver it.
    ///
    /// There is no redelivery cap and no dead-letter routing: a message that is
    /// requeued on every attempt is redelivered forever.
    NackRequeue,
    /// Not processed and never will be; drop it.
    NackDiscard,
}

impl AckDecision {
    /// Stable name used in logs and span attributes.
    pub fn as_str(&self) -> &'static str {
        match self {
            AckDecision::Ack => "ack",
            AckDecision::NackRequeue => "nack_requeue",
            AckDecision::NackDiscard => "nack_discard",
        }
    }
}

impl fmt::Display for AckDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_decision_has_a_distinct_name() {
        let names = [
            AckDecision::Ack.to_string(),
            AckDecision::NackRequeue.to_string(),
            AckDecision::NackDiscard.to_string(),
        ];

        assert_eq!(names, ["ack", "nack_requeue", "nack_discard"]);
    }
}
