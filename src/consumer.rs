// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Delivery Processing
//!
//! This module is the body of a subscription: it decodes each delivery, hands the
//! decoded value to the handler and settles the delivery with exactly one broker call.
//!
//! Per delivery:
//! 1. Decode the body as JSON into `T`
//! 2. On decode failure, nack without requeue and stop: the handler is never called
//!    for a body that can never be decoded, and requeuing it would loop forever
//! 3. Otherwise call the handler and map its [`AckDecision`] to ack, nack+requeue or
//!    nack+discard
//!
//! Errors in here never reach the caller of `subscribe_json`; they are logged and
//! recorded on the delivery's span, and the loop moves on to the next delivery.

use crate::{ack::AckDecision, errors::AmqpError, otel, subscriber::MessageHandler};
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use lapin::{
    acker::Acker,
    message::Delivery,
    options::{BasicAckOptions, BasicNackOptions},
    types::FieldTable,
};
use opentelemetry::{
    global::{self, BoxedTracer},
    trace::{Status, TraceContextExt},
    KeyValue,
};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use tracing::{debug, error, warn};

/// Span attribute holding the decision a delivery was settled with.
pub(crate) const ACK_DECISION_ATTRIBUTE: &str = "messaging.ack_decision";

/// Settles a single delivery on the broker.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait DeliveryAcker: Send + Sync {
    async fn ack_one(&self) -> Result<(), lapin::Error>;

    async fn nack_one(&self, requeue: bool) -> Result<(), lapin::Error>;
}

#[async_trait]
impl DeliveryAcker for Acker {
    async fn ack_one(&self) -> Result<(), lapin::Error> {
        self.ack(BasicAckOptions { multiple: false }).await
    }

    async fn nack_one(&self, requeue: bool) -> Result<(), lapin::Error> {
        self.nack(BasicNackOptions {
            multiple: false,
            requeue,
        })
        .await
    }
}

/// A delivery as seen by the processing loop.
pub(crate) trait InboundDelivery: Send {
    type Acker: DeliveryAcker;

    fn body(&self) -> &[u8];

    fn headers(&self) -> Option<&FieldTable>;

    fn delivery_tag(&self) -> u64;

    fn redelivered(&self) -> bool;

    fn acker(&self) -> &Self::Acker;
}

impl InboundDelivery for Delivery {
    type Acker = Acker;

    fn body(&self) -> &[u8] {
        &self.data
    }

    fn headers(&self) -> Option<&FieldTable> {
        self.properties.headers().as_ref()
    }

    fn delivery_tag(&self) -> u64 {
        self.delivery_tag
    }

    fn redelivered(&self) -> bool {
        self.redelivered
    }

    fn acker(&self) -> &Acker {
        &self.acker
    }
}

/// Terminal state of one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeliveryOutcome {
    /// The body could not be decoded; nacked without requeue.
    Discarded,
    /// The handler ran and its decision was applied.
    Handled(AckDecision),
}

/// Issues the one broker call that corresponds to `decision`.
async fn acknowledge<A>(decision: AckDecision, acker: &A) -> Result<(), AmqpError>
where
    A: DeliveryAcker + ?Sized,
{
    match decision {
        AckDecision::Ack => acker.ack_one().await.map_err(|err| {
            error!(error = err.to_string(), "error whiling ack msg");
            AmqpError::AckMessageError
        }),
        AckDecision::NackRequeue => nack(acker, true).await,
        AckDecision::NackDiscard => nack(acker, false).await,
    }
}

async fn nack<A>(acker: &A, requeue: bool) -> Result<(), AmqpError>
where
    A: DeliveryAcker + ?Sized,
{
    acker.nack_one(requeue).await.map_err(|err| {
        error!(error = err.to_string(), requeue, "error whiling nack msg");
        AmqpError::NackMessageError
    })
}

/// Decodes, handles and settles one delivery.
pub(crate) async fn consume<T, H, D>(
    tracer: &BoxedTracer,
    queue: &str,
    delivery: D,
    handler: &mut H,
) -> Result<DeliveryOutcome, AmqpError>
where
    T: DeserializeOwned,
    H: MessageHandler<T>,
    D: InboundDelivery,
{
    let (ctx, span) = otel::new_span(delivery.headers(), tracer, queue);
    let cx = ctx.with_span(span);

    debug!(
        queue,
        delivery_tag = delivery.delivery_tag(),
        redelivered = delivery.redelivered(),
        "received message"
    );

    let decoded = serde_json::from_slice::<T>(delivery.body())
        .map_err(|err| AmqpError::DecodingError(err.to_string()));

    let message = match decoded {
        Ok(message) => message,
        Err(err) => {
            warn!(
                error = err.to_string(),
                queue,
                delivery_tag = delivery.delivery_tag(),
                "removing message from queue - reason: payload cannot be decoded"
            );
            cx.span().record_error(&err);
            cx.span().set_status(Status::Error {
                description: Cow::from("failure to decode payload"),
            });
            cx.span().set_attribute(KeyValue::new(
                ACK_DECISION_ATTRIBUTE,
                AckDecision::NackDiscard.as_str(),
            ));

            acknowledge(AckDecision::NackDiscard, delivery.acker()).await?;
            return Ok(DeliveryOutcome::Discarded);
        }
    };

    let decision = {
        let _guard = cx.clone().attach();
        handler.handle(message)
    };

    cx.span()
        .set_attribute(KeyValue::new(ACK_DECISION_ATTRIBUTE, decision.as_str()));

    match decision {
        AckDecision::Ack => debug!(queue, "message successfully processed"),
        AckDecision::NackRequeue => warn!(queue, "message not processed, requeuing for latter"),
        AckDecision::NackDiscard => warn!(queue, "message rejected by handler, discarding"),
    }

    if let Err(err) = acknowledge(decision, delivery.acker()).await {
        cx.span().record_error(&err);
        cx.span().set_status(Status::Error {
            description: Cow::from("error to settle msg"),
        });
        return Err(err);
    }

    if decision == AckDecision::Ack {
        cx.span().set_status(Status::Ok);
    }

    Ok(DeliveryOutcome::Handled(decision))
}

/// Processes `deliveries` in order until the stream ends.
///
/// The handler runs on this task, so a slow handler holds back the next delivery of
/// this subscription only.
pub(crate) async fn run<T, H, S, D>(queue: String, mut deliveries: S, mut handler: H)
where
    T: DeserializeOwned,
    H: MessageHandler<T>,
    S: Stream<Item = Result<D, lapin::Error>> + Unpin,
    D: InboundDelivery,
{
    let tracer = global::tracer("amqp subscriber");

    while let Some(result) = deliveries.next().await {
        match result {
            Ok(delivery) => {
                match consume::<T, H, D>(&tracer, &queue, delivery, &mut handler).await {
                    Ok(outcome) => debug!(queue = %queue, ?outcome, "delivery settled"),
                    Err(err) => {
                        error!(error = err.to_string(), queue = %queue, "error consume msg")
                    }
                }
            }
            Err(err) => error!(error = err.to_string(), queue = %queue, "errors consume msg"),
        }
    }

    debug!(queue = %queue, "delivery stream closed");
}
