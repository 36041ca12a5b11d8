// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # OpenTelemetry Integration
//!
//! Trace context travels in the AMQP message headers: the publisher injects the
//! current context, the subscriber extracts it and parents the per-delivery span on it.
//! Without a propagator installed by the process both directions are no-ops.

use lapin::types::{AMQPValue, FieldTable, ShortString};
use opentelemetry::{
    global::{BoxedSpan, BoxedTracer},
    propagation::{Extractor, Injector},
    trace::{SpanKind, Tracer},
    Context,
};
use std::{borrow::Cow, collections::BTreeMap};
use tracing::error;

/// Writes trace context entries into outgoing message headers.
pub(crate) struct HeaderInjector<'a> {
    headers: &'a mut BTreeMap<ShortString, AMQPValue>,
}

impl<'a> HeaderInjector<'a> {
    pub(crate) fn new(headers: &'a mut BTreeMap<ShortString, AMQPValue>) -> Self {
        Self { headers }
    }
}

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        self.headers.insert(
            key.to_lowercase().into(),
            AMQPValue::LongString(value.into()),
        );
    }
}

/// Reads trace context entries from incoming message headers.
pub(crate) struct HeaderExtractor<'a> {
    headers: &'a BTreeMap<ShortString, AMQPValue>,
}

impl<'a> HeaderExtractor<'a> {
    pub(crate) fn new(headers: &'a BTreeMap<ShortString, AMQPValue>) -> Self {
        Self { headers }
    }
}

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(|header_value| {
            if let AMQPValue::LongString(header_value) = header_value {
                std::str::from_utf8(header_value.as_bytes())
                    .map_err(|e| error!("Error decoding header value {:?}", e))
                    .ok()
            } else {
                None
            }
        })
    }

    fn keys(&self) -> Vec<&str> {
        self.headers.keys().map(|header| header.as_str()).collect()
    }
}

/// Injects the current trace context into a fresh header table.
pub(crate) fn inject_current_context() -> FieldTable {
    let mut headers = BTreeMap::<ShortString, AMQPValue>::default();

    opentelemetry::global::get_text_map_propagator(|propagator| {
        propagator.inject_context(&Context::current(), &mut HeaderInjector::new(&mut headers))
    });

    FieldTable::from(headers)
}

/// Creates a consumer span for one delivery, parented on the context carried by
/// `headers`.
///
/// Returns the extracted parent context and the new span.
pub(crate) fn new_span(
    headers: Option<&FieldTable>,
    tracer: &BoxedTracer,
    name: &str,
) -> (Context, BoxedSpan) {
    let empty = BTreeMap::new();
    let headers = headers.map(|table| table.inner()).unwrap_or(&empty);

    let ctx = opentelemetry::global::get_text_map_propagator(|propagator| {
        propagator.extract(&HeaderExtractor::new(headers))
    });

    let span = tracer
        .span_builder(Cow::from(name.to_owned()))
        .with_kind(SpanKind::Consumer)
        .start_with_context(tracer, &ctx);

    (ctx, span)
}
