// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! End-to-end scenarios against a live broker.
//!
//! Run with a local RabbitMQ (`RABBITMQ_*` variables override the guest defaults):
//! `cargo test -- --ignored`

use lapin::{
    options::{BasicPublishOptions, QueueDeclareOptions, QueueDeleteOptions},
    types::FieldTable,
    BasicProperties, Channel, Connection,
};
use pubsub::{
    ack::AckDecision,
    channel::{new_amqp_connection, open_channel},
    configs::RabbitMQConfigs,
    exchange::{declare_exchange, ExchangeDefinition},
    publisher::publish_json,
    queue::QueueDurability,
    subscriber::subscribe_json,
    topology::declare_and_bind,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::{sync::mpsc, time::timeout};
use uuid::Uuid;

const EXCHANGE_DIRECT: &str = "peril_direct";
const PAUSE_KEY: &str = "pause";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PlayingState {
    #[serde(rename = "isPaused")]
    is_paused: bool,
}

async fn connect() -> Connection {
    let cfg = RabbitMQConfigs::load().expect("configs");
    let conn = new_amqp_connection(&cfg).await.expect("broker connection");

    let channel = open_channel(&conn).await.expect("setup channel");
    declare_exchange(&channel, &ExchangeDefinition::new(EXCHANGE_DIRECT).direct().durable())
        .await
        .expect("direct exchange");

    conn
}

async fn queued_messages(channel: &Channel, queue: &str) -> u32 {
    channel
        .queue_declare(
            queue,
            QueueDeclareOptions {
                passive: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await
        .expect("passive declare")
        .message_count()
}

fn unique(prefix: &str) -> String {
    format!("{prefix}.{}", Uuid::new_v4())
}

#[tokio::test]
#[ignore = "requires a running RabbitMQ broker"]
async fn declare_and_bind_is_idempotent() {
    let conn = connect().await;
    let publisher = open_channel(&conn).await.expect("publish channel");

    for durability in [QueueDurability::Durable, QueueDurability::Transient] {
        let queue = unique("game_logs");

        let (channel, first) = declare_and_bind(&conn, EXCHANGE_DIRECT, &queue, &queue, durability)
            .await
            .expect("first declaration");
        let (_, second) = declare_and_bind(&conn, EXCHANGE_DIRECT, &queue, &queue, durability)
            .await
            .expect("second declaration");
        assert_eq!(first.name().as_str(), queue);
        assert_eq!(second.name().as_str(), queue);

        publish_json(
            &publisher,
            EXCHANGE_DIRECT,
            &queue,
            &PlayingState { is_paused: true },
        )
        .await
        .expect("publish");

        // a duplicate binding would route a second copy
        let mut count = 0;
        for _ in 0..50 {
            count = queued_messages(&channel, &queue).await;
            if count > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(count, 1, "{durability} queue received {count} copies");
        assert_eq!(queued_messages(&channel, &queue).await, 1);

        channel
            .queue_delete(&queue, QueueDeleteOptions::default())
            .await
            .expect("queue delete");
    }
}

#[tokio::test]
#[ignore = "requires a running RabbitMQ broker"]
async fn conflicting_redeclaration_is_a_declare_error() {
    let conn = connect().await;
    let queue = unique("game_logs");

    let (channel, _) = declare_and_bind(
        &conn,
        EXCHANGE_DIRECT,
        &queue,
        &queue,
        QueueDurability::Transient,
    )
    .await
    .expect("first declaration");

    let err = declare_and_bind(&conn, EXCHANGE_DIRECT, &queue, &queue, QueueDurability::Durable)
        .await
        .unwrap_err();

    assert!(matches!(err, pubsub::errors::AmqpError::DeclareQueueError { .. }));
    drop(channel);
}

#[tokio::test]
#[ignore = "requires a running RabbitMQ broker"]
async fn pause_state_is_delivered_once() {
    let conn = connect().await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    subscribe_json(
        &conn,
        EXCHANGE_DIRECT,
        &unique(PAUSE_KEY),
        PAUSE_KEY,
        QueueDurability::Transient,
        move |state: PlayingState| {
            let _ = tx.send(state);
            AckDecision::Ack
        },
    )
    .await
    .expect("subscribe");

    let publisher = open_channel(&conn).await.expect("publish channel");
    publish_json(
        &publisher,
        EXCHANGE_DIRECT,
        PAUSE_KEY,
        &PlayingState { is_paused: true },
    )
    .await
    .expect("publish");

    let received = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("delivery within 5s");
    assert_eq!(received, Some(PlayingState { is_paused: true }));

    assert!(timeout(Duration::from_millis(500), rx.recv()).await.is_err());
}

#[tokio::test]
#[ignore = "requires a running RabbitMQ broker"]
async fn undecodable_bodies_are_dropped_without_reaching_the_handler() {
    let conn = connect().await;
    let key = unique("blob");
    let queue = unique("blob");
    let (tx, mut rx) = mpsc::unbounded_channel();

    subscribe_json(
        &conn,
        EXCHANGE_DIRECT,
        &queue,
        &key,
        QueueDurability::Transient,
        move |state: PlayingState| {
            let _ = tx.send(state);
            AckDecision::Ack
        },
    )
    .await
    .expect("subscribe");

    let publisher = open_channel(&conn).await.expect("publish channel");
    publisher
        .basic_publish(
            "",
            &queue,
            BasicPublishOptions::default(),
            b"\x00\x01 definitely not json",
            BasicProperties::default(),
        )
        .await
        .expect("raw publish");
    publish_json(&publisher, EXCHANGE_DIRECT, &key, &PlayingState { is_paused: false })
        .await
        .expect("publish");

    let received = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("delivery within 5s");
    assert_eq!(received, Some(PlayingState { is_paused: false }));
    assert!(timeout(Duration::from_millis(500), rx.recv()).await.is_err());

    assert_eq!(queued_messages(&publisher, &queue).await, 0);
}

#[tokio::test]
#[ignore = "requires a running RabbitMQ broker"]
async fn requeued_messages_are_redelivered_until_acked() {
    let conn = connect().await;
    let key = unique("requeue");
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut attempts = 0;
    subscribe_json(
        &conn,
        EXCHANGE_DIRECT,
        &unique("requeue"),
        &key,
        QueueDurability::Transient,
        move |state: PlayingState| {
            attempts += 1;
            let _ = tx.send((attempts, state));
            if attempts < 3 {
                AckDecision::NackRequeue
            } else {
                AckDecision::Ack
            }
        },
    )
    .await
    .expect("subscribe");

    let publisher = open_channel(&conn).await.expect("publish channel");
    publish_json(&publisher, EXCHANGE_DIRECT, &key, &PlayingState { is_paused: true })
        .await
        .expect("publish");

    for expected in 1..=3 {
        let (attempt, state) = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("delivery within 5s")
            .expect("handler alive");
        assert_eq!(attempt, expected);
        assert_eq!(state, PlayingState { is_paused: true });
    }

    assert!(timeout(Duration::from_millis(500), rx.recv()).await.is_err());
}
