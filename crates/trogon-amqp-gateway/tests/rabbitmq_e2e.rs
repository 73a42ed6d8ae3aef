//! End-to-end tests against a real RabbitMQ broker.
//!
//! Requires Docker (uses testcontainers to start RabbitMQ).
//!
//! Run with:
//!   cargo test -p trogon-amqp-gateway --test rabbitmq_e2e
//!
//! What these tests verify:
//!   1. Credentials come from the (in-memory) object store, once
//!   2. A POST body lands on a fanout exchange with its priority and an empty routing key
//!   3. The payload is the body in the gateway's JSON layout
//!   4. A missing exchange fails the invocation with publisher confirms on or off
//!   5. An unreachable broker fails the invocation as broker-unavailable

use std::time::Duration;

use lapin::options::{
    BasicGetOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Channel, ExchangeKind};
use serde_json::json;
use testcontainers_modules::rabbitmq::RabbitMq;
use testcontainers_modules::testcontainers::{ContainerAsync, runners::AsyncRunner};
use trogon_amqp::{AmqpCredentials, AmqpTarget, ConnectionUri, LapinPublisher, connect};
use trogon_amqp_gateway::{Gateway, GatewayConfig, GatewayError};
use trogon_credentials::mocks::{MemoryObjectStore, MockDecryptor};
use trogon_credentials::{CredentialStore, EncryptionContext, ObjectLocation};

// ── Shared helpers ────────────────────────────────────────────────────────────

async fn start_rabbitmq() -> (ContainerAsync<RabbitMq>, String) {
    let container = RabbitMq::default()
        .start()
        .await
        .expect("Failed to start RabbitMQ container — is Docker running?");
    let port = container.get_host_port_ipv4(5672).await.unwrap();
    (container, format!("127.0.0.1:{port}"))
}

fn gateway(
    address: &str,
    objects: MemoryObjectStore,
    confirms: bool,
) -> Gateway<MemoryObjectStore, MockDecryptor, LapinPublisher> {
    let config = GatewayConfig {
        target: AmqpTarget::new(address, "/").with_plaintext(),
        app_name: "orders-relay-e2e".to_string(),
        encryption_context: EncryptionContext::new().with("app", "orders-relay"),
        credentials_location: ObjectLocation::new("config-bucket", "relay/creds.enc"),
        publisher_confirms: confirms,
        connect_timeout: Duration::from_secs(5),
        publish_timeout: Duration::from_secs(5),
        credentials_timeout: Duration::from_secs(5),
        http_port: 0,
    };
    objects.insert(
        &config.credentials_location,
        r#"{"username": "guest", "password": "guest"}"#,
    );

    let publisher = LapinPublisher::new()
        .with_connect_timeout(config.connect_timeout)
        .with_publish_timeout(config.publish_timeout)
        .with_confirms(config.publisher_confirms);
    let store = CredentialStore::new(objects, MockDecryptor::new())
        .with_timeout(config.credentials_timeout);

    Gateway::new(config, store, publisher)
}

/// Declares a fanout exchange with one bound, server-named queue.
async fn bind_queue(address: &str, exchange: &str) -> (lapin::Connection, Channel, String) {
    let target = AmqpTarget::new(address, "/").with_plaintext();
    let uri = ConnectionUri::new(&AmqpCredentials::new("guest", "guest"), &target).unwrap();
    let conn = connect(&uri, Duration::from_secs(5))
        .await
        .expect("Failed to connect to RabbitMQ");
    let channel = conn.create_channel().await.unwrap();

    channel
        .exchange_declare(
            exchange,
            ExchangeKind::Fanout,
            ExchangeDeclareOptions::default(),
            FieldTable::default(),
        )
        .await
        .unwrap();
    let queue = channel
        .queue_declare(
            "",
            QueueDeclareOptions {
                exclusive: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .unwrap();
    let queue = queue.name().as_str().to_string();
    channel
        .queue_bind(
            &queue,
            exchange,
            "",
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await
        .unwrap();

    (conn, channel, queue)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_post_body_is_published_to_exchange() {
    let (_rabbitmq, address) = start_rabbitmq().await;
    let (_conn, channel, queue) = bind_queue(&address, "orders").await;
    let objects = MemoryObjectStore::new();
    let gateway = gateway(&address, objects.clone(), true);

    let response = gateway
        .handle_event(json!({
            "context": {"http-method": "POST"},
            "body-json": {"exchange": "orders", "priority": 7, "order": {"id": 42, "note": "café"}}
        }))
        .await
        .expect("publish should succeed");

    assert_eq!(response.status_code, "200");

    let message = channel
        .basic_get(&queue, BasicGetOptions { no_ack: true })
        .await
        .unwrap()
        .expect("message should have been routed to the bound queue");

    assert_eq!(
        std::str::from_utf8(&message.delivery.data).unwrap(),
        r#"{"exchange": "orders", "priority": 7, "order": {"id": 42, "note": "caf\u00e9"}}"#
    );
    assert_eq!(response.body.as_bytes(), message.delivery.data.as_slice());
    assert_eq!(message.delivery.properties.priority(), &Some(7));
    assert_eq!(message.delivery.routing_key.as_str(), "");
    assert_eq!(objects.calls(), 1);
}

#[tokio::test]
async fn e2e_credentials_are_fetched_once_for_many_publishes() {
    let (_rabbitmq, address) = start_rabbitmq().await;
    let (_conn, channel, queue) = bind_queue(&address, "orders").await;
    let objects = MemoryObjectStore::new();
    let gateway = gateway(&address, objects.clone(), true);

    for priority in 1..=3 {
        gateway
            .handle_event(json!({
                "httpMethod": "POST",
                "body": format!(r#"{{"exchange": "orders", "priority": {priority}}}"#)
            }))
            .await
            .expect("publish should succeed");
    }

    let mut priorities = Vec::new();
    while let Some(message) = channel
        .basic_get(&queue, BasicGetOptions { no_ack: true })
        .await
        .unwrap()
    {
        priorities.push(message.delivery.properties.priority().unwrap_or_default());
    }

    assert_eq!(priorities, vec![1, 2, 3]);
    assert_eq!(objects.calls(), 1);
}

#[tokio::test]
async fn e2e_missing_exchange_fails_the_invocation() {
    let (_rabbitmq, address) = start_rabbitmq().await;
    let gateway = gateway(&address, MemoryObjectStore::new(), true);

    let err = gateway
        .handle_event(json!({
            "context": {"http-method": "POST"},
            "body-json": {"exchange": "does-not-exist", "priority": 1}
        }))
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Publish(_)), "got {err:?}");
}

#[tokio::test]
async fn e2e_missing_exchange_fails_without_confirms() {
    let (_rabbitmq, address) = start_rabbitmq().await;
    let gateway = gateway(&address, MemoryObjectStore::new(), false);

    let err = gateway
        .handle_event(json!({
            "context": {"http-method": "POST"},
            "body-json": {"exchange": "does-not-exist", "priority": 1}
        }))
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Publish(_)), "got {err:?}");
}

#[tokio::test]
async fn e2e_publish_without_confirms_is_delivered() {
    let (_rabbitmq, address) = start_rabbitmq().await;
    let (_conn, channel, queue) = bind_queue(&address, "orders").await;
    let gateway = gateway(&address, MemoryObjectStore::new(), false);

    let response = gateway
        .handle_event(json!({
            "httpMethod": "POST",
            "body": r#"{"exchange": "orders", "priority": 4}"#
        }))
        .await
        .expect("publish should succeed");

    assert_eq!(response.status_code, "200");
    let message = channel
        .basic_get(&queue, BasicGetOptions { no_ack: true })
        .await
        .unwrap()
        .expect("message should have been routed to the bound queue");
    assert_eq!(message.delivery.properties.priority(), &Some(4));
}

#[tokio::test]
async fn unreachable_broker_is_broker_unavailable() {
    let gateway = gateway("127.0.0.1:1", MemoryObjectStore::new(), true);

    let err = gateway
        .handle_event(json!({
            "context": {"http-method": "POST"},
            "body-json": {"exchange": "orders", "priority": 1}
        }))
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::BrokerUnavailable(_)), "got {err:?}");
}
