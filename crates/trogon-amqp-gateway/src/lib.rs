//! # trogon-amqp-gateway
//!
//! Publishes HTTPS requests from API Gateway onto a RabbitMQ exchange.
//!
//! ## How it works
//!
//! 1. API Gateway invokes the Lambda with the request method and JSON body.
//! 2. `POST` bodies carry `exchange` and `priority`; any other method gets a
//!    `"200"` response saying it is unsupported.
//! 3. Broker credentials are fetched from S3 and decrypted with KMS on the
//!    first publish, then kept in memory for the life of the process.
//! 4. The body is published once to `exchange` over `amqps://` with an empty
//!    routing key and the given priority, and echoed back as the response.
//!
//! Outside Lambda (no `AWS_LAMBDA_RUNTIME_API`), the same gateway is served
//! over plain HTTP for local development.
//!
//! ## Configuration (env vars)
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `ADDRESS` | required | Broker host, optionally `host:port` |
//! | `VHOST` | required | Broker vhost |
//! | `APPNAME` | required | Application name (logged only) |
//! | `ENCRYPTION_CONTEXT` | required | KMS encryption context: JSON object or `k=v,k=v` |
//! | `CONFIG_BUCKET` | required | S3 bucket holding the encrypted credentials |
//! | `CONFIG_PATH` | required | S3 key of the encrypted credentials |
//! | `AMQP_TLS` | `true` | `false` for plaintext `amqp://` (local brokers only) |
//! | `AMQP_PUBLISHER_CONFIRMS` | `true` | Wait for broker ACK/NACK on every publish |
//! | `AMQP_CONNECT_TIMEOUT_SECS` | `10` | Broker connect timeout |
//! | `AMQP_PUBLISH_TIMEOUT_SECS` | `10` | Publish timeout |
//! | `CREDENTIALS_TIMEOUT_SECS` | `10` | Timeout of each S3/KMS call |
//! | `GATEWAY_HTTP_PORT` | `8080` | Local HTTP server port |
//! | `RUST_LOG` | `info` | Log filter |

pub mod config;
pub mod dispatch;
pub mod env;
pub mod error;
pub mod gateway;
pub mod json;
pub mod lambda;
pub mod publish;
pub mod request;
pub mod response;
pub mod server;

pub use config::{ConfigError, GatewayConfig};
pub use error::GatewayError;
pub use gateway::Gateway;
pub use request::{GatewayEvent, InboundRequest};
pub use response::{OutboundResponse, respond};
pub use server::serve;
