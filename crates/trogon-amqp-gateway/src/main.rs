#![recursion_limit = "256"]

use std::sync::Arc;

use aws_config::BehaviorVersion;
use tracing::error;
use trogon_amqp::LapinPublisher;
use trogon_amqp_gateway::env::{ReadEnv, SystemEnv};
use trogon_amqp_gateway::{Gateway, GatewayConfig, lambda, serve};
use trogon_credentials::{CredentialStore, KmsDecryptor, S3ObjectStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match GatewayConfig::from_env(&SystemEnv) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let aws = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let credentials = CredentialStore::new(
        S3ObjectStore::new(aws_sdk_s3::Client::new(&aws)),
        KmsDecryptor::new(aws_sdk_kms::Client::new(&aws)),
    )
    .with_timeout(config.credentials_timeout);

    let publisher = LapinPublisher::new()
        .with_connect_timeout(config.connect_timeout)
        .with_publish_timeout(config.publish_timeout)
        .with_confirms(config.publisher_confirms);

    let port = config.http_port;
    let gateway = Arc::new(Gateway::new(config, credentials, publisher));

    if SystemEnv.non_empty(lambda::RUNTIME_API_VAR).is_some() {
        lambda::run(gateway).await
    } else {
        serve(gateway, port).await?;
        Ok(())
    }
}
