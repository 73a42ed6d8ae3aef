use std::time::Duration;

use trogon_amqp::AmqpTarget;
use trogon_credentials::{EncryptionContext, EncryptionContextError, ObjectLocation};

use crate::env::ReadEnv;

const ENV_ADDRESS: &str = "ADDRESS";
const ENV_VHOST: &str = "VHOST";
const ENV_APPNAME: &str = "APPNAME";
const ENV_ENCRYPTION_CONTEXT: &str = "ENCRYPTION_CONTEXT";
const ENV_CONFIG_BUCKET: &str = "CONFIG_BUCKET";
const ENV_CONFIG_PATH: &str = "CONFIG_PATH";
const ENV_AMQP_TLS: &str = "AMQP_TLS";
const ENV_AMQP_PUBLISHER_CONFIRMS: &str = "AMQP_PUBLISHER_CONFIRMS";
const ENV_AMQP_CONNECT_TIMEOUT_SECS: &str = "AMQP_CONNECT_TIMEOUT_SECS";
const ENV_AMQP_PUBLISH_TIMEOUT_SECS: &str = "AMQP_PUBLISH_TIMEOUT_SECS";
const ENV_CREDENTIALS_TIMEOUT_SECS: &str = "CREDENTIALS_TIMEOUT_SECS";
const ENV_GATEWAY_HTTP_PORT: &str = "GATEWAY_HTTP_PORT";

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_HTTP_PORT: u16 = 8080;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("invalid ENCRYPTION_CONTEXT: {0}")]
    InvalidEncryptionContext(#[from] EncryptionContextError),
}

/// Configuration for the gateway, read once at process start.
///
/// Resolved from environment variables:
/// - `ADDRESS`, `VHOST`: broker host (optionally `host:port`) and vhost (required)
/// - `APPNAME`: application name, used only in logs (required)
/// - `ENCRYPTION_CONTEXT`: KMS encryption context, JSON object or `k=v,k=v` (required)
/// - `CONFIG_BUCKET`, `CONFIG_PATH`: S3 location of the encrypted credentials (required)
/// - `AMQP_TLS`: `false` for plaintext `amqp://` on local brokers (default: `true`)
/// - `AMQP_PUBLISHER_CONFIRMS`: fail the publish on broker NACK (default: `true`)
/// - `AMQP_CONNECT_TIMEOUT_SECS`, `AMQP_PUBLISH_TIMEOUT_SECS`, `CREDENTIALS_TIMEOUT_SECS` (default: 10)
/// - `GATEWAY_HTTP_PORT`: port of the local HTTP server (default: 8080)
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub target: AmqpTarget,
    pub app_name: String,
    pub encryption_context: EncryptionContext,
    pub credentials_location: ObjectLocation,
    pub publisher_confirms: bool,
    pub connect_timeout: Duration,
    pub publish_timeout: Duration,
    pub credentials_timeout: Duration,
    pub http_port: u16,
}

impl GatewayConfig {
    /// Every required variable is checked; all missing names are reported together.
    pub fn from_env<E: ReadEnv>(env: &E) -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        let mut required = |key: &'static str| {
            env.non_empty(key).unwrap_or_else(|| {
                missing.push(key);
                String::new()
            })
        };

        let host = required(ENV_ADDRESS);
        let vhost = required(ENV_VHOST);
        let app_name = required(ENV_APPNAME);
        let raw_context = required(ENV_ENCRYPTION_CONTEXT);
        let bucket = required(ENV_CONFIG_BUCKET);
        let path = required(ENV_CONFIG_PATH);

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let mut target = AmqpTarget::new(host, vhost);
        if !flag(env, ENV_AMQP_TLS, true) {
            target = target.with_plaintext();
        }

        Ok(Self {
            target,
            app_name,
            encryption_context: EncryptionContext::parse(&raw_context)?,
            credentials_location: ObjectLocation::new(bucket, path),
            publisher_confirms: flag(env, ENV_AMQP_PUBLISHER_CONFIRMS, true),
            connect_timeout: secs(env, ENV_AMQP_CONNECT_TIMEOUT_SECS),
            publish_timeout: secs(env, ENV_AMQP_PUBLISH_TIMEOUT_SECS),
            credentials_timeout: secs(env, ENV_CREDENTIALS_TIMEOUT_SECS),
            http_port: env
                .non_empty(ENV_GATEWAY_HTTP_PORT)
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_HTTP_PORT),
        })
    }
}

fn flag<E: ReadEnv>(env: &E, key: &str, default: bool) -> bool {
    match env.non_empty(key).map(|v| v.to_ascii_lowercase()).as_deref() {
        Some("true" | "1" | "yes") => true,
        Some("false" | "0" | "no") => false,
        _ => default,
    }
}

fn secs<E: ReadEnv>(env: &E, key: &str) -> Duration {
    Duration::from_secs(
        env.non_empty(key)
            .and_then(|v| v.parse().ok())
            .filter(|&s: &u64| s > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::InMemoryEnv;

    fn complete_env() -> InMemoryEnv {
        let env = InMemoryEnv::new();
        env.set("ADDRESS", "broker.internal");
        env.set("VHOST", "orders");
        env.set("APPNAME", "orders-relay");
        env.set("ENCRYPTION_CONTEXT", r#"{"app": "orders-relay"}"#);
        env.set("CONFIG_BUCKET", "config-bucket");
        env.set("CONFIG_PATH", "relay/creds.enc");
        env
    }

    #[test]
    fn reads_required_vars_with_defaults() {
        let config = GatewayConfig::from_env(&complete_env()).unwrap();

        assert_eq!(config.target, AmqpTarget::new("broker.internal", "orders"));
        assert!(config.target.tls);
        assert_eq!(config.app_name, "orders-relay");
        assert_eq!(config.encryption_context.get("app"), Some("orders-relay"));
        assert_eq!(
            config.credentials_location,
            ObjectLocation::new("config-bucket", "relay/creds.enc")
        );
        assert!(config.publisher_confirms);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.publish_timeout, Duration::from_secs(10));
        assert_eq!(config.credentials_timeout, Duration::from_secs(10));
        assert_eq!(config.http_port, 8080);
    }

    #[test]
    fn all_missing_is_a_configuration_error() {
        let err = GatewayConfig::from_env(&InMemoryEnv::new()).unwrap_err();

        assert_eq!(
            err.to_string(),
            "missing required environment variables: ADDRESS, VHOST, APPNAME, \
             ENCRYPTION_CONTEXT, CONFIG_BUCKET, CONFIG_PATH"
        );
    }

    #[test]
    fn each_required_var_is_checked_on_its_own() {
        for key in [
            "ADDRESS",
            "VHOST",
            "APPNAME",
            "ENCRYPTION_CONTEXT",
            "CONFIG_BUCKET",
            "CONFIG_PATH",
        ] {
            let env = complete_env();
            env.remove(key);

            match GatewayConfig::from_env(&env) {
                Err(ConfigError::Missing(names)) => assert_eq!(names, vec![key]),
                other => panic!("expected Missing([{key}]), got {other:?}"),
            }
        }
    }

    #[test]
    fn blank_values_count_as_missing() {
        let env = complete_env();
        env.set("VHOST", "  ");

        assert!(matches!(
            GatewayConfig::from_env(&env),
            Err(ConfigError::Missing(names)) if names == vec!["VHOST"]
        ));
    }

    #[test]
    fn reads_optional_overrides() {
        let env = complete_env();
        env.set("AMQP_TLS", "false");
        env.set("AMQP_PUBLISHER_CONFIRMS", "false");
        env.set("AMQP_CONNECT_TIMEOUT_SECS", "3");
        env.set("AMQP_PUBLISH_TIMEOUT_SECS", "4");
        env.set("CREDENTIALS_TIMEOUT_SECS", "5");
        env.set("GATEWAY_HTTP_PORT", "9090");

        let config = GatewayConfig::from_env(&env).unwrap();

        assert!(!config.target.tls);
        assert!(!config.publisher_confirms);
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.publish_timeout, Duration::from_secs(4));
        assert_eq!(config.credentials_timeout, Duration::from_secs(5));
        assert_eq!(config.http_port, 9090);
    }

    #[test]
    fn invalid_optional_values_fall_back_to_defaults() {
        let env = complete_env();
        env.set("AMQP_TLS", "maybe");
        env.set("AMQP_CONNECT_TIMEOUT_SECS", "not-a-number");
        env.set("AMQP_PUBLISH_TIMEOUT_SECS", "0");
        env.set("GATEWAY_HTTP_PORT", "70000");

        let config = GatewayConfig::from_env(&env).unwrap();

        assert!(config.target.tls);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.publish_timeout, Duration::from_secs(10));
        assert_eq!(config.http_port, 8080);
    }

    #[test]
    fn key_value_encryption_context_is_accepted() {
        let env = complete_env();
        env.set("ENCRYPTION_CONTEXT", "app=orders-relay,stage=prod");

        let config = GatewayConfig::from_env(&env).unwrap();

        assert_eq!(config.encryption_context.get("stage"), Some("prod"));
    }

    #[test]
    fn malformed_encryption_context_is_rejected() {
        let env = complete_env();
        env.set("ENCRYPTION_CONTEXT", "orders-relay");

        let err = GatewayConfig::from_env(&env).unwrap_err();

        assert!(matches!(err, ConfigError::InvalidEncryptionContext(_)));
        assert!(err.to_string().starts_with("invalid ENCRYPTION_CONTEXT"));
    }
}
