use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions};
use lapin::{BasicProperties, Connection};
use tracing::{debug, info, instrument, warn};

use crate::connect::{ConnectError, connect};
use crate::uri::ConnectionUri;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

/// One message headed for an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub exchange: String,
    pub routing_key: String,
    pub priority: u8,
    pub payload: Bytes,
}

impl OutgoingMessage {
    /// A message with an empty routing key; delivery fan-out is left to the
    /// exchange type configured on the broker.
    pub fn new(exchange: impl Into<String>, priority: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            exchange: exchange.into(),
            routing_key: String::new(),
            priority,
            payload: payload.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("AMQP broker unavailable: {0}")]
    Unavailable(#[source] BoxError),
    #[error("publish to exchange '{exchange}' failed: {source}")]
    Failed {
        exchange: String,
        #[source]
        source: BoxError,
    },
    #[error("broker rejected message for exchange '{0}'")]
    Nacked(String),
    #[error("publish to exchange '{exchange}' timed out after {timeout:?}")]
    Timeout { exchange: String, timeout: Duration },
}

impl PublishError {
    /// `true` when no connection to the broker could be established.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<ConnectError> for PublishError {
    fn from(e: ConnectError) -> Self {
        Self::Unavailable(Box::new(e))
    }
}

/// Publishes a single message over a connection opened for that purpose.
///
/// Implemented by [`LapinPublisher`] in production and by
/// `MockPublisher` (`test-support` feature) in tests.
pub trait AmqpPublisher: Send + Sync + 'static {
    fn publish(
        &self,
        uri: &ConnectionUri,
        message: OutgoingMessage,
    ) -> impl Future<Output = Result<(), PublishError>> + Send;
}

/// Opens a fresh connection per publish and closes it afterwards.
#[derive(Debug, Clone)]
pub struct LapinPublisher {
    connect_timeout: Duration,
    publish_timeout: Duration,
    confirms: bool,
}

impl Default for LapinPublisher {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
            confirms: true,
        }
    }
}

impl LapinPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    /// Put the channel in confirm mode so a broker NACK fails the publish.
    /// On by default.
    pub fn with_confirms(mut self, confirms: bool) -> Self {
        self.confirms = confirms;
        self
    }

    async fn publish_on(
        &self,
        connection: &Connection,
        message: &OutgoingMessage,
    ) -> Result<(), PublishError> {
        let failed = |e: lapin::Error| PublishError::Failed {
            exchange: message.exchange.clone(),
            source: Box::new(e),
        };

        let channel = connection.create_channel().await.map_err(failed)?;

        if self.confirms {
            channel
                .confirm_select(ConfirmSelectOptions::default())
                .await
                .map_err(failed)?;
        }

        let confirmation = channel
            .basic_publish(
                &message.exchange,
                &message.routing_key,
                BasicPublishOptions::default(),
                &message.payload,
                BasicProperties::default().with_priority(message.priority),
            )
            .await
            .map_err(failed)?
            .await
            .map_err(failed)?;

        if confirmation.is_nack() {
            return Err(PublishError::Nacked(message.exchange.clone()));
        }

        // Without confirms, a publish to a missing exchange only surfaces as
        // the broker closing the channel.
        if !self.confirms {
            channel.close(200, "OK").await.map_err(failed)?;
        }

        Ok(())
    }
}

impl AmqpPublisher for LapinPublisher {
    #[instrument(
        name = "amqp.publish",
        skip_all,
        fields(exchange = %message.exchange, priority = message.priority, confirms = self.confirms)
    )]
    async fn publish(&self, uri: &ConnectionUri, message: OutgoingMessage) -> Result<(), PublishError> {
        let connection = connect(uri, self.connect_timeout).await?;

        let result = match tokio::time::timeout(
            self.publish_timeout,
            self.publish_on(&connection, &message),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(PublishError::Timeout {
                exchange: message.exchange.clone(),
                timeout: self.publish_timeout,
            }),
        };

        if let Err(e) = connection.close(200, "OK").await {
            debug!(error = %e, "Failed to close AMQP connection cleanly");
        }

        match &result {
            Ok(()) => info!(bytes = message.payload.len(), "Published message to AMQP broker"),
            Err(e) => warn!(error = %e, "Failed to publish message to AMQP broker"),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AmqpCredentials, AmqpTarget};

    #[test]
    fn outgoing_message_uses_empty_routing_key() {
        let message = OutgoingMessage::new("events", 5, Bytes::from_static(b"{}"));

        assert_eq!(message.routing_key, "");
        assert_eq!(message.exchange, "events");
        assert_eq!(message.priority, 5);
    }

    #[test]
    fn connect_errors_map_to_unavailable() {
        let err: PublishError = ConnectError::Timeout(Duration::from_secs(1)).into();

        assert!(err.is_unavailable());
        assert!(err.to_string().contains("unavailable"));
    }

    #[test]
    fn publish_failures_are_not_unavailable() {
        let nacked = PublishError::Nacked("events".to_string());
        let timeout = PublishError::Timeout {
            exchange: "events".to_string(),
            timeout: Duration::from_secs(3),
        };

        assert!(!nacked.is_unavailable());
        assert!(!timeout.is_unavailable());
        assert!(nacked.to_string().contains("events"));
        assert!(timeout.to_string().contains("3s"));
    }

    #[test]
    fn confirms_are_on_by_default() {
        let publisher = LapinPublisher::new();

        assert!(publisher.confirms);
        assert_eq!(publisher.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(publisher.publish_timeout, DEFAULT_PUBLISH_TIMEOUT);
    }

    #[test]
    fn builder_overrides_defaults() {
        let publisher = LapinPublisher::new()
            .with_connect_timeout(Duration::from_secs(2))
            .with_publish_timeout(Duration::from_secs(4))
            .with_confirms(false);

        assert_eq!(publisher.connect_timeout, Duration::from_secs(2));
        assert_eq!(publisher.publish_timeout, Duration::from_secs(4));
        assert!(!publisher.confirms);
    }

    #[tokio::test]
    async fn unreachable_broker_is_unavailable() {
        let port = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let uri = ConnectionUri::new(
            &AmqpCredentials::new("guest", "guest"),
            &AmqpTarget::new(format!("127.0.0.1:{port}"), "/").with_plaintext(),
        )
        .unwrap();

        let err = LapinPublisher::new()
            .publish(&uri, OutgoingMessage::new("events", 1, Bytes::from_static(b"{}")))
            .await
            .unwrap_err();

        assert!(err.is_unavailable());
    }
}
