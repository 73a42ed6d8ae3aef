use std::time::Duration;

use lapin::{Connection, ConnectionProperties};
use tracing::{info, instrument, warn};

use crate::uri::ConnectionUri;

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("failed to connect to AMQP broker: {0}")]
    ConnectionFailed(#[source] lapin::Error),
    #[error("timed out after {0:?} connecting to AMQP broker")]
    Timeout(Duration),
}

fn connection_properties() -> ConnectionProperties {
    ConnectionProperties::default()
        .with_executor(tokio_executor_trait::Tokio::current())
        .with_reactor(tokio_reactor_trait::Tokio)
}

/// Opens one connection to the broker, bounded by `timeout`.
///
/// The URI is never logged; only the outcome is.
#[instrument(name = "amqp.connect", skip_all, fields(timeout_ms = timeout.as_millis() as u64))]
pub async fn connect(uri: &ConnectionUri, timeout: Duration) -> Result<Connection, ConnectError> {
    let attempt = Connection::connect(uri.expose(), connection_properties());

    match tokio::time::timeout(timeout, attempt).await {
        Ok(Ok(connection)) => {
            connection.on_error(|error| warn!(error = %error, "AMQP connection error"));
            info!("Connected to AMQP broker");
            Ok(connection)
        }
        Ok(Err(error)) => {
            warn!(error = %error, "Failed to connect to AMQP broker");
            Err(ConnectError::ConnectionFailed(error))
        }
        Err(_) => {
            warn!("Timed out connecting to AMQP broker");
            Err(ConnectError::Timeout(timeout))
        }
    }
}
