use serde_json::Value;
use tracing::{info, instrument, warn};
use trogon_amqp::{AmqpCredentials, AmqpPublisher};
use trogon_credentials::{CredentialStore, Decryptor, ObjectStore};

use crate::config::GatewayConfig;
use crate::dispatch::{Dispatch, Route, dispatch};
use crate::error::GatewayError;
use crate::publish::{PublishRequest, forward};
use crate::request::InboundRequest;
use crate::response::{OutboundResponse, message, respond};

/// Long-lived service: one per process, shared by every invocation.
///
/// Owns the credential cache, so credentials are fetched at most once per
/// instance.
pub struct Gateway<S, D, P> {
    config: GatewayConfig,
    credentials: CredentialStore<S, D, AmqpCredentials>,
    publisher: P,
}

impl<S, D, P> Gateway<S, D, P>
where
    S: ObjectStore,
    D: Decryptor,
    P: AmqpPublisher,
{
    pub fn new(
        config: GatewayConfig,
        credentials: CredentialStore<S, D, AmqpCredentials>,
        publisher: P,
    ) -> Self {
        Self {
            config,
            credentials,
            publisher,
        }
    }

    /// Decodes a raw invocation event, then [`handle`](Self::handle)s it.
    pub async fn handle_event(&self, event: Value) -> Result<OutboundResponse, GatewayError> {
        let request = InboundRequest::try_from(event).inspect_err(|e| {
            warn!(error = %e, "Invocation failed");
        })?;
        self.handle(request).await
    }

    /// `Ok` carries the `"200"` envelope. Every error, including a malformed
    /// body or priority, fails the invocation.
    #[instrument(
        name = "gateway.invoke",
        skip_all,
        fields(method = %request.method, app = %self.config.app_name)
    )]
    pub async fn handle(&self, request: InboundRequest) -> Result<OutboundResponse, GatewayError> {
        match self.route(request).await {
            Ok(result) => Ok(respond(None, Some(&result))),
            Err(e) => {
                warn!(error = %e, "Invocation failed");
                Err(e)
            }
        }
    }

    async fn route(&self, request: InboundRequest) -> Result<Value, GatewayError> {
        let route = match dispatch(&request.method) {
            Dispatch::Route(route) => route,
            Dispatch::Unsupported(method) => {
                info!("Unsupported method");
                return Ok(message(format!("Unsupported method \"{method}\"")));
            }
        };

        match route {
            Route::Publish => self.publish(request.body).await,
        }
    }

    async fn publish(&self, body: Value) -> Result<Value, GatewayError> {
        let request = PublishRequest::from_body(&body)?;

        let credentials = self
            .credentials
            .resolve(
                &self.config.credentials_location,
                &self.config.encryption_context,
            )
            .await?;

        forward(
            &self.publisher,
            credentials,
            &self.config.target,
            &request,
            body,
        )
        .await
    }
}
