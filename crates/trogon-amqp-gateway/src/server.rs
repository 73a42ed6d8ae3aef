use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
};
use tracing::{info, warn};
use trogon_amqp::AmqpPublisher;
use trogon_credentials::{Decryptor, ObjectStore};

use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::request::{InboundRequest, parse_body};
use crate::response::OutboundResponse;

/// Routes every method on every path to the gateway, the way API Gateway
/// forwards them in production.
pub fn router<S, D, P>(gateway: Arc<Gateway<S, D, P>>) -> Router
where
    S: ObjectStore,
    D: Decryptor,
    P: AmqpPublisher,
{
    Router::new()
        .route("/", any(handle_http::<S, D, P>))
        .route("/{*path}", any(handle_http::<S, D, P>))
        .with_state(gateway)
}

/// Starts the local HTTP server.
pub async fn serve<S, D, P>(gateway: Arc<Gateway<S, D, P>>, port: u16) -> std::io::Result<()>
where
    S: ObjectStore,
    D: Decryptor,
    P: AmqpPublisher,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(addr = %addr, "Gateway HTTP server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(gateway)).await
}

async fn handle_http<S, D, P>(
    State(gateway): State<Arc<Gateway<S, D, P>>>,
    method: Method,
    body: Bytes,
) -> Response
where
    S: ObjectStore,
    D: Decryptor,
    P: AmqpPublisher,
{
    let body = std::str::from_utf8(&body)
        .map_err(|_| GatewayError::InvalidRequest("request body is not valid UTF-8".to_string()))
        .and_then(parse_body);

    let outcome = match body {
        Ok(body) => {
            gateway
                .handle(InboundRequest::new(method.as_str(), body))
                .await
        }
        Err(e) => Err(e),
    };

    match outcome {
        Ok(envelope) => into_http(envelope),
        Err(e) => {
            warn!(error = %e, "Invocation failed");
            (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response()
        }
    }
}

fn into_http(envelope: OutboundResponse) -> Response {
    let status = StatusCode::from_bytes(envelope.status_code.as_bytes())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut headers = HeaderMap::new();
    for (name, value) in &envelope.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            headers.insert(name, value);
        }
    }

    (status, headers, envelope.body).into_response()
}
