//! The `POST` operation: validate the body, then publish it onto its exchange.

use serde_json::Value;
use tracing::instrument;
use trogon_amqp::{AmqpCredentials, AmqpPublisher, AmqpTarget, ConnectionUri, OutgoingMessage};

use crate::error::GatewayError;
use crate::json;

/// Routing fields taken from a publish body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    /// Empty selects the broker's default exchange.
    pub exchange: String,
    pub priority: u8,
}

impl PublishRequest {
    pub fn from_body(body: &Value) -> Result<Self, GatewayError> {
        let Value::Object(fields) = body else {
            return Err(GatewayError::InvalidRequest(
                "request body must be a JSON object".to_string(),
            ));
        };

        let exchange = match fields.get("exchange") {
            Some(Value::String(exchange)) => exchange.clone(),
            Some(_) => {
                return Err(GatewayError::InvalidRequest(
                    "\"exchange\" must be a string".to_string(),
                ));
            }
            None => {
                return Err(GatewayError::InvalidRequest(
                    "missing required field \"exchange\"".to_string(),
                ));
            }
        };

        let priority = match fields.get("priority") {
            Some(value) => coerce_priority(value)?,
            None => {
                return Err(GatewayError::InvalidRequest(
                    "missing required field \"priority\"".to_string(),
                ));
            }
        };

        Ok(Self { exchange, priority })
    }
}

/// Reads an AMQP priority octet from an integer, a finite float (truncated),
/// a string holding an integer, or a boolean (`true` is 1).
pub fn coerce_priority(value: &Value) -> Result<u8, GatewayError> {
    let invalid = || GatewayError::InvalidPriority {
        value: json::value_to_string(value),
    };

    let wide: i128 = match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i128::from(i)
            } else if let Some(u) = n.as_u64() {
                i128::from(u)
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() && f.trunc().abs() < 1e30 => f.trunc() as i128,
                    _ => return Err(invalid()),
                }
            }
        }
        Value::String(s) => s.trim().parse::<i128>().map_err(|_| invalid())?,
        Value::Bool(b) => i128::from(*b),
        _ => return Err(invalid()),
    };

    u8::try_from(wide).map_err(|_| invalid())
}

/// Publishes `body` to `request.exchange` and hands the body back unchanged.
#[instrument(
    name = "gateway.publish",
    skip_all,
    fields(exchange = %request.exchange, priority = request.priority, vhost = %target.vhost)
)]
pub async fn forward<P: AmqpPublisher>(
    publisher: &P,
    credentials: &AmqpCredentials,
    target: &AmqpTarget,
    request: &PublishRequest,
    body: Value,
) -> Result<Value, GatewayError> {
    let uri = ConnectionUri::new(credentials, target)?;
    let payload = json::value_to_string(&body);
    let message = OutgoingMessage::new(request.exchange.clone(), request.priority, payload);

    publisher.publish(&uri, message).await?;
    Ok(body)
}
