//! Invocation event decoding.
//!
//! Two trigger shapes are accepted:
//! - the non-proxy mapping template: `{"context": {"http-method": "POST"}, "body-json": {...}}`
//! - the proxy integration: `{"httpMethod": "POST", "body": "<json text>"}`,
//!   base64-encoded when `isBase64Encoded` is set

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::Value;

use crate::error::GatewayError;

/// The part of an invocation the gateway acts on.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundRequest {
    pub method: String,
    pub body: Value,
}

impl InboundRequest {
    pub fn new(method: impl Into<String>, body: Value) -> Self {
        Self {
            method: method.into(),
            body,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct EventContext {
    #[serde(rename = "http-method")]
    http_method: Option<String>,
}

/// A raw invocation payload in either supported shape.
#[derive(Debug, Deserialize)]
pub struct GatewayEvent {
    #[serde(default)]
    context: Option<EventContext>,
    #[serde(rename = "body-json")]
    body_json: Option<Value>,
    #[serde(rename = "httpMethod")]
    http_method: Option<String>,
    body: Option<Value>,
    #[serde(rename = "isBase64Encoded", default)]
    is_base64_encoded: bool,
}

impl GatewayEvent {
    pub fn from_value(event: Value) -> Result<Self, GatewayError> {
        serde_json::from_value(event).map_err(|e| GatewayError::InvalidEvent(e.to_string()))
    }

    pub fn into_request(self) -> Result<InboundRequest, GatewayError> {
        let method = self
            .context
            .and_then(|c| c.http_method)
            .or(self.http_method)
            .ok_or_else(|| GatewayError::InvalidEvent("no HTTP method in event".to_string()))?;

        let body = match (self.body_json, self.body) {
            (Some(body), _) => body,
            (None, Some(Value::String(raw))) if self.is_base64_encoded => {
                parse_body(&decode_base64_body(&raw)?)?
            }
            (None, Some(Value::String(raw))) => parse_body(&raw)?,
            (None, Some(body)) => body,
            (None, None) => Value::Null,
        };

        Ok(InboundRequest { method, body })
    }
}

impl TryFrom<Value> for InboundRequest {
    type Error = GatewayError;

    fn try_from(event: Value) -> Result<Self, Self::Error> {
        GatewayEvent::from_value(event)?.into_request()
    }
}

fn decode_base64_body(raw: &str) -> Result<String, GatewayError> {
    let bytes = STANDARD.decode(raw.trim()).map_err(|e| {
        GatewayError::InvalidRequest(format!("request body is not valid base64: {e}"))
    })?;
    String::from_utf8(bytes)
        .map_err(|_| GatewayError::InvalidRequest("request body is not valid UTF-8".to_string()))
}

/// Parses a textual request body; blank text is `null`.
pub fn parse_body(raw: &str) -> Result<Value, GatewayError> {
    if raw.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(raw)
        .map_err(|e| GatewayError::InvalidRequest(format!("request body is not valid JSON: {e}")))
}
