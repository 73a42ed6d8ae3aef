use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::json;

pub const STATUS_OK: &str = "200";
pub const STATUS_BAD_REQUEST: &str = "400";

/// The API Gateway response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundResponse {
    pub status_code: String,
    pub body: String,
    pub headers: BTreeMap<String, String>,
}

/// Builds the envelope for an invocation outcome.
///
/// A truthy `err` yields `"400"` with the error as body; anything else yields
/// `"200"` with `result` as body (`null` when absent).
pub fn respond(err: Option<&Value>, result: Option<&Value>) -> OutboundResponse {
    let (status, body) = match err.filter(|e| is_truthy(e)) {
        Some(err) => (STATUS_BAD_REQUEST, json::value_to_string(err)),
        None => (
            STATUS_OK,
            result.map_or_else(|| "null".to_string(), json::value_to_string),
        ),
    };

    OutboundResponse {
        status_code: status.to_string(),
        body,
        headers: BTreeMap::from([("Content-Type".to_string(), "application/json".to_string())]),
    }
}

/// `{"message": <text>}`, the body shape for every gateway-generated message.
pub fn message(text: impl Into<String>) -> Value {
    let mut body = serde_json::Map::new();
    body.insert("message".to_string(), Value::String(text.into()));
    Value::Object(body)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
