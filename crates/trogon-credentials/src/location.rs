//! Where the encrypted credentials live and how to unlock them.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Bucket + key of the encrypted credentials blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncryptionContextError {
    #[error("encryption context JSON must be an object of string values: {0}")]
    InvalidJson(String),
    #[error("encryption context pair '{0}' is not of the form key=value")]
    InvalidPair(String),
}

/// Additional authenticated data the key-management service checks on decrypt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptionContext(BTreeMap<String, String>);

impl EncryptionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Accepts either a JSON object (`{"app": "relay"}`) or comma-separated
    /// `key=value` pairs (`app=relay,stage=prod`). Blank input is an empty context.
    pub fn parse(raw: &str) -> Result<Self, EncryptionContextError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::new());
        }

        if raw.starts_with('{') {
            return serde_json::from_str::<BTreeMap<String, String>>(raw)
                .map(Self)
                .map_err(|e| EncryptionContextError::InvalidJson(e.to_string()));
        }

        raw.split(',')
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((k, v)) if !k.trim().is_empty() => {
                    Ok((k.trim().to_string(), v.trim().to_string()))
                }
                _ => Err(EncryptionContextError::InvalidPair(pair.to_string())),
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Self)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_map(&self) -> HashMap<String, String> {
        self.0.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}
