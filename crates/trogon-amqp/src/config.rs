use std::fmt;

use serde::Deserialize;

/// Broker endpoint: host (optionally `host:port`) and vhost.
///
/// TLS (`amqps`) is the default. Plaintext `amqp` exists for local brokers
/// only and must be requested with [`AmqpTarget::with_plaintext`].
#[derive(Clone, PartialEq, Eq)]
pub struct AmqpTarget {
    pub host: String,
    pub vhost: String,
    pub tls: bool,
}

impl AmqpTarget {
    pub fn new(host: impl Into<String>, vhost: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            vhost: vhost.into(),
            tls: true,
        }
    }

    /// Connect over plaintext `amqp://`. **Only for development.**
    pub fn with_plaintext(mut self) -> Self {
        self.tls = false;
        self
    }

    pub fn scheme(&self) -> &'static str {
        if self.tls { "amqps" } else { "amqp" }
    }
}

// Host never reaches the logs.
impl fmt::Debug for AmqpTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmqpTarget")
            .field("host", &"<redacted>")
            .field("vhost", &self.vhost)
            .field("tls", &self.tls)
            .finish()
    }
}

/// Username/password pair for the broker.
///
/// Deserializes from the decrypted credentials document
/// (`{"username": "...", "password": "..."}`); unknown fields are ignored.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct AmqpCredentials {
    pub username: String,
    pub password: String,
}

impl AmqpCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for AmqpCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmqpCredentials")
            .field("username", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}
