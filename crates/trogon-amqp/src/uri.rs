//! Broker connection URI: `amqps://{username}:{password}@{host}/{vhost}`.

use std::fmt;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::config::{AmqpCredentials, AmqpTarget};

#[derive(Debug, thiserror::Error)]
pub enum UriError {
    #[error("invalid broker host: {0}")]
    InvalidHost(String),
    #[error("broker URI cannot carry credentials or a vhost")]
    CannotBeABase,
    #[error("vhost is not valid UTF-8 once percent-decoded")]
    InvalidVhost,
}

/// A fully assembled broker URI.
///
/// The URI embeds the broker password, so neither `Debug` nor `Display`
/// print it. Call [`ConnectionUri::expose`] only when handing it to the
/// AMQP client.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionUri(String);

impl ConnectionUri {
    /// Assembles the URI. Username, password and vhost are percent-encoded,
    /// so the default vhost `/` becomes `%2F`. A vhost that arrives already
    /// encoded (`%2F`) is decoded first and ends up the same.
    pub fn new(credentials: &AmqpCredentials, target: &AmqpTarget) -> Result<Self, UriError> {
        let mut url = Url::parse(&format!("{}://{}", target.scheme(), target.host))
            .map_err(|e| UriError::InvalidHost(e.to_string()))?;

        if url.host_str().is_none_or(str::is_empty) {
            return Err(UriError::InvalidHost("empty host".to_string()));
        }

        url.set_username(&credentials.username)
            .map_err(|()| UriError::CannotBeABase)?;
        url.set_password(Some(&credentials.password))
            .map_err(|()| UriError::CannotBeABase)?;
        let vhost = percent_decode_str(&target.vhost)
            .decode_utf8()
            .map_err(|_| UriError::InvalidVhost)?;
        url.path_segments_mut()
            .map_err(|()| UriError::CannotBeABase)?
            .clear()
            .push(&vhost);

        Ok(Self(url.into()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ConnectionUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConnectionUri(<redacted>)")
    }
}

impl fmt::Display for ConnectionUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}
