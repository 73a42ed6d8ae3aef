use trogon_amqp::{PublishError, UriError};
use trogon_credentials::CredentialError;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid invocation event: {0}")]
    InvalidEvent(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("invalid priority {value}: expected an integer between 0 and 255")]
    InvalidPriority { value: String },

    #[error("credentials unavailable: {0}")]
    Credentials(#[from] CredentialError),

    #[error("cannot build broker URI: {0}")]
    InvalidUri(#[from] UriError),

    #[error("{0}")]
    BrokerUnavailable(#[source] PublishError),

    #[error("{0}")]
    Publish(#[source] PublishError),
}

impl From<PublishError> for GatewayError {
    fn from(e: PublishError) -> Self {
        if e.is_unavailable() {
            Self::BrokerUnavailable(e)
        } else {
            Self::Publish(e)
        }
    }
}
