//! AWS Lambda entry: each invocation event goes through [`Gateway::handle_event`].

use std::sync::Arc;

use lambda_runtime::{Error, LambdaEvent, service_fn};
use serde_json::Value;
use trogon_amqp::AmqpPublisher;
use trogon_credentials::{Decryptor, ObjectStore};

use crate::gateway::Gateway;
use crate::response::OutboundResponse;

/// Set by the Lambda execution environment.
pub const RUNTIME_API_VAR: &str = "AWS_LAMBDA_RUNTIME_API";

/// Polls the Lambda runtime API until the execution environment shuts down.
pub async fn run<S, D, P>(gateway: Arc<Gateway<S, D, P>>) -> Result<(), Error>
where
    S: ObjectStore,
    D: Decryptor,
    P: AmqpPublisher,
{
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let gateway = Arc::clone(&gateway);
        async move { invoke(&gateway, event).await }
    }))
    .await
}

async fn invoke<S, D, P>(
    gateway: &Gateway<S, D, P>,
    event: LambdaEvent<Value>,
) -> Result<OutboundResponse, Error>
where
    S: ObjectStore,
    D: Decryptor,
    P: AmqpPublisher,
{
    Ok(gateway.handle_event(event.payload).await?)
}
