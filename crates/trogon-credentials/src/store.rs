//! [`CredentialStore`]: fetch + decrypt once, then serve from memory.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;
use tracing::{info, instrument};

use crate::error::CredentialError;
use crate::location::{EncryptionContext, ObjectLocation};
use crate::source::{Decryptor, ObjectStore};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolves credentials at most once for its own lifetime.
///
/// The first successful [`resolve`](Self::resolve) wins and every later call
/// returns the cached value without any external call. Concurrent first
/// callers share a single in-flight resolution. A failed resolution caches
/// nothing, so the next call tries again. There is no way to refresh a
/// cached value; build a new store instead.
pub struct CredentialStore<S, D, C> {
    objects: S,
    decryptor: D,
    timeout: Duration,
    cached: OnceCell<C>,
}

impl<S, D, C> CredentialStore<S, D, C>
where
    S: ObjectStore,
    D: Decryptor,
    C: DeserializeOwned + Send + Sync,
{
    pub fn new(objects: S, decryptor: D) -> Self {
        Self {
            objects,
            decryptor,
            timeout: DEFAULT_TIMEOUT,
            cached: OnceCell::new(),
        }
    }

    /// Bound each external call (fetch, decrypt) by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_resolved(&self) -> bool {
        self.cached.initialized()
    }

    #[instrument(name = "credentials.resolve", skip_all, fields(cached = self.is_resolved()))]
    pub async fn resolve(
        &self,
        location: &ObjectLocation,
        context: &EncryptionContext,
    ) -> Result<&C, CredentialError> {
        self.cached
            .get_or_try_init(|| self.fetch(location, context))
            .await
    }

    async fn fetch(
        &self,
        location: &ObjectLocation,
        context: &EncryptionContext,
    ) -> Result<C, CredentialError> {
        info!(location = %location, "Fetching encrypted credentials");

        let blob = tokio::time::timeout(self.timeout, self.objects.get_object(location))
            .await
            .map_err(|_| CredentialError::Timeout {
                stage: "object fetch",
                timeout: self.timeout,
            })?
            .map_err(|e| CredentialError::Fetch {
                location: location.to_string(),
                source: Box::new(e),
            })?;

        let plaintext = tokio::time::timeout(self.timeout, self.decryptor.decrypt(blob, context))
            .await
            .map_err(|_| CredentialError::Timeout {
                stage: "decrypt",
                timeout: self.timeout,
            })?
            .map_err(|e| CredentialError::Decrypt(Box::new(e)))?;

        let credentials =
            serde_json::from_slice(&plaintext).map_err(|e| CredentialError::malformed(&e))?;

        info!("Credentials resolved and cached");
        Ok(credentials)
    }
}
