//! In-memory [`ObjectStore`] and [`Decryptor`] for tests.
//!
//! Enabled with the `test-support` feature:
//!
//! ```toml
//! [dev-dependencies]
//! trogon-credentials = { workspace = true, features = ["test-support"] }
//! ```

use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use std::time::Duration;

use bytes::Bytes;

use crate::location::{EncryptionContext, ObjectLocation};
use crate::source::{Decryptor, ObjectStore};

#[derive(Debug, Clone)]
pub struct MockError(pub String);

impl std::fmt::Display for MockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for MockError {}

// ── MemoryObjectStore ─────────────────────────────────────────────────────────

/// Object storage backed by a `HashMap`, with a call counter.
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<Mutex<HashMap<(String, String), Bytes>>>,
    calls: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
    delay: Arc<Mutex<Option<Duration>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, location: &ObjectLocation, contents: impl Into<Bytes>) {
        self.objects.lock().unwrap().insert(
            (location.bucket.clone(), location.key.clone()),
            contents.into(),
        );
    }

    /// Every subsequent fetch fails with `AccessDenied`.
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn recover(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }

    /// Sleep this long inside every fetch.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ObjectStore for MemoryObjectStore {
    type Error = MockError;

    async fn get_object(&self, location: &ObjectLocation) -> Result<Bytes, Self::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(MockError("AccessDenied".to_string()));
        }

        self.objects
            .lock()
            .unwrap()
            .get(&(location.bucket.clone(), location.key.clone()))
            .cloned()
            .ok_or_else(|| MockError("NoSuchKey".to_string()))
    }
}

// ── MockDecryptor ─────────────────────────────────────────────────────────────

/// Returns the ciphertext unchanged, so seeded objects act as plaintext.
#[derive(Clone, Default)]
pub struct MockDecryptor {
    calls: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
    contexts: Arc<Mutex<Vec<EncryptionContext>>>,
}

impl MockDecryptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent decrypt fails with `InvalidCiphertextException`.
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn recover(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Encryption contexts seen so far, in call order.
    pub fn contexts(&self) -> Vec<EncryptionContext> {
        self.contexts.lock().unwrap().clone()
    }
}

impl Decryptor for MockDecryptor {
    type Error = MockError;

    async fn decrypt(
        &self,
        ciphertext: Bytes,
        context: &EncryptionContext,
    ) -> Result<Bytes, Self::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.contexts.lock().unwrap().push(context.clone());

        if self.failing.load(Ordering::SeqCst) {
            return Err(MockError("InvalidCiphertextException".to_string()));
        }

        Ok(ciphertext)
    }
}
