//! The two external calls behind credential resolution.
//!
//! One trait per operation, so tests can swap either side independently.

use std::future::Future;

use bytes::Bytes;

use crate::location::{EncryptionContext, ObjectLocation};

/// Fetches the encrypted credentials blob.
pub trait ObjectStore: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    fn get_object(
        &self,
        location: &ObjectLocation,
    ) -> impl Future<Output = Result<Bytes, Self::Error>> + Send;
}

/// Turns the encrypted blob into plaintext JSON.
pub trait Decryptor: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    fn decrypt(
        &self,
        ciphertext: Bytes,
        context: &EncryptionContext,
    ) -> impl Future<Output = Result<Bytes, Self::Error>> + Send;
}
