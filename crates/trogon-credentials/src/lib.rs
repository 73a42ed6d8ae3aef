//! Broker credentials kept encrypted in object storage.
//!
//! The credentials document (`{"username": "...", "password": "..."}`) is
//! stored encrypted in S3 and unlocked with KMS under an encryption context.
//! [`CredentialStore`] fetches and decrypts it on first use, then serves the
//! parsed value from memory for the rest of its lifetime.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use trogon_credentials::{CredentialStore, EncryptionContext, ObjectLocation};
//! use trogon_credentials::mocks::{MemoryObjectStore, MockDecryptor};
//!
//! #[derive(serde::Deserialize)]
//! struct Creds { username: String, password: String }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let location = ObjectLocation::new("config-bucket", "relay/creds.enc");
//! let objects = MemoryObjectStore::new();
//! objects.insert(&location, r#"{"username": "relay", "password": "pw"}"#);
//!
//! let store: CredentialStore<_, _, Creds> = CredentialStore::new(objects, MockDecryptor::new());
//! let creds = store.resolve(&location, &EncryptionContext::new()).await.unwrap();
//! assert_eq!(creds.username, "relay");
//! # }
//! ```

pub mod error;
pub mod location;
pub mod source;
pub mod store;

#[cfg(feature = "aws")]
pub mod aws;

#[cfg(any(test, feature = "test-support"))]
pub mod mocks;

pub use error::CredentialError;
pub use location::{EncryptionContext, EncryptionContextError, ObjectLocation};
pub use source::{Decryptor, ObjectStore};
pub use store::CredentialStore;

#[cfg(feature = "aws")]
pub use aws::{AwsError, KmsDecryptor, S3ObjectStore};
