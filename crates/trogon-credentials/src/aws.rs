//! S3 + KMS backends.
//!
//! Enabled with the `aws` Cargo feature (on by default).

use std::fmt;

use aws_sdk_kms::primitives::Blob;
use bytes::Bytes;

use crate::location::{EncryptionContext, ObjectLocation};
use crate::source::{Decryptor, ObjectStore};

/// An AWS SDK failure flattened to text, tagged with the API call.
#[derive(Debug)]
pub struct AwsError {
    operation: &'static str,
    message: String,
}

impl AwsError {
    fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

impl fmt::Display for AwsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.operation, self.message)
    }
}

impl std::error::Error for AwsError {}

/// [`ObjectStore`] over S3 `GetObject`.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

impl ObjectStore for S3ObjectStore {
    type Error = AwsError;

    async fn get_object(&self, location: &ObjectLocation) -> Result<Bytes, Self::Error> {
        let output = self
            .client
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .map_err(|e| {
                AwsError::new(
                    "s3:GetObject",
                    aws_sdk_s3::error::DisplayErrorContext(&e).to_string(),
                )
            })?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| AwsError::new("s3:GetObject", e.to_string()))?;

        Ok(body.into_bytes())
    }
}

/// [`Decryptor`] over KMS `Decrypt`.
#[derive(Debug, Clone)]
pub struct KmsDecryptor {
    client: aws_sdk_kms::Client,
}

impl KmsDecryptor {
    pub fn new(client: aws_sdk_kms::Client) -> Self {
        Self { client }
    }
}

impl Decryptor for KmsDecryptor {
    type Error = AwsError;

    async fn decrypt(
        &self,
        ciphertext: Bytes,
        context: &EncryptionContext,
    ) -> Result<Bytes, Self::Error> {
        let encryption_context = (!context.is_empty()).then(|| context.to_map());

        let output = self
            .client
            .decrypt()
            .ciphertext_blob(Blob::new(ciphertext.to_vec()))
            .set_encryption_context(encryption_context)
            .send()
            .await
            .map_err(|e| {
                AwsError::new(
                    "kms:Decrypt",
                    aws_sdk_kms::error::DisplayErrorContext(&e).to_string(),
                )
            })?;

        let plaintext = output
            .plaintext()
            .ok_or_else(|| AwsError::new("kms:Decrypt", "response carried no plaintext"))?;

        Ok(Bytes::copy_from_slice(plaintext.as_ref()))
    }
}
