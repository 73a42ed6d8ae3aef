use std::time::Duration;

use serde_json::error::Category;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Why credentials could not be resolved.
///
/// Messages name the failing stage only; they never include the blob or its
/// plaintext.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("failed to fetch encrypted credentials from {location}: {source}")]
    Fetch {
        location: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to decrypt credentials: {0}")]
    Decrypt(#[source] BoxError),

    /// Only the position is kept: parser messages quote the offending value.
    #[error("decrypted credentials are malformed: {kind} error at line {line} column {column}")]
    Malformed {
        kind: &'static str,
        line: usize,
        column: usize,
    },

    #[error("{stage} timed out after {timeout:?}")]
    Timeout { stage: &'static str, timeout: Duration },
}

impl CredentialError {
    pub(crate) fn malformed(e: &serde_json::Error) -> Self {
        let kind = match e.classify() {
            Category::Io => "io",
            Category::Syntax => "syntax",
            Category::Data => "data",
            Category::Eof => "eof",
        };
        Self::Malformed {
            kind,
            line: e.line(),
            column: e.column(),
        }
    }
}
