pub mod asset_resolver;

use sha2::{Digest, Sha256};

/// Source of asset bodies. The reconciliation pass only needs whole-file
/// bytes, so tests can swap the HTTP implementation for an in-memory one.
#[async_trait::async_trait]
pub trait AssetFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("failed to GET '{url}': {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("'{url}' returned HTTP {status}")]
    Status { url: String, status: reqwest::StatusCode },
}

/// Lowercase hex SHA-256 of a complete body.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
