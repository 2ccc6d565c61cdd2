//! # Cache Types
//!
//! Common types used across the versioned cache store.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::http::{ProxyResponse, Request};

/// Key identifying a cached request→response mapping
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// HTTP method, uppercase
    pub method: String,
    /// Absolute request URL
    pub url: String,
}

impl CacheKey {
    /// Create a new cache key
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into().to_uppercase(),
            url: url.into(),
        }
    }

    /// Derive the key for an intercepted request
    pub fn from_request(request: &Request) -> Self {
        Self::new(request.method.clone(), request.url.as_str())
    }

    /// Convert to a filename-safe string
    pub fn to_filename(&self) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(&self.method);
        hasher.update(" ");
        hasher.update(&self.url);

        let hash = hasher.finalize();
        format!("{hash:x}")
    }
}

/// Metadata persisted alongside a cached response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// HTTP status of the stored response
    pub status: u16,
    /// Header snapshot taken at store time
    pub headers: Vec<(String, String)>,
    /// Content type, if the response declared one
    pub content_type: Option<String>,
    /// Size of the stored body in bytes
    pub size: u64,
    /// When the entry was stored (seconds since the Unix epoch)
    pub cached_at: u64,
}

impl EntryMetadata {
    /// Snapshot the metadata of a response about to be cached
    pub fn from_response(response: &ProxyResponse) -> Self {
        Self {
            status: response.status,
            headers: response.headers.clone(),
            content_type: response.content_type().map(|s| s.to_string()),
            size: response.body.len() as u64,
            cached_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }

    /// Rebuild a servable response from this metadata and a stored body.
    /// Only cacheable (non-opaque) responses are ever stored, so the
    /// reconstruction is never opaque.
    pub fn to_response(&self, body: Bytes) -> ProxyResponse {
        ProxyResponse::new(self.status, self.headers.clone(), body)
    }
}

/// Result of a cache operation
pub type CacheResult<T> = std::result::Result<T, std::io::Error>;

/// A type representing the result of a cache lookup operation
pub type CacheLookupResult = CacheResult<Option<(Bytes, EntryMetadata)>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_is_stable_and_distinct() {
        let a = CacheKey::new("GET", "https://app.example/index.html");
        let b = CacheKey::new("GET", "https://app.example/index.html");
        let c = CacheKey::new("HEAD", "https://app.example/index.html");

        assert_eq!(a.to_filename(), b.to_filename());
        assert_ne!(a.to_filename(), c.to_filename());
        assert_eq!(a.to_filename().len(), 64);
    }

    #[test]
    fn metadata_round_trips_a_response() {
        let response = ProxyResponse::new(
            200,
            vec![("Content-Type".to_string(), "text/html".to_string())],
            Bytes::from_static(b"<html></html>"),
        );
        let metadata = EntryMetadata::from_response(&response);
        assert_eq!(metadata.status, 200);
        assert_eq!(metadata.content_type.as_deref(), Some("text/html"));
        assert_eq!(metadata.size, 13);

        let rebuilt = metadata.to_response(response.body.clone());
        assert_eq!(rebuilt.status, response.status);
        assert_eq!(rebuilt.headers, response.headers);
        assert_eq!(rebuilt.body, response.body);
        assert!(!rebuilt.opaque);
    }
}
