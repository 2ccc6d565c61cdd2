//! # Request and Response Types
//!
//! This module defines the request/response shapes that flow between the
//! router, the fetcher and the cache store. Responses are fully buffered:
//! the engine deals in shell assets and video blobs, not live streams.

use bytes::Bytes;
use url::Url;

use crate::error::ProxyError;

/// An intercepted request, reduced to what classification and caching need.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method, uppercase
    pub method: String,
    /// Absolute request URL
    pub url: Url,
    /// Whether the request carries navigation intent (the page's own document)
    pub navigation: bool,
}

impl Request {
    /// Create a request with an explicit method
    pub fn new(method: impl Into<String>, url: &str, navigation: bool) -> Result<Self, ProxyError> {
        let url = Url::parse(url).map_err(|e| ProxyError::InvalidUrl(format!("{url}: {e}")))?;
        Ok(Self {
            method: method.into().to_uppercase(),
            url,
            navigation,
        })
    }

    /// Create a plain GET request
    pub fn get(url: &str) -> Result<Self, ProxyError> {
        Self::new("GET", url, false)
    }

    /// Create a navigation (document) request
    pub fn navigation(url: &str) -> Result<Self, ProxyError> {
        Self::new("GET", url, true)
    }
}

/// A buffered response: status and header snapshot plus the full body.
///
/// The `opaque` marker models cross-origin responses whose status and body
/// the embedding runtime refuses to expose; such responses are served but
/// never cached. The built-in HTTP fetcher never produces opaque responses.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub opaque: bool,
}

impl ProxyResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
            opaque: false,
        }
    }

    /// A successful response synthesized locally (e.g. from the video store).
    pub fn synthesized(content_type: &str, body: Bytes) -> Self {
        Self::new(
            200,
            vec![("Content-Type".to_string(), content_type.to_string())],
            body,
        )
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether this response may be written into a cache generation.
    /// Opaque responses are rejected so error pages cannot silently
    /// overwrite good entries.
    pub fn is_cacheable(&self) -> bool {
        self.is_success() && !self.opaque
    }

    /// First value of the named header, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }
}
