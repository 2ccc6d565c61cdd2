// Custom error type for proxy and sync operations
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned status code {0}")]
    Status(u16),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("manifest fetch failed for {url}: {reason}")]
    ManifestFetch { url: String, reason: String },

    #[error("failed to open backing store: {0}")]
    StoreOpen(String),

    #[error("failed to write record to store: {0}")]
    StoreWrite(String),
}

impl ProxyError {
    /// Whether this error originates from the network rather than local storage.
    pub fn is_network(&self) -> bool {
        matches!(self, ProxyError::Http(_) | ProxyError::Status(_))
    }
}
