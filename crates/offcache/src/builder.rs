//! # Builder for WorkerConfig
//!
//! This module provides a builder pattern implementation for creating and
//! customizing WorkerConfig instances with a fluent API.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use offcache_engine::WorkerConfig;
//!
//! let config = WorkerConfig::builder()
//!     .with_version("shell-v2")
//!     .with_base_url("https://app.example/")
//!     .with_manifest(["/", "index.html", "manifest.json"])
//!     .with_shell_origin("cdn.tailwindcss.com")
//!     .with_timeout(Duration::from_secs(60))
//!     .build();
//! ```

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::HeaderValue;

use crate::config::WorkerConfig;

/// Builder for creating WorkerConfig instances with a fluent API
#[derive(Debug, Clone, Default)]
pub struct WorkerConfigBuilder {
    /// Internal config being built
    config: WorkerConfig,
}

impl WorkerConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: WorkerConfig::default(),
        }
    }

    /// Set the version string naming the current cache generation
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.config.version = version.into();
        self
    }

    /// Set the base URL relative manifest entries resolve against
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Replace the install-time manifest
    pub fn with_manifest<I, S>(mut self, manifest: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.manifest = manifest.into_iter().map(Into::into).collect();
        self
    }

    /// Append a single manifest entry
    pub fn with_manifest_entry(mut self, entry: impl Into<String>) -> Self {
        self.config.manifest.push(entry.into());
        self
    }

    /// Whitelist a third-party host whose assets are treated as shell
    pub fn with_shell_origin(mut self, host: impl Into<String>) -> Self {
        self.config.shell_origins.push(host.into());
        self
    }

    /// Add a path suffix identifying binary video assets
    pub fn with_video_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.video_suffixes.push(suffix.into());
        self
    }

    /// Set the root directory for cache generations
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = dir.into();
        self
    }

    /// Set the directory backing the persistent video store
    pub fn with_video_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.video_dir = dir.into();
        self
    }

    /// Set the capacity of the in-memory cache front, in bytes
    pub fn with_memory_cache_size(mut self, bytes: u64) -> Self {
        self.config.memory_cache_size = bytes;
        self
    }

    /// Set the overall timeout for an entire HTTP request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch.timeout = timeout;
        self
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch.connect_timeout = timeout;
        self
    }

    /// Set whether to follow redirects
    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.config.fetch.follow_redirects = follow;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.fetch.user_agent = user_agent.into();
        self
    }

    /// Add a custom HTTP header applied to every outgoing request
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.as_ref().parse::<reqwest::header::HeaderName>(),
            HeaderValue::from_str(value.as_ref()),
        ) {
            self.config.fetch.headers.insert(name, value);
        }
        self
    }

    /// Build the final WorkerConfig
    pub fn build(self) -> WorkerConfig {
        self.config
    }
}
