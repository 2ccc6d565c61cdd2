use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

const DEFAULT_USER_AGENT: &str = concat!("offcache-engine/", env!("CARGO_PKG_VERSION"));

/// Configurable options for the HTTP fetch side of the engine
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Overall timeout for an entire HTTP request; zero disables it
    pub timeout: Duration,

    /// Connection timeout (time to establish the initial connection)
    pub connect_timeout: Duration,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    /// User agent string
    pub user_agent: String,

    /// Custom HTTP headers applied to every request
    pub headers: HeaderMap,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: FetchConfig::default_headers(),
        }
    }
}

impl FetchConfig {
    pub fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT_ENCODING,
            HeaderValue::from_static("gzip, deflate"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("*/*"),
        );
        headers
    }
}

/// Configuration for the whole worker: cache generation naming, the
/// install-time manifest, classification rules and storage locations.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Version string naming the current cache generation. Changing it is
    /// the only supported way to force full shell invalidation.
    pub version: String,

    /// Base URL relative manifest entries are resolved against
    pub base_url: String,

    /// Install-time manifest of shell assets; relative entries allowed
    pub manifest: Vec<String>,

    /// Whitelisted third-party hosts whose assets are treated as shell
    pub shell_origins: Vec<String>,

    /// Path suffixes identifying binary video assets
    pub video_suffixes: Vec<String>,

    /// Root directory holding one subdirectory per cache generation
    pub cache_dir: PathBuf,

    /// Directory backing the persistent video store
    pub video_dir: PathBuf,

    /// Capacity of the in-memory cache front, in bytes. Zero effectively
    /// disables the memory tier; lookups then always hit the file tier.
    pub memory_cache_size: u64,

    /// HTTP fetch settings
    pub fetch: FetchConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let temp = std::env::temp_dir();
        Self {
            version: "v1".to_string(),
            base_url: "http://localhost/".to_string(),
            manifest: Vec::new(),
            shell_origins: Vec::new(),
            video_suffixes: vec![".mp4".to_string()],
            cache_dir: temp.join("offcache").join("generations"),
            video_dir: temp.join("offcache").join("videos"),
            memory_cache_size: 30 * 1024 * 1024,
            fetch: FetchConfig::default(),
        }
    }
}

impl WorkerConfig {
    pub fn builder() -> crate::builder::WorkerConfigBuilder {
        crate::builder::WorkerConfigBuilder::new()
    }
}
