//! # Request Router
//!
//! Classifies every intercepted request into exactly one handling strategy
//! and dispatches it. A routed request always resolves: either with a
//! response (network, cache generation, or video store) or with the
//! propagated network error when no fallback exists.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};
use url::Url;

use crate::cache::{CacheKey, CacheStore};
use crate::config::WorkerConfig;
use crate::error::ProxyError;
use crate::fetch::Fetcher;
use crate::http::{ProxyResponse, Request};
use crate::store::VideoStore;

/// Content type declared when synthesizing a response from the video store
const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// The strategy chosen for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Fresh document preferred, cached shell as offline fallback
    NetworkFirst,
    /// Manifest-listed shell assets: cache wins, network fills gaps
    CacheFirst,
    /// Video store only, plain network fall-through, no passive population
    StoreFirst,
    /// Serve stale immediately, refresh in the background
    StaleWhileRevalidate,
}

/// Classification rules resolved once from the worker configuration
#[derive(Debug, Clone)]
pub struct RouterRules {
    manifest: HashSet<String>,
    manifest_urls: Vec<Url>,
    shell_origins: Vec<String>,
    video_suffixes: Vec<String>,
    root_url: Url,
}

impl RouterRules {
    /// Resolve manifest entries and the root document against the
    /// configured base URL
    pub fn from_config(config: &WorkerConfig) -> Result<Self, ProxyError> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| ProxyError::InvalidUrl(format!("{}: {e}", config.base_url)))?;

        let mut manifest_urls = Vec::with_capacity(config.manifest.len());
        for entry in &config.manifest {
            let url = match Url::parse(entry) {
                Ok(url) => url,
                Err(_) => base
                    .join(entry)
                    .map_err(|e| ProxyError::InvalidUrl(format!("{entry}: {e}")))?,
            };
            manifest_urls.push(url);
        }

        let root_url = base
            .join("/")
            .map_err(|e| ProxyError::InvalidUrl(format!("{}: {e}", config.base_url)))?;

        Ok(Self {
            manifest: manifest_urls.iter().map(|u| u.as_str().to_string()).collect(),
            manifest_urls,
            shell_origins: config.shell_origins.clone(),
            video_suffixes: config.video_suffixes.clone(),
            root_url,
        })
    }

    /// Fully resolved manifest, in install order
    pub fn manifest_urls(&self) -> &[Url] {
        &self.manifest_urls
    }

    /// The cached landing page used as the navigation fallback of last resort
    pub fn root_url(&self) -> &Url {
        &self.root_url
    }

    fn is_shell_asset(&self, url: &Url) -> bool {
        if self.manifest.contains(url.as_str()) {
            return true;
        }
        url.host_str()
            .map(|host| self.shell_origins.iter().any(|origin| origin == host))
            .unwrap_or(false)
    }

    fn is_video(&self, url: &Url) -> bool {
        let path = url.path();
        self.video_suffixes.iter().any(|suffix| path.ends_with(suffix))
    }
}

/// Routes intercepted requests across the cache store, the video store
/// and the network. All handles are injected; the router owns no storage.
pub struct RequestRouter {
    fetcher: Arc<dyn Fetcher>,
    cache: Arc<CacheStore>,
    videos: Arc<VideoStore>,
    rules: Arc<RouterRules>,
}

impl RequestRouter {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        cache: Arc<CacheStore>,
        videos: Arc<VideoStore>,
        rules: Arc<RouterRules>,
    ) -> Self {
        Self {
            fetcher,
            cache,
            videos,
            rules,
        }
    }

    /// Pick the strategy for a request. Navigation intent outranks the
    /// manifest, which outranks video detection.
    pub fn classify(&self, request: &Request) -> Strategy {
        if request.navigation {
            Strategy::NetworkFirst
        } else if self.rules.is_shell_asset(&request.url) {
            Strategy::CacheFirst
        } else if self.rules.is_video(&request.url) {
            Strategy::StoreFirst
        } else {
            Strategy::StaleWhileRevalidate
        }
    }

    /// Apply the classified strategy and resolve the request
    pub async fn route(&self, request: &Request) -> Result<ProxyResponse, ProxyError> {
        let strategy = self.classify(request);
        debug!(url = %request.url, strategy = ?strategy, "routing request");

        match strategy {
            Strategy::NetworkFirst => self.network_first(request).await,
            Strategy::CacheFirst => self.cache_first(request).await,
            Strategy::StoreFirst => self.store_first(request).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request).await,
        }
    }

    /// Cache lookup that never fails the request: storage errors degrade
    /// to a miss with a warning
    async fn lookup_quiet(&self, key: &CacheKey) -> Option<ProxyResponse> {
        match self.cache.lookup(key).await {
            Ok(cached) => cached,
            Err(e) => {
                warn!(key = ?key, error = %e, "cache lookup failed, treating as miss");
                None
            }
        }
    }

    async fn network_first(&self, request: &Request) -> Result<ProxyResponse, ProxyError> {
        let key = CacheKey::from_request(request);

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                // store() filters non-cacheable responses itself
                if let Err(e) = self.cache.store(key, &response).await {
                    warn!(url = %request.url, error = %e, "failed to cache navigation response");
                }
                Ok(response)
            }
            Err(network_err) => {
                debug!(url = %request.url, error = %network_err, "navigation fetch failed, falling back to cache");

                if let Some(cached) = self.lookup_quiet(&key).await {
                    return Ok(cached);
                }

                // The specific document was never cached; serve the root
                // document so an offline landing page always exists
                let root_key = CacheKey::new("GET", self.rules.root_url.as_str());
                if let Some(cached) = self.lookup_quiet(&root_key).await {
                    return Ok(cached);
                }

                Err(network_err)
            }
        }
    }

    async fn cache_first(&self, request: &Request) -> Result<ProxyResponse, ProxyError> {
        let key = CacheKey::from_request(request);

        if let Some(cached) = self.lookup_quiet(&key).await {
            return Ok(cached);
        }

        let response = self.fetcher.fetch(request).await?;
        if response.status == 200 && !response.opaque {
            if let Err(e) = self.cache.store(key, &response).await {
                warn!(url = %request.url, error = %e, "failed to populate cache for shell asset");
            }
        }
        Ok(response)
    }

    async fn store_first(&self, request: &Request) -> Result<ProxyResponse, ProxyError> {
        let id = request.url.as_str();

        match self.videos.get(id).await {
            Ok(Some(record)) => {
                debug!(id = %id, bytes = record.blob.len(), "serving video from store");
                Ok(ProxyResponse::synthesized(VIDEO_CONTENT_TYPE, record.blob))
            }
            Ok(None) => {
                // Not synced; plain fetch with no passive population so
                // partial or oversized payloads never enter the store
                debug!(id = %id, "video not in store, fetching from network");
                self.fetcher.fetch(request).await
            }
            // get only fails when the store cannot be opened; read failures
            // on an open store resolve as absent
            Err(e) => Err(ProxyError::StoreOpen(e.to_string())),
        }
    }

    async fn stale_while_revalidate(&self, request: &Request) -> Result<ProxyResponse, ProxyError> {
        let key = CacheKey::from_request(request);

        if let Some(cached) = self.lookup_quiet(&key).await {
            self.spawn_refresh(request.clone());
            return Ok(cached);
        }

        // Nothing cached: the network result is all there is, and a
        // network failure here is a hard failure the caller observes
        let response = self.fetcher.fetch(request).await?;
        if response.status == 200 && !response.opaque {
            if let Err(e) = self.cache.store(key, &response).await {
                warn!(url = %request.url, error = %e, "failed to cache revalidated response");
            }
        }
        Ok(response)
    }

    /// Detached background refresh; its outcome never affects the response
    /// already returned
    fn spawn_refresh(&self, request: Request) {
        let fetcher = Arc::clone(&self.fetcher);
        let cache = Arc::clone(&self.cache);

        tokio::spawn(async move {
            match fetcher.fetch(&request).await {
                Ok(response) if response.status == 200 && !response.opaque => {
                    let key = CacheKey::from_request(&request);
                    if let Err(e) = cache.store(key, &response).await {
                        warn!(url = %request.url, error = %e, "background refresh store failed");
                    }
                }
                Ok(response) => {
                    debug!(url = %request.url, status = response.status, "background refresh response not cacheable");
                }
                Err(e) if e.is_network() => {
                    debug!(url = %request.url, error = %e, "background refresh failed, network unreachable");
                }
                Err(e) => {
                    warn!(url = %request.url, error = %e, "background refresh failed");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StubFetcher;
    use bytes::Bytes;
    use std::time::Duration;
    use tempfile::TempDir;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    }

    struct Fixture {
        router: RequestRouter,
        fetcher: Arc<StubFetcher>,
        cache: Arc<CacheStore>,
        videos: Arc<VideoStore>,
        _dir: TempDir,
    }

    async fn fixture(fetcher: StubFetcher) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let config = WorkerConfig::builder()
            .with_base_url("https://app.example/")
            .with_manifest(["/", "index.html", "app.css"])
            .with_shell_origin("cdn.example.net")
            .build();

        let cache = Arc::new(
            CacheStore::open(dir.path().join("generations"), "v1", 1024 * 1024)
                .await
                .unwrap(),
        );
        let videos = Arc::new(VideoStore::new(dir.path().join("videos")));
        let rules = Arc::new(RouterRules::from_config(&config).unwrap());
        let fetcher = Arc::new(fetcher);
        let router = RequestRouter::new(
            fetcher.clone(),
            cache.clone(),
            videos.clone(),
            rules,
        );

        Fixture {
            router,
            fetcher,
            cache,
            videos,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn classification_follows_priority_order() {
        let fx = fixture(StubFetcher::new()).await;

        // Navigation intent outranks everything, even a video URL
        let nav = Request::navigation("https://app.example/clip.mp4").unwrap();
        assert_eq!(fx.router.classify(&nav), Strategy::NetworkFirst);

        let manifest = Request::get("https://app.example/index.html").unwrap();
        assert_eq!(fx.router.classify(&manifest), Strategy::CacheFirst);

        let third_party = Request::get("https://cdn.example.net/lib.js").unwrap();
        assert_eq!(fx.router.classify(&third_party), Strategy::CacheFirst);

        let video = Request::get("https://media.example/clip.mp4").unwrap();
        assert_eq!(fx.router.classify(&video), Strategy::StoreFirst);

        let other = Request::get("https://app.example/api/data").unwrap();
        assert_eq!(fx.router.classify(&other), Strategy::StaleWhileRevalidate);
    }

    #[tokio::test]
    async fn navigation_prefers_network_and_caches_the_document() {
        let fx = fixture(StubFetcher::new().with_body("https://app.example/page", b"fresh document")).await;

        let request = Request::navigation("https://app.example/page").unwrap();
        let response = fx.router.route(&request).await.unwrap();
        assert_eq!(response.body, Bytes::from_static(b"fresh document"));

        // A copy landed in the current generation
        let cached = fx
            .cache
            .lookup(&CacheKey::from_request(&request))
            .await
            .unwrap()
            .expect("navigation response cached");
        assert_eq!(cached.body, Bytes::from_static(b"fresh document"));
    }

    #[tokio::test]
    async fn offline_navigation_serves_the_cached_document() {
        let fx = fixture(StubFetcher::new()).await;
        let request = Request::navigation("https://app.example/page").unwrap();

        let cached = ProxyResponse::new(200, vec![], Bytes::from_static(b"cached document"));
        fx.cache
            .store(CacheKey::from_request(&request), &cached)
            .await
            .unwrap();

        let response = fx.router.route(&request).await.unwrap();
        assert_eq!(response.body, Bytes::from_static(b"cached document"));
    }

    #[tokio::test]
    async fn offline_navigation_falls_back_to_the_root_document() {
        let fx = fixture(StubFetcher::new()).await;

        let root = ProxyResponse::new(200, vec![], Bytes::from_static(b"landing page"));
        fx.cache
            .store(CacheKey::new("GET", "https://app.example/"), &root)
            .await
            .unwrap();

        // This specific URL was never cached
        let request = Request::navigation("https://app.example/deep/link").unwrap();
        let response = fx.router.route(&request).await.unwrap();
        assert_eq!(response.body, Bytes::from_static(b"landing page"));
    }

    #[tokio::test]
    async fn offline_navigation_with_no_fallback_propagates_the_error() {
        let fx = fixture(StubFetcher::new()).await;
        let request = Request::navigation("https://app.example/page").unwrap();

        let err = fx.router.route(&request).await.unwrap_err();
        assert!(matches!(err, ProxyError::Io(_)));
    }

    #[tokio::test]
    async fn cache_first_serves_cached_asset_without_touching_the_network() {
        let fx = fixture(StubFetcher::new()).await;
        let request = Request::get("https://app.example/app.css").unwrap();

        let cached = ProxyResponse::new(200, vec![], Bytes::from_static(b"body {}"));
        fx.cache
            .store(CacheKey::from_request(&request), &cached)
            .await
            .unwrap();

        let response = fx.router.route(&request).await.unwrap();
        assert_eq!(response.body, Bytes::from_static(b"body {}"));
        assert!(fx.fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn cache_first_miss_populates_the_cache_opportunistically() {
        let fx = fixture(StubFetcher::new().with_body("https://app.example/app.css", b"h1 {}")).await;
        let request = Request::get("https://app.example/app.css").unwrap();

        let response = fx.router.route(&request).await.unwrap();
        assert_eq!(response.body, Bytes::from_static(b"h1 {}"));

        // Now served from cache even with the network gone
        fx.fetcher.remove_response("https://app.example/app.css");
        let response = fx.router.route(&request).await.unwrap();
        assert_eq!(response.body, Bytes::from_static(b"h1 {}"));
        assert_eq!(fx.fetcher.calls().len(), 1);
    }

    #[tokio::test]
    async fn cache_first_does_not_store_error_responses() {
        let fx = fixture(StubFetcher::new().with_response(
            "https://app.example/app.css",
            ProxyResponse::new(404, vec![], Bytes::from_static(b"not found")),
        ))
        .await;
        let request = Request::get("https://app.example/app.css").unwrap();

        let response = fx.router.route(&request).await.unwrap();
        assert_eq!(response.status, 404);
        assert!(
            fx.cache
                .lookup(&CacheKey::from_request(&request))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn unsynced_video_falls_through_to_the_network() {
        let fx = fixture(StubFetcher::new().with_body("https://media.example/clip.mp4", b"mp4 from network")).await;
        let request = Request::get("https://media.example/clip.mp4").unwrap();

        let response = fx.router.route(&request).await.unwrap();
        assert_eq!(response.body, Bytes::from_static(b"mp4 from network"));
        assert_eq!(fx.fetcher.calls(), vec!["https://media.example/clip.mp4"]);

        // No passive population of the video store
        assert!(
            fx.videos
                .get("https://media.example/clip.mp4")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn synced_video_is_served_from_the_store() {
        let fx = fixture(StubFetcher::new()).await;
        let url = "https://media.example/clip.mp4";

        fx.videos
            .put(&crate::store::VideoRecord {
                id: url.to_string(),
                title: "Clip".to_string(),
                blob: Bytes::from_static(b"stored mp4 bytes"),
            })
            .await
            .unwrap();

        let request = Request::get(url).unwrap();
        let response = fx.router.route(&request).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.content_type(), Some("video/mp4"));
        assert_eq!(response.body, Bytes::from_static(b"stored mp4 bytes"));
        assert!(fx.fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn stale_while_revalidate_serves_stale_then_updates() {
        init_tracing();
        let fx = fixture(StubFetcher::new().with_body("https://app.example/api/data", b"first")).await;
        let request = Request::get("https://app.example/api/data").unwrap();
        let key = CacheKey::from_request(&request);

        // First request: nothing cached, network result returned and stored
        let response = fx.router.route(&request).await.unwrap();
        assert_eq!(response.body, Bytes::from_static(b"first"));

        // The origin now serves different bytes
        fx.fetcher.set_response(
            "https://app.example/api/data",
            ProxyResponse::new(200, vec![], Bytes::from_static(b"second")),
        );

        // Second request returns the stale copy immediately
        let response = fx.router.route(&request).await.unwrap();
        assert_eq!(response.body, Bytes::from_static(b"first"));

        // The detached refresh lands eventually
        let mut refreshed = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if let Some(cached) = fx.cache.lookup(&key).await.unwrap() {
                if cached.body == Bytes::from_static(b"second") {
                    refreshed = true;
                    break;
                }
            }
        }
        assert!(refreshed, "background refresh never updated the cache");

        let response = fx.router.route(&request).await.unwrap();
        assert_eq!(response.body, Bytes::from_static(b"second"));
    }

    #[tokio::test]
    async fn stale_while_revalidate_with_no_cache_and_no_network_is_a_hard_failure() {
        let fx = fixture(StubFetcher::new()).await;
        let request = Request::get("https://app.example/api/data").unwrap();

        let err = fx.router.route(&request).await.unwrap_err();
        assert!(matches!(err, ProxyError::Io(_)));
    }
}
