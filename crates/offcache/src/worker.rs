//! # Worker Facade
//!
//! One composed object exposing the engine's whole surface to the runtime
//! adapter: `install`, `activate`, `route` and `on_message`. The storage
//! handles are constructed once here and passed by reference into the
//! router and sync handler; there are no ambient singletons, and nothing
//! registers itself on an event bus.

use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::CacheStore;
use crate::config::WorkerConfig;
use crate::error::ProxyError;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::http::{ProxyResponse, Request};
use crate::router::{RequestRouter, RouterRules};
use crate::store::VideoStore;
use crate::sync::{PageMessage, SyncHandler, SyncOutcome};

/// The engine behind one worker instance.
pub struct OfflineWorker {
    fetcher: Arc<dyn Fetcher>,
    cache: Arc<CacheStore>,
    videos: Arc<VideoStore>,
    rules: Arc<RouterRules>,
    router: RequestRouter,
    sync: SyncHandler,
}

impl OfflineWorker {
    /// Build a worker from configuration and an injected transport
    pub async fn new(config: &WorkerConfig, fetcher: Arc<dyn Fetcher>) -> Result<Self, ProxyError> {
        let rules = Arc::new(RouterRules::from_config(config)?);

        let cache = Arc::new(
            CacheStore::open(
                config.cache_dir.clone(),
                &config.version,
                config.memory_cache_size,
            )
            .await
            .map_err(|e| ProxyError::StoreOpen(e.to_string()))?,
        );
        let videos = Arc::new(VideoStore::new(config.video_dir.clone()));

        let router = RequestRouter::new(
            Arc::clone(&fetcher),
            Arc::clone(&cache),
            Arc::clone(&videos),
            Arc::clone(&rules),
        );
        let sync = SyncHandler::new(Arc::clone(&fetcher), Arc::clone(&videos));

        Ok(Self {
            fetcher,
            cache,
            videos,
            rules,
            router,
            sync,
        })
    }

    /// Build a worker with the default reqwest-backed transport
    pub async fn with_http_client(config: &WorkerConfig) -> Result<Self, ProxyError> {
        let fetcher = Arc::new(HttpFetcher::new(&config.fetch)?);
        Self::new(config, fetcher).await
    }

    /// Install-time hook: precache the whole manifest into the current
    /// generation. All-or-nothing.
    pub async fn install(&self) -> Result<(), ProxyError> {
        self.cache
            .install(self.rules.manifest_urls(), self.fetcher.as_ref())
            .await
    }

    /// Activation hook: purge every generation other than the current one.
    /// Returns the names of the purged generations.
    pub async fn activate(&self) -> Result<Vec<String>, ProxyError> {
        let purged = self.cache.activate().await?;
        info!(
            version = %self.cache.version(),
            purged = purged.len(),
            "worker activated"
        );
        Ok(purged)
    }

    /// Resolve one intercepted request
    pub async fn route(&self, request: &Request) -> Result<ProxyResponse, ProxyError> {
        self.router.route(request).await
    }

    /// Handle a typed page message; always produces exactly one outcome
    pub async fn on_message(&self, message: PageMessage) -> SyncOutcome {
        match message {
            PageMessage::Sync { video } => self.sync.handle(&video).await,
        }
    }

    /// Handle a raw page message. Undecodable payloads and unknown actions
    /// are ignored; the runtime adapter delivers any returned outcome to
    /// the originating page only.
    pub async fn on_message_raw(&self, raw: &str) -> Option<SyncOutcome> {
        match serde_json::from_str::<PageMessage>(raw) {
            Ok(message) => Some(self.on_message(message).await),
            Err(e) => {
                debug!(error = %e, "ignoring unrecognized page message");
                None
            }
        }
    }

    /// The versioned cache store handle
    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    /// The video store handle
    pub fn videos(&self) -> &Arc<VideoStore> {
        &self.videos
    }

    /// The request router
    pub fn router(&self) -> &RequestRouter {
        &self.router
    }
}
