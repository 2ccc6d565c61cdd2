//! # Memory Cache Provider
//!
//! In-memory front for the current cache generation, backed by Moka with
//! size-weighted eviction. Entries here are a read accelerator only; the
//! file provider remains the authority.

use bytes::Bytes;
use moka::future::Cache as MokaCache;
use tracing::{debug, warn};

use crate::cache::providers::CacheProvider;
use crate::cache::types::{CacheKey, CacheLookupResult, CacheResult, EntryMetadata};

/// Entry in the memory cache
#[derive(Clone)]
struct CacheEntry {
    /// Cached data bytes
    data: Bytes,
    /// Metadata for the cached content
    metadata: EntryMetadata,
}

/// Memory cache provider implementation using Moka
#[derive(Clone)]
pub struct MemoryCache {
    /// Moka cache for storing entries
    cache: MokaCache<CacheKey, CacheEntry>,
    /// Maximum size for this cache in bytes
    max_size: u64,
}

impl MemoryCache {
    /// Create a new memory cache with the specified size limit. A zero
    /// limit is clamped to one byte, which admits nothing but keeps the
    /// tier safe to construct from arbitrary configuration.
    pub fn new(max_size_bytes: u64) -> Self {
        let max_size_bytes = max_size_bytes.max(1);

        // Size based eviction
        let cache = MokaCache::builder()
            .weigher(|_k, v: &CacheEntry| v.data.len().try_into().unwrap_or(u32::MAX))
            .max_capacity(max_size_bytes)
            .build();

        debug!(max_size = max_size_bytes, "Memory cache created");

        Self {
            cache,
            max_size: max_size_bytes,
        }
    }

    #[cfg(test)]
    pub(crate) async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

#[async_trait::async_trait]
impl CacheProvider for MemoryCache {
    async fn contains(&self, key: &CacheKey) -> CacheResult<bool> {
        Ok(self.cache.contains_key(key))
    }

    async fn get(&self, key: &CacheKey) -> CacheLookupResult {
        if let Some(entry) = self.cache.get(key).await {
            return Ok(Some((entry.data.clone(), entry.metadata.clone())));
        }
        Ok(None)
    }

    async fn put(&self, key: CacheKey, data: Bytes, metadata: EntryMetadata) -> CacheResult<()> {
        // A single entry larger than the whole cache can never be admitted
        if metadata.size > self.max_size {
            warn!(
                key = ?key,
                size = metadata.size,
                max_size = self.max_size,
                "Entry too large for memory cache, skipping"
            );
            return Ok(());
        }

        self.cache.insert(key, CacheEntry { data, metadata }).await;
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> CacheResult<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn clear(&self) -> CacheResult<()> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        Ok(())
    }
}
