//! # Versioned Cache Store
//!
//! One named generation of request→response mappings, with a memory front
//! over a file-backed authority. Exactly one generation is current at any
//! time; `activate` purges every other generation left on disk.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs;
use tokio::io;
use tracing::{debug, info, warn};

use crate::cache::providers::{CacheProvider, FileCache, MemoryCache};
use crate::cache::types::{CacheKey, CacheResult, EntryMetadata};
use crate::error::ProxyError;
use crate::fetch::Fetcher;
use crate::http::{ProxyResponse, Request};
use url::Url;

/// The versioned cache store. Lookups hit the memory front first and
/// promote file hits; writes land in both tiers with the file tier
/// authoritative.
#[derive(Clone)]
pub struct CacheStore {
    version: String,
    root: PathBuf,
    memory: Arc<MemoryCache>,
    file: Arc<FileCache>,
}

impl CacheStore {
    /// Open (or create) the generation named by `version` under `root`.
    /// Idempotent; other generations under the same root are untouched
    /// until [`CacheStore::activate`] runs.
    pub async fn open(root: PathBuf, version: &str, memory_capacity: u64) -> io::Result<Self> {
        let file = FileCache::new(root.join(version));
        file.ensure_initialized().await?;

        Ok(Self {
            version: version.to_string(),
            root,
            memory: Arc::new(MemoryCache::new(memory_capacity)),
            file: Arc::new(file),
        })
    }

    /// Version string naming this generation
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Populate the generation from the install-time manifest.
    ///
    /// All-or-nothing: every URL is fetched before anything is written,
    /// and a failed write clears whatever part of the generation was
    /// already stored. Partial shells are not supported.
    pub async fn install(&self, manifest: &[Url], fetcher: &dyn Fetcher) -> Result<(), ProxyError> {
        info!(version = %self.version, assets = manifest.len(), "installing cache generation");

        let mut fetched = Vec::with_capacity(manifest.len());
        for url in manifest {
            let request = Request::new("GET", url.as_str(), false)?;
            let response = match fetcher.fetch(&request).await {
                Ok(response) if response.is_success() => response,
                Ok(response) => {
                    return Err(ProxyError::ManifestFetch {
                        url: url.to_string(),
                        reason: format!("status {}", response.status),
                    });
                }
                Err(e) => {
                    return Err(ProxyError::ManifestFetch {
                        url: url.to_string(),
                        reason: e.to_string(),
                    });
                }
            };
            fetched.push((CacheKey::new("GET", url.as_str()), response));
        }

        for (key, response) in fetched {
            let metadata = EntryMetadata::from_response(&response);
            if let Err(e) = self
                .file
                .put(key.clone(), response.body.clone(), metadata.clone())
                .await
            {
                warn!(version = %self.version, error = %e, "install write failed, clearing generation");
                let _ = self.file.clear().await;
                let _ = self.memory.clear().await;
                return Err(ProxyError::Io(e));
            }
            let _ = self.memory.put(key, response.body, metadata).await;
        }

        info!(version = %self.version, "cache generation installed");
        Ok(())
    }

    /// Delete every generation under the root whose name differs from the
    /// current version. Individual deletion failures are logged and
    /// skipped so activation never aborts request handling.
    pub async fn activate(&self) -> CacheResult<Vec<String>> {
        let mut purged = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name == self.version {
                continue;
            }
            match fs::remove_dir_all(entry.path()).await {
                Ok(()) => {
                    info!(generation = %name, "deleted stale cache generation");
                    purged.push(name);
                }
                Err(e) => {
                    warn!(generation = %name, error = %e, "failed to delete stale cache generation");
                }
            }
        }

        Ok(purged)
    }

    /// Names of all generations currently on disk
    pub async fn list_generations(&self) -> CacheResult<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Pure read: memory front first, then the file authority, promoting
    /// file hits into memory for the next lookup
    pub async fn lookup(&self, key: &CacheKey) -> CacheResult<Option<ProxyResponse>> {
        if let Some((data, metadata)) = self.memory.get(key).await? {
            return Ok(Some(metadata.to_response(data)));
        }

        if let Some((data, metadata)) = self.file.get(key).await? {
            let _ = self
                .memory
                .put(key.clone(), data.clone(), metadata.clone())
                .await;
            return Ok(Some(metadata.to_response(data)));
        }

        Ok(None)
    }

    /// Check if a key exists in either tier
    pub async fn contains(&self, key: &CacheKey) -> CacheResult<bool> {
        if self.memory.contains(key).await? {
            return Ok(true);
        }
        self.file.contains(key).await
    }

    /// Overwrite the entry for `key`; last write wins.
    ///
    /// Non-success and opaque responses are rejected silently (returning
    /// `false`) so error pages never overwrite good entries.
    pub async fn store(&self, key: CacheKey, response: &ProxyResponse) -> CacheResult<bool> {
        if !response.is_cacheable() {
            debug!(
                key = ?key,
                status = response.status,
                opaque = response.opaque,
                "response not cacheable, skipping store"
            );
            return Ok(false);
        }

        let metadata = EntryMetadata::from_response(response);
        let _ = self
            .memory
            .put(key.clone(), response.body.clone(), metadata.clone())
            .await;
        self.file.put(key, response.body.clone(), metadata).await?;
        Ok(true)
    }
}
