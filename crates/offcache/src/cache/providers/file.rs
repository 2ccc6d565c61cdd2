//! # File Cache Provider
//!
//! File-backed persistent provider for one cache generation. Each entry is
//! a data file plus a `.meta` JSON sidecar; writes go to temporary files
//! first and are renamed into place so readers never observe a partially
//! written entry.

use std::path::PathBuf;

use bytes::Bytes;
use tokio::fs;
use tokio::io;
use tracing::{debug, warn};

use crate::cache::types::{CacheKey, CacheLookupResult, CacheResult, EntryMetadata};

use super::CacheProvider;

#[derive(Debug, Clone)]
pub struct FileCache {
    generation_dir: PathBuf,
    init: std::sync::Arc<InitGate>,
}

/// One-shot initialization gate: `claimed` elects a single initializer,
/// `done` flips only once the directory actually exists.
#[derive(Debug, Default)]
pub(crate) struct InitGate {
    claimed: std::sync::atomic::AtomicBool,
    done: std::sync::atomic::AtomicBool,
}

impl InitGate {
    pub(crate) async fn ensure(&self, dir: &std::path::Path) -> io::Result<()> {
        use std::sync::atomic::Ordering;

        if self.done.load(Ordering::Acquire) {
            return Ok(());
        }

        if self
            .claimed
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            // We won the race, do the creation
            if let Err(e) = fs::create_dir_all(dir).await {
                self.claimed.store(false, Ordering::Release);
                return Err(e);
            }
            self.done.store(true, Ordering::Release);
        } else {
            // Another task is initializing, wait for it to complete
            while !self.done.load(Ordering::Acquire) {
                if !self.claimed.load(Ordering::Acquire) {
                    // Initializer failed and gave up its claim; report the
                    // directory as unavailable for this call
                    return Err(io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("initialization of {} failed", dir.display()),
                    ));
                }
                tokio::task::yield_now().await;
            }
        }

        Ok(())
    }
}

impl FileCache {
    /// Create a provider rooted at the given generation directory
    pub fn new(generation_dir: PathBuf) -> Self {
        Self {
            generation_dir,
            init: std::sync::Arc::new(InitGate::default()),
        }
    }

    /// Initialize the generation directory. Idempotent; concurrent callers
    /// are serialized so the directory is created exactly once.
    pub(crate) async fn ensure_initialized(&self) -> io::Result<()> {
        self.init.ensure(&self.generation_dir).await
    }

    fn data_path(&self, key: &CacheKey) -> PathBuf {
        self.generation_dir.join(key.to_filename())
    }

    fn meta_path(&self, key: &CacheKey) -> PathBuf {
        let mut path = self.data_path(key);
        path.set_extension("meta");
        path
    }
}

#[async_trait::async_trait]
impl CacheProvider for FileCache {
    async fn contains(&self, key: &CacheKey) -> CacheResult<bool> {
        self.ensure_initialized().await?;

        let data_exists = fs::try_exists(&self.data_path(key)).await?;
        let meta_exists = fs::try_exists(&self.meta_path(key)).await?;

        Ok(data_exists && meta_exists)
    }

    async fn get(&self, key: &CacheKey) -> CacheLookupResult {
        self.ensure_initialized().await?;

        let data_path = self.data_path(key);
        let meta_path = self.meta_path(key);

        if !fs::try_exists(&data_path).await? || !fs::try_exists(&meta_path).await? {
            return Ok(None);
        }

        let metadata_bytes = match fs::read(&meta_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = ?meta_path, error = %e, "Failed to read cache metadata file");
                return Ok(None);
            }
        };

        let metadata: EntryMetadata = match serde_json::from_slice(&metadata_bytes) {
            Ok(m) => m,
            Err(e) => {
                warn!(path = ?meta_path, error = %e, "Failed to parse cache metadata");

                // Drop the corrupt entry without blocking this lookup
                let data_path = data_path.clone();
                let meta_path = meta_path.clone();
                tokio::spawn(async move {
                    let _ = fs::remove_file(&data_path).await;
                    let _ = fs::remove_file(&meta_path).await;
                });

                return Ok(None);
            }
        };

        let data = match fs::read(&data_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = ?data_path, error = %e, "Failed to read cache data file");
                return Ok(None);
            }
        };

        Ok(Some((Bytes::from(data), metadata)))
    }

    async fn put(&self, key: CacheKey, data: Bytes, metadata: EntryMetadata) -> CacheResult<()> {
        self.ensure_initialized().await?;

        let data_path = self.data_path(&key);
        let meta_path = self.meta_path(&key);

        let metadata_json = serde_json::to_vec(&metadata).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to serialize metadata: {e}"),
            )
        })?;

        // Write to temporary files, then rename into place
        let temp_data_path = data_path.with_extension("tmp");
        let temp_meta_path = meta_path.with_extension("mtmp");

        if let Err(e) = fs::write(&temp_data_path, &data).await {
            warn!(path = ?temp_data_path, error = %e, "Failed to write cache data file");
            return Err(e);
        }

        if let Err(e) = fs::write(&temp_meta_path, &metadata_json).await {
            warn!(path = ?temp_meta_path, error = %e, "Failed to write cache metadata file");
            let _ = fs::remove_file(&temp_data_path).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_data_path, &data_path).await {
            warn!(from = ?temp_data_path, to = ?data_path, error = %e, "Failed to rename temporary data file");
            let _ = fs::remove_file(&temp_data_path).await;
            let _ = fs::remove_file(&temp_meta_path).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_meta_path, &meta_path).await {
            warn!(from = ?temp_meta_path, to = ?meta_path, error = %e, "Failed to rename temporary metadata file");
            // The data file renamed but the metadata did not; remove the
            // data file so no half-entry is visible
            let _ = fs::remove_file(&data_path).await;
            let _ = fs::remove_file(&temp_meta_path).await;
            return Err(e);
        }

        debug!(key = ?key, "Cached entry to file");
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> CacheResult<()> {
        self.ensure_initialized().await?;

        let data_path = self.data_path(key);
        let meta_path = self.meta_path(key);

        let data_result = fs::remove_file(&data_path).await;
        let meta_result = fs::remove_file(&meta_path).await;

        match (data_result, meta_result) {
            (Err(e), _) if e.kind() != io::ErrorKind::NotFound => {
                warn!(path = ?data_path, error = %e, "Failed to remove cache data file");
                Err(e)
            }
            (_, Err(e)) if e.kind() != io::ErrorKind::NotFound => {
                warn!(path = ?meta_path, error = %e, "Failed to remove cache metadata file");
                Err(e)
            }
            _ => Ok(()),
        }
    }

    async fn clear(&self) -> CacheResult<()> {
        self.ensure_initialized().await?;

        let mut entries = fs::read_dir(&self.generation_dir).await?;
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if let Err(e) = fs::remove_file(&path).await {
                warn!(path = ?path, error = %e, "Failed to remove cache file");
            } else {
                removed += 1;
            }
        }

        debug!(count = removed, "Cleared cache entries");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn key(url: &str) -> CacheKey {
        CacheKey::new("GET", url)
    }

    fn entry(body: &'static [u8]) -> (Bytes, EntryMetadata) {
        let data = Bytes::from_static(body);
        let response = crate::http::ProxyResponse::new(200, vec![], data.clone());
        (data, EntryMetadata::from_response(&response))
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("v1"));
        let k = key("https://app.example/index.html");
        let (data, metadata) = entry(b"<html>shell</html>");

        cache
            .put(k.clone(), data.clone(), metadata.clone())
            .await
            .unwrap();

        let (got, meta) = cache.get(&k).await.unwrap().expect("entry present");
        assert_eq!(got, data);
        assert_eq!(meta.status, metadata.status);
        assert_eq!(meta.size, data.len() as u64);
    }

    #[tokio::test]
    async fn get_missing_entry_is_none() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("v1"));

        assert!(cache.get(&key("https://app.example/nope")).await.unwrap().is_none());
        assert!(!cache.contains(&key("https://app.example/nope")).await.unwrap());
    }

    #[tokio::test]
    async fn corrupt_metadata_degrades_to_miss() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("v1"));
        let k = key("https://app.example/app.js");
        let (data, metadata) = entry(b"console.log('hi')");

        cache.put(k.clone(), data, metadata).await.unwrap();

        // Damage the sidecar
        let mut meta_path = dir.path().join("v1").join(k.to_filename());
        meta_path.set_extension("meta");
        std::fs::write(&meta_path, b"not json").unwrap();

        assert!(cache.get(&k).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_deletes_both_files() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("v1"));
        let k = key("https://app.example/style.css");
        let (data, metadata) = entry(b"body {}");

        cache.put(k.clone(), data, metadata).await.unwrap();
        cache.remove(&k).await.unwrap();

        assert!(!cache.contains(&k).await.unwrap());
        // Removing again is not an error
        cache.remove(&k).await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_initialization_creates_one_directory() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("v1"));
        let (a, b) = tokio::join!(cache.ensure_initialized(), cache.ensure_initialized());
        a.unwrap();
        b.unwrap();
        assert!(dir.path().join("v1").is_dir());
    }
}
