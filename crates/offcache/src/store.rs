//! # Video Store
//!
//! Persistent key-value store for synced video payloads. Records survive
//! process restarts and are only ever written whole: the blob and its JSON
//! metadata sidecar go to temporary files first and are renamed into
//! place, and a record is served only when both files are present.
//!
//! Population happens exclusively through the sync protocol; the router
//! only reads.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io;
use tracing::{debug, warn};

use crate::cache::providers::file::InitGate;

/// A fully materialized video payload with its display metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRecord {
    /// Stable identifier, typically the source URL
    pub id: String,
    /// Display title supplied by the page
    pub title: String,
    /// The complete binary payload
    pub blob: Bytes,
}

/// Sidecar persisted next to each blob
#[derive(Debug, Serialize, Deserialize)]
struct RecordMetadata {
    id: String,
    title: String,
    size: u64,
}

/// Persistent store of [`VideoRecord`]s, keyed by identifier.
///
/// Opening is lazy and idempotent; concurrent opens create the backing
/// directory exactly once. Read failures on an open store degrade to
/// "absent" rather than propagating.
#[derive(Debug, Clone)]
pub struct VideoStore {
    dir: PathBuf,
    init: Arc<InitGate>,
}

impl VideoStore {
    /// Create a handle over the given directory; nothing touches the
    /// filesystem until [`VideoStore::open`] or the first operation
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            init: Arc::new(InitGate::default()),
        }
    }

    /// Create the backing directory if absent. Idempotent; failures are
    /// fatal to the operation that needed the store.
    pub async fn open(&self) -> io::Result<()> {
        self.init.ensure(&self.dir).await
    }

    fn blob_path(&self, id: &str) -> PathBuf {
        use sha2::{Digest, Sha256};
        let hash = Sha256::digest(id.as_bytes());
        self.dir.join(format!("{hash:x}.bin"))
    }

    fn meta_path(&self, id: &str) -> PathBuf {
        let mut path = self.blob_path(id);
        path.set_extension("meta");
        path
    }

    /// Whether both files of a record are present. Probe failures count
    /// as absent; only opening the store itself is allowed to fail.
    async fn entry_files_present(&self, id: &str) -> bool {
        for path in [self.blob_path(id), self.meta_path(id)] {
            match fs::try_exists(&path).await {
                Ok(true) => {}
                Ok(false) => return false,
                Err(e) => {
                    warn!(id = %id, error = %e, "Failed to probe video record files");
                    return false;
                }
            }
        }
        true
    }

    /// Look up a record by identifier. Corrupt or unreadable entries are
    /// reported as absent with a warning.
    pub async fn get(&self, id: &str) -> io::Result<Option<VideoRecord>> {
        self.open().await?;

        let blob_path = self.blob_path(id);
        let meta_path = self.meta_path(id);

        if !self.entry_files_present(id).await {
            return Ok(None);
        }

        let metadata: RecordMetadata = match fs::read(&meta_path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(m) => m,
                Err(e) => {
                    warn!(id = %id, error = %e, "Failed to parse video record metadata");
                    return Ok(None);
                }
            },
            Err(e) => {
                warn!(id = %id, error = %e, "Failed to read video record metadata");
                return Ok(None);
            }
        };

        let blob = match fs::read(&blob_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(id = %id, error = %e, "Failed to read video record blob");
                return Ok(None);
            }
        };

        Ok(Some(VideoRecord {
            id: metadata.id,
            title: metadata.title,
            blob: Bytes::from(blob),
        }))
    }

    /// Whether a record exists for the identifier
    pub async fn contains(&self, id: &str) -> io::Result<bool> {
        self.open().await?;
        Ok(self.entry_files_present(id).await)
    }

    /// Atomic upsert keyed by `record.id`; the last completed write wins.
    /// The blob lands before the metadata, and a record is only visible
    /// once both files are in place.
    pub async fn put(&self, record: &VideoRecord) -> io::Result<()> {
        self.open().await?;

        let blob_path = self.blob_path(&record.id);
        let meta_path = self.meta_path(&record.id);
        let temp_blob_path = blob_path.with_extension("tmp");
        let temp_meta_path = meta_path.with_extension("mtmp");

        let metadata = RecordMetadata {
            id: record.id.clone(),
            title: record.title.clone(),
            size: record.blob.len() as u64,
        };
        let metadata_json = serde_json::to_vec(&metadata).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to serialize record metadata: {e}"),
            )
        })?;

        if let Err(e) = fs::write(&temp_blob_path, &record.blob).await {
            warn!(id = %record.id, error = %e, "Failed to write video blob");
            return Err(e);
        }

        if let Err(e) = fs::write(&temp_meta_path, &metadata_json).await {
            warn!(id = %record.id, error = %e, "Failed to write video record metadata");
            let _ = fs::remove_file(&temp_blob_path).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_blob_path, &blob_path).await {
            warn!(id = %record.id, error = %e, "Failed to rename video blob into place");
            let _ = fs::remove_file(&temp_blob_path).await;
            let _ = fs::remove_file(&temp_meta_path).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_meta_path, &meta_path).await {
            warn!(id = %record.id, error = %e, "Failed to rename video metadata into place");
            // Blob renamed but metadata did not; remove the blob so no
            // half-record is visible
            let _ = fs::remove_file(&blob_path).await;
            let _ = fs::remove_file(&temp_meta_path).await;
            return Err(e);
        }

        debug!(id = %record.id, bytes = record.blob.len(), "stored video record");
        Ok(())
    }

    /// Remove a record if present
    pub async fn remove(&self, id: &str) -> io::Result<()> {
        self.open().await?;

        let blob_result = fs::remove_file(self.blob_path(id)).await;
        let meta_result = fs::remove_file(self.meta_path(id)).await;

        match (blob_result, meta_result) {
            (Err(e), _) if e.kind() != io::ErrorKind::NotFound => Err(e),
            (_, Err(e)) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
