//! # Sync Protocol
//!
//! Explicit "fetch and persist" commands from the foreground page, and the
//! handler that executes them. Every request terminates in exactly one
//! outcome message for the originating page; a failed sync holds no retry
//! state, so the page issues a fresh request if it wants another attempt.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ProxyError;
use crate::fetch::Fetcher;
use crate::http::Request;
use crate::store::{VideoRecord, VideoStore};

/// The video a sync request refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDescriptor {
    /// Stable identifier, typically the source URL
    pub id: String,
    /// Source URL to fetch the payload from
    pub url: String,
    /// Display title persisted alongside the payload
    pub title: String,
}

/// Message sent by the foreground page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum PageMessage {
    /// Fetch the video and persist it into the video store
    Sync { video: VideoDescriptor },
}

/// Reply delivered to the originating page, exactly once per request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum SyncOutcome {
    Complete {
        #[serde(rename = "videoId")]
        video_id: String,
    },
    Error {
        #[serde(rename = "videoId")]
        video_id: String,
    },
}

impl SyncOutcome {
    pub fn complete(video_id: impl Into<String>) -> Self {
        Self::Complete {
            video_id: video_id.into(),
        }
    }

    pub fn error(video_id: impl Into<String>) -> Self {
        Self::Error {
            video_id: video_id.into(),
        }
    }

    pub fn video_id(&self) -> &str {
        match self {
            Self::Complete { video_id } | Self::Error { video_id } => video_id,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }
}

/// Executes sync requests: fetch the source URL, persist the record,
/// report the outcome. Never panics and never returns more or less than
/// one outcome per request.
pub struct SyncHandler {
    fetcher: Arc<dyn Fetcher>,
    videos: Arc<VideoStore>,
}

impl SyncHandler {
    pub fn new(fetcher: Arc<dyn Fetcher>, videos: Arc<VideoStore>) -> Self {
        Self { fetcher, videos }
    }

    /// Run one sync to completion. Every failure path, from an invalid
    /// source URL to a store write error, yields an error outcome and
    /// leaves no partial record behind.
    pub async fn handle(&self, video: &VideoDescriptor) -> SyncOutcome {
        info!(id = %video.id, url = %video.url, "sync requested");

        match self.run(video).await {
            Ok(bytes) => {
                info!(id = %video.id, title = %video.title, bytes, "video synced");
                SyncOutcome::complete(&video.id)
            }
            Err(e) => {
                warn!(id = %video.id, error = %e, "sync failed");
                SyncOutcome::error(&video.id)
            }
        }
    }

    /// Fetch the source URL and persist the record, reporting the stored
    /// payload size. Non-success and opaque responses are rejected as
    /// [`ProxyError::Status`]; store failures surface as
    /// [`ProxyError::StoreWrite`].
    async fn run(&self, video: &VideoDescriptor) -> Result<usize, ProxyError> {
        let request = Request::get(&video.url)?;
        let response = self.fetcher.fetch(&request).await?;

        if !response.is_success() || response.opaque {
            return Err(ProxyError::Status(response.status));
        }

        let record = VideoRecord {
            id: video.id.clone(),
            title: video.title.clone(),
            blob: response.body,
        };
        self.videos
            .put(&record)
            .await
            .map_err(|e| ProxyError::StoreWrite(e.to_string()))?;

        Ok(record.blob.len())
    }
}
