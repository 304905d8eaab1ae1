//! The current live video pointer.
//!
//! Stored as a plain string under the shared `current-live-id` key; an
//! empty string means nothing is live.

use bookvision_core::LiveVideoId;

use crate::storage::{BlobStore, LIVE_VIDEO_KEY, Scope, StorageError};

/// Reads and writes the current live video id.
#[derive(Clone)]
pub struct LiveService {
    store: BlobStore,
}

impl LiveService {
    #[must_use]
    pub const fn new(store: BlobStore) -> Self {
        Self { store }
    }

    /// The video currently live, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be read.
    pub async fn current(&self) -> Result<Option<LiveVideoId>, StorageError> {
        let Some(raw) = self.store.get(&Scope::Shared, LIVE_VIDEO_KEY).await? else {
            return Ok(None);
        };

        match LiveVideoId::parse(&raw) {
            Ok(id) => Ok(id),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unparseable stored live video id");
                Ok(None)
            }
        }
    }

    /// Set or clear the live video.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    pub async fn set(&self, video: Option<&LiveVideoId>) -> Result<(), StorageError> {
        let raw = video.map_or("", LiveVideoId::as_str);
        self.store.set(&Scope::Shared, LIVE_VIDEO_KEY, raw).await?;
        tracing::info!(video_id = raw, "Live video updated");
        Ok(())
    }
}
