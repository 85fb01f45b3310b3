//! Scoped upload lock
//!
//! [`UploadLock`] holds `lock:upload:{name}:{version}` for one ingestion.
//! The coordinator releases it explicitly on every return path; `Drop`
//! covers panics and cancelled futures by spawning the release. If even
//! that is impossible the TTL frees the key.

use std::sync::Arc;
use std::time::Duration;

use crate::artifact::ArtifactKey;
use crate::error::IngestError;
use crate::metadata::{keys, MetadataStore};

pub struct UploadLock {
    store: Arc<dyn MetadataStore>,
    key: String,
    released: bool,
}

impl UploadLock {
    /// Take the lock for `artifact`
    ///
    /// A held key is `Conflict`; a store failure is `Unavailable`.
    pub async fn acquire(
        store: Arc<dyn MetadataStore>,
        artifact: &ArtifactKey,
        ttl: Duration,
    ) -> Result<Self, IngestError> {
        let key = keys::upload_lock(artifact);

        match store.try_acquire_lock(&key, ttl).await {
            Ok(true) => Ok(Self {
                store,
                key,
                released: false,
            }),
            Ok(false) => Err(IngestError::Conflict(artifact.clone())),
            Err(e) => Err(IngestError::Unavailable(e)),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release now; a failure is logged and left to the TTL
    pub async fn release(mut self) {
        self.released = true;

        if let Err(e) = self.store.release_lock(&self.key).await {
            tracing::warn!(lock = %self.key, error = %e, "Failed to release upload lock");
        }
    }
}

impl Drop for UploadLock {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let key = std::mem::take(&mut self.key);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let store = Arc::clone(&self.store);
                handle.spawn(async move {
                    if let Err(e) = store.release_lock(&key).await {
                        tracing::warn!(lock = %key, error = %e, "Failed to release upload lock");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(lock = %key, "Upload lock dropped outside runtime, left to TTL");
            }
        }
    }
}
