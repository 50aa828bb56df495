//! Orchestrates resolve -> fetch -> persist for one photo event.
//!
//! Every step is a single best-effort attempt: the first failure is terminal
//! for that event and surfaces as one [`MediaError`] for the dispatcher to
//! report. No step is retried.

use crate::media::store::{MediaStore, PersistError};
use crate::media::transport::{FetchError, FileTransport, ResolveError};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Any failure along the retrieval pipeline. Converted by the dispatcher into
/// a single user-facing failure reply; the cause is only logged.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("resolving file reference: {0}")]
    Resolve(#[from] ResolveError),
    #[error("downloading file: {0}")]
    Fetch(#[from] FetchError),
    #[error("saving file: {0}")]
    Persist(#[from] PersistError),
}

/// Media retrieval pipeline: one transport to resolve and fetch, one store to persist.
pub struct MediaPipeline {
    transport: Arc<dyn FileTransport>,
    store: MediaStore,
}

impl MediaPipeline {
    pub fn new(transport: Arc<dyn FileTransport>, store: MediaStore) -> Self {
        Self { transport, store }
    }

    /// Resolve, download, and persist one photo. Returns the stored path.
    pub async fn ingest(&self, file_id: &str) -> Result<PathBuf, MediaError> {
        let resolved = self.transport.resolve(file_id).await?;
        log::debug!(
            "resolved file reference: path={} size={:?}",
            resolved.remote_path,
            resolved.size_bytes
        );
        // Name before fetch: don't download what we can't store.
        let name = file_name(&resolved.remote_path)?;
        let stream = self.transport.fetch(&resolved.remote_path).await?;
        let path = self.store.save(&name, stream).await?;
        log::info!("photo saved to {}", path.display());
        Ok(path)
    }
}

/// Derive the local file name from a resolved remote path: basename only.
/// Rejects paths whose final component is empty or points upward, so a stored
/// file can never escape the storage root.
fn file_name(remote_path: &str) -> Result<String, PersistError> {
    Path::new(remote_path)
        .file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.to_string())
        .ok_or_else(|| PersistError::InvalidName(remote_path.to_string()))
}
