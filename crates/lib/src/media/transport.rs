//! Remote file transport seam: exchange an opaque file reference for a
//! downloadable location, then stream the bytes.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

/// Byte stream from a remote fetch. Chunk failures surface as io errors while
/// the store copies the stream to disk.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Result of exchanging a file reference for a downloadable location.
#[derive(Debug, Clone)]
pub struct ResolvedFile {
    /// Path relative to the platform's file endpoint (e.g. "photos/file_1.jpg").
    pub remote_path: String,
    /// Size reported by the platform, when available.
    pub size_bytes: Option<u64>,
}

/// The file reference could not be exchanged for a location.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("resolve request failed: {0}")]
    Request(reqwest::Error),
    #[error("file reference rejected: {0}")]
    Api(String),
}

/// The download request failed or returned a non-success status.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("download request failed: {0}")]
    Request(reqwest::Error),
    #[error("download returned status {0}")]
    Status(u16),
}

/// Resolves file references and fetches file bytes from the messaging platform.
#[async_trait]
pub trait FileTransport: Send + Sync {
    /// Exchange a file reference for a fetchable remote path.
    async fn resolve(&self, file_id: &str) -> Result<ResolvedFile, ResolveError>;
    /// Stream the bytes behind a resolved remote path.
    async fn fetch(&self, remote_path: &str) -> Result<ByteStream, FetchError>;
}
