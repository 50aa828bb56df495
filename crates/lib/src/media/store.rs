//! Durable save of a byte stream under the storage root.
//!
//! Writes go to `<name>.part` and are renamed into place on completion, so an
//! interrupted transfer never leaves a partial file at the final path. Saving
//! the same name twice overwrites (rename semantics, last writer wins).

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Local filesystem save failed (create, write, or rename).
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("unusable file name from remote path {0:?}")]
    InvalidName(String),
    #[error("writing {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Saves byte streams as files under a fixed storage root. The root is created
/// at service start; per-call failures surface the underlying io error.
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copy the stream to `root/file_name`. The caller is responsible for
    /// passing a plain file name (no directory components).
    pub async fn save<S>(&self, file_name: &str, mut stream: S) -> Result<PathBuf, PersistError>
    where
        S: Stream<Item = std::io::Result<Bytes>> + Unpin,
    {
        let final_path = self.root.join(file_name);
        let part_path = self.root.join(format!("{}.part", file_name));
        match copy_to(&part_path, &mut stream).await {
            Ok(()) => {
                tokio::fs::rename(&part_path, &final_path)
                    .await
                    .map_err(|source| PersistError::Io {
                        path: final_path.clone(),
                        source,
                    })?;
                Ok(final_path)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&part_path).await;
                Err(e)
            }
        }
    }
}

async fn copy_to<S>(path: &Path, stream: &mut S) -> Result<(), PersistError>
where
    S: Stream<Item = std::io::Result<Bytes>> + Unpin,
{
    let io_err = |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = tokio::fs::File::create(path).await.map_err(io_err)?;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(io_err)?;
        file.write_all(&chunk).await.map_err(io_err)?;
    }
    file.flush().await.map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn temp_root() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("snapvault-store-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("create temp storage root");
        dir
    }

    fn chunks(parts: Vec<&'static [u8]>) -> impl Stream<Item = std::io::Result<Bytes>> + Unpin {
        stream::iter(parts.into_iter().map(|c| Ok(Bytes::from_static(c))))
    }

    #[tokio::test]
    async fn save_writes_file_under_root() {
        let store = MediaStore::new(temp_root());
        let path = store
            .save("photo123.jpg", chunks(vec![b"abc", b"def"]))
            .await
            .expect("save");
        assert_eq!(path, store.root().join("photo123.jpg"));
        assert_eq!(std::fs::read(&path).expect("read saved file"), b"abcdef");
        // No .part file left behind.
        assert_eq!(std::fs::read_dir(store.root()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn save_overwrites_existing_file() {
        let store = MediaStore::new(temp_root());
        store
            .save("photo.jpg", chunks(vec![b"first"]))
            .await
            .expect("first save");
        store
            .save("photo.jpg", chunks(vec![b"second"]))
            .await
            .expect("second save");
        assert_eq!(
            std::fs::read(store.root().join("photo.jpg")).expect("read"),
            b"second"
        );
        assert_eq!(std::fs::read_dir(store.root()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn failed_stream_leaves_no_file() {
        let store = MediaStore::new(temp_root());
        let broken = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::other("connection reset")),
        ]);
        let err = store
            .save("photo.jpg", broken)
            .await
            .expect_err("save should fail");
        assert!(matches!(err, PersistError::Io { .. }));
        assert!(!store.root().join("photo.jpg").exists());
        assert_eq!(std::fs::read_dir(store.root()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn save_into_missing_root_fails() {
        let store = MediaStore::new(temp_root().join("nonexistent"));
        let err = store
            .save("photo.jpg", chunks(vec![b"abc"]))
            .await
            .expect_err("save should fail");
        assert!(matches!(err, PersistError::Io { .. }));
    }
}
