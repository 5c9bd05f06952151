use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Handle to one transient stored segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentRef(PathBuf);

impl SegmentRef {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl From<PathBuf> for SegmentRef {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("segment io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Scoped storage for the audio segments handed to the expression model.
/// Everything written here is transient; the analyzer deletes segments as
/// soon as they are scored and a background sweep catches leftovers.
pub trait SegmentStore: Send + Sync {
    fn write(&self, name: String, bytes: Bytes) -> BoxFuture<'_, Result<SegmentRef, StoreError>>;

    fn delete(&self, segment: SegmentRef) -> BoxFuture<'_, Result<(), StoreError>>;
}

#[derive(Clone, Debug)]
pub struct FsSegmentStore {
    root: PathBuf,
}

impl FsSegmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn ensure_root(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Delete files older than `max_age`. Individual delete failures are
    /// logged and skipped so one stuck file cannot stall the sweep.
    pub async fn cleanup_old_files(&self, max_age: Duration) -> Result<usize, StoreError> {
        let mut deleted = 0usize;
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let now = SystemTime::now();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "could not stat segment");
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            let age = now.duration_since(modified).unwrap_or_default();
            if age > max_age {
                match tokio::fs::remove_file(entry.path()).await {
                    Ok(()) => deleted += 1,
                    Err(e) => {
                        tracing::warn!(path = %entry.path().display(), error = %e, "could not delete expired segment");
                    }
                }
            }
        }
        Ok(deleted)
    }
}

impl SegmentStore for FsSegmentStore {
    fn write(&self, name: String, bytes: Bytes) -> BoxFuture<'_, Result<SegmentRef, StoreError>> {
        let this = self.clone();
        async move {
            this.ensure_root().await?;
            let path = this.root.join(name);
            tokio::fs::write(&path, &bytes).await?;
            Ok(SegmentRef(path))
        }
        .boxed()
    }

    fn delete(&self, segment: SegmentRef) -> BoxFuture<'_, Result<(), StoreError>> {
        async move {
            tokio::fs::remove_file(segment.path()).await?;
            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSegmentStore::new(dir.path());

        let segment = store
            .write("a.wav".to_owned(), Bytes::from_static(b"RIFF"))
            .await
            .unwrap();
        assert!(segment.path().exists());
        assert_eq!(std::fs::read(segment.path()).unwrap(), b"RIFF");

        store.delete(segment.clone()).await.unwrap();
        assert!(!segment.path().exists());
    }

    #[tokio::test]
    async fn write_creates_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSegmentStore::new(dir.path().join("nested/audio"));
        let segment = store
            .write("b.wav".to_owned(), Bytes::from_static(b"x"))
            .await
            .unwrap();
        assert!(segment.path().exists());
    }

    #[tokio::test]
    async fn delete_missing_segment_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSegmentStore::new(dir.path());
        let missing = SegmentRef::from(dir.path().join("nope.wav"));
        assert!(store.delete(missing).await.is_err());
    }

    #[tokio::test]
    async fn cleanup_removes_only_old_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSegmentStore::new(dir.path());
        store
            .write("fresh.wav".to_owned(), Bytes::from_static(b"x"))
            .await
            .unwrap();

        // A zero max-age sweep against freshly-written files deletes nothing
        // only if their age is exactly zero, so use a generous threshold to
        // assert the keep side and a stale mtime for the delete side.
        let kept = store.cleanup_old_files(Duration::from_secs(3_600)).await.unwrap();
        assert_eq!(kept, 0);

        let stale_path = dir.path().join("stale.wav");
        std::fs::write(&stale_path, b"y").unwrap();
        let old = SystemTime::now() - Duration::from_secs(600);
        let file = std::fs::File::options().write(true).open(&stale_path).unwrap();
        file.set_modified(old).unwrap();
        drop(file);

        let deleted = store.cleanup_old_files(Duration::from_secs(300)).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(!stale_path.exists());
        assert!(dir.path().join("fresh.wav").exists());
    }

    #[tokio::test]
    async fn cleanup_of_missing_root_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSegmentStore::new(dir.path().join("never-created"));
        let deleted = store.cleanup_old_files(Duration::from_secs(1)).await.unwrap();
        assert_eq!(deleted, 0);
    }
}
