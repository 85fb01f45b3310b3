//! Filesystem blob store
//!
//! Layout: `{root}/{name}/{version}`. Saves go through a sibling temp file
//! that is synced and renamed over the target, so readers never observe a
//! half-written version.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::artifact::ArtifactKey;

use super::{BlobError, BlobPath, BlobStore};

/// Blob store rooted at a local directory
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open a store, creating the root directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, BlobError> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|source| BlobError::Io {
            path: BlobPath::new(root.to_string_lossy()),
            source,
        })?;

        tracing::debug!(root = %root.display(), "Blob store opened");

        Ok(Self { root })
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_path(&self, key: &ArtifactKey) -> Result<PathBuf, BlobError> {
        validate_component(&key.name)?;
        validate_component(&key.version)?;
        Ok(self.root.join(&key.name).join(&key.version))
    }

    /// Map a path handed back by a caller onto the filesystem, refusing
    /// anything outside the root.
    fn resolve(&self, path: &BlobPath) -> Result<PathBuf, BlobError> {
        let candidate = PathBuf::from(path.as_str());
        let inside = candidate.starts_with(&self.root)
            && candidate
                .components()
                .all(|c| !matches!(c, std::path::Component::ParentDir));

        if inside {
            Ok(candidate)
        } else {
            Err(BlobError::InvalidPath(path.clone()))
        }
    }
}

fn validate_component(part: &str) -> Result<(), BlobError> {
    let bad = part.is_empty()
        || part == "."
        || part == ".."
        || part.contains('/')
        || part.contains('\\')
        || part.contains('\0');

    if bad {
        Err(BlobError::InvalidKey(part.to_string()))
    } else {
        Ok(())
    }
}

fn io_error(path: &BlobPath, source: std::io::Error) -> BlobError {
    if source.kind() == std::io::ErrorKind::NotFound {
        BlobError::NotFound(path.clone())
    } else {
        BlobError::Io {
            path: path.clone(),
            source,
        }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn save(&self, key: &ArtifactKey, data: Bytes) -> Result<BlobPath, BlobError> {
        let target = self.file_path(key)?;
        let path = BlobPath::new(target.to_string_lossy());

        if let Some(dir) = target.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| io_error(&path, e))?;
        }

        let partial = target.with_file_name(format!(".{}.partial", key.version));
        let write = async {
            let mut file = fs::File::create(&partial).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
            fs::rename(&partial, &target).await
        };

        if let Err(e) = write.await {
            let _ = fs::remove_file(&partial).await;
            return Err(BlobError::Io { path, source: e });
        }

        tracing::debug!(artifact = %key, path = %path, size = data.len(), "Blob saved");

        Ok(path)
    }

    async fn get(&self, path: &BlobPath) -> Result<Bytes, BlobError> {
        let file = self.resolve(path)?;
        let data = fs::read(&file).await.map_err(|e| io_error(path, e))?;
        Ok(Bytes::from(data))
    }

    async fn delete(&self, path: &BlobPath) -> Result<(), BlobError> {
        let file = self.resolve(path)?;
        fs::remove_file(&file).await.map_err(|e| io_error(path, e))
    }

    fn path_for(&self, key: &ArtifactKey) -> Result<BlobPath, BlobError> {
        let file = self.file_path(key)?;
        Ok(BlobPath::new(file.to_string_lossy()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();
        let key = ArtifactKey::new("w1", "1.0.0").unwrap();

        let path = store.save(&key, Bytes::from_static(b"hello")).await.unwrap();

        assert_eq!(path, store.path_for(&key).unwrap());
        assert!(dir.path().join("w1").join("1.0.0").exists());
        assert_eq!(&store.get(&path).await.unwrap()[..], b"hello");
    }

    #[tokio::test]
    async fn test_save_overwrites_and_leaves_no_partial() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();
        let key = ArtifactKey::new("w1", "1.0.0").unwrap();

        store.save(&key, Bytes::from_static(b"first")).await.unwrap();
        let path = store.save(&key, Bytes::from_static(b"second")).await.unwrap();

        assert_eq!(&store.get(&path).await.unwrap()[..], b"second");

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("w1"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("1.0.0")]);
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();
        let key = ArtifactKey::new("w1", "1.0.0").unwrap();

        let path = store.save(&key, Bytes::from_static(b"hello")).await.unwrap();
        store.delete(&path).await.unwrap();

        assert!(matches!(store.get(&path).await, Err(BlobError::NotFound(_))));
        assert!(matches!(
            store.delete(&path).await,
            Err(BlobError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();
        let key = ArtifactKey::new("nope", "0.0.1").unwrap();

        let path = store.path_for(&key).unwrap();
        assert!(matches!(store.get(&path).await, Err(BlobError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();

        let key = ArtifactKey::new("..", "1.0.0").unwrap();
        assert!(matches!(
            store.save(&key, Bytes::new()).await,
            Err(BlobError::InvalidKey(_))
        ));

        let key = ArtifactKey::new("w1", "a/b").unwrap();
        assert!(matches!(store.path_for(&key), Err(BlobError::InvalidKey(_))));

        let outside = BlobPath::new("/etc/passwd");
        assert!(matches!(
            store.get(&outside).await,
            Err(BlobError::InvalidPath(_))
        ));
    }
}
