//! In-memory blob store

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::artifact::ArtifactKey;

use super::{BlobError, BlobPath, BlobStore};

const SCHEME: &str = "mem://";

/// Blob store backed by a `HashMap`
///
/// Paths have the form `mem://{name}/{version}`, with `%` and `/` inside a
/// component percent-encoded.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<BlobPath, Bytes>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether anything is stored at `path`
    pub async fn contains(&self, path: &BlobPath) -> bool {
        self.blobs.read().await.contains_key(path)
    }

    /// Number of stored blobs
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

fn encode(component: &str) -> String {
    component.replace('%', "%25").replace('/', "%2F")
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn save(&self, key: &ArtifactKey, data: Bytes) -> Result<BlobPath, BlobError> {
        let path = self.path_for(key)?;
        self.blobs.write().await.insert(path.clone(), data);
        Ok(path)
    }

    async fn get(&self, path: &BlobPath) -> Result<Bytes, BlobError> {
        self.blobs
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(path.clone()))
    }

    async fn delete(&self, path: &BlobPath) -> Result<(), BlobError> {
        match self.blobs.write().await.remove(path) {
            Some(_) => Ok(()),
            None => Err(BlobError::NotFound(path.clone())),
        }
    }

    fn path_for(&self, key: &ArtifactKey) -> Result<BlobPath, BlobError> {
        Ok(BlobPath::new(format!(
            "{}{}/{}",
            SCHEME,
            encode(&key.name),
            encode(&key.version)
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_get_delete() {
        let store = MemoryBlobStore::new();
        let key = ArtifactKey::new("w1", "1.0.0").unwrap();

        let path = store.save(&key, Bytes::from_static(b"hello")).await.unwrap();
        assert_eq!(path, store.path_for(&key).unwrap());
        assert_eq!(path.as_str(), "mem://w1/1.0.0");
        assert_eq!(&store.get(&path).await.unwrap()[..], b"hello");

        store.delete(&path).await.unwrap();
        assert!(!store.contains(&path).await);
        assert!(matches!(
            store.get(&path).await,
            Err(BlobError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let store = MemoryBlobStore::new();
        let key = ArtifactKey::new("w1", "1.0.0").unwrap();

        store.save(&key, Bytes::from_static(b"first")).await.unwrap();
        let path = store.save(&key, Bytes::from_static(b"second")).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(&store.get(&path).await.unwrap()[..], b"second");
    }

    #[test]
    fn test_separator_in_components() {
        let store = MemoryBlobStore::new();
        let left = store.path_for(&ArtifactKey::new("a/b", "c").unwrap()).unwrap();
        let right = store.path_for(&ArtifactKey::new("a", "b/c").unwrap()).unwrap();

        assert_ne!(left, right);
        assert_eq!(left.as_str(), "mem://a%2Fb/c");
    }
}
