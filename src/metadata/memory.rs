//! In-memory metadata store
//!
//! All state sits behind a single mutex, which is what makes
//! [`MetadataStore::commit`] atomic: a transaction is validated and applied
//! while the lock is held, so readers see either none or all of its writes.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::artifact::{ArtifactKey, ArtifactMetadata};

use super::{keys, MetadataError, MetadataOp, MetadataStore, MetadataTransaction};

/// Position of one member in an ordered index
#[derive(Debug, Clone, Copy)]
struct IndexEntry {
    score: i64,
    /// Arrival order, breaks score ties
    seq: u64,
}

#[derive(Debug, Default)]
struct State {
    /// Lock key -> expiry
    locks: HashMap<String, Instant>,
    records: HashMap<String, ArtifactMetadata>,
    indexes: HashMap<String, HashMap<String, IndexEntry>>,
    pointers: HashMap<String, String>,
    last_seen: HashMap<String, DateTime<Utc>>,
    next_seq: u64,
}

impl State {
    fn newest_member(&self, index_key: &str) -> Option<String> {
        self.indexes.get(index_key).and_then(|index| {
            index
                .iter()
                .max_by_key(|(_, entry)| (entry.score, entry.seq))
                .map(|(member, _)| member.clone())
        })
    }
}

/// Metadata store held entirely in process memory
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    state: Mutex<State>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a lock key is currently held (expired locks count as free)
    pub async fn is_locked(&self, key: &str) -> bool {
        let state = self.state.lock().await;
        state
            .locks
            .get(key)
            .is_some_and(|expires| *expires > Instant::now())
    }

    /// Last liveness timestamp recorded for a subscriber
    pub async fn last_seen(&self, subscriber_id: &str) -> Option<DateTime<Utc>> {
        let state = self.state.lock().await;
        state.last_seen.get(&keys::last_seen(subscriber_id)).copied()
    }
}

fn validate(op: &MetadataOp) -> Result<(), MetadataError> {
    if op.key().is_empty() {
        return Err(MetadataError::Transaction("empty key".into()));
    }

    match op {
        MetadataOp::PutRecord { key, record } => {
            let expected = keys::record(&record.key());
            if *key != expected {
                return Err(MetadataError::Transaction(format!(
                    "record for {} written under {}",
                    expected, key
                )));
            }
        }
        MetadataOp::IndexVersion { member, .. } if member.is_empty() => {
            return Err(MetadataError::Transaction("empty index member".into()));
        }
        MetadataOp::SetPointer { value, .. } if value.is_empty() => {
            return Err(MetadataError::Transaction("empty pointer value".into()));
        }
        _ => {}
    }

    Ok(())
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn try_acquire_lock(&self, key: &str, ttl: Duration) -> Result<bool, MetadataError> {
        let mut state = self.state.lock().await;
        let now = Instant::now();

        if let Some(expires) = state.locks.get(key) {
            if *expires > now {
                return Ok(false);
            }
        }

        state.locks.insert(key.to_string(), now + ttl);
        Ok(true)
    }

    async fn release_lock(&self, key: &str) -> Result<(), MetadataError> {
        self.state.lock().await.locks.remove(key);
        Ok(())
    }

    async fn commit(&self, transaction: MetadataTransaction) -> Result<(), MetadataError> {
        let mut state = self.state.lock().await;

        for op in transaction.ops() {
            validate(op)?;
        }

        for op in transaction.into_ops() {
            match op {
                MetadataOp::PutRecord { key, record } => {
                    state.records.insert(key, record);
                }
                MetadataOp::IndexVersion { key, member, score } => {
                    let seq = state.next_seq;
                    state.next_seq += 1;
                    state
                        .indexes
                        .entry(key)
                        .or_default()
                        .insert(member, IndexEntry { score, seq });
                }
                MetadataOp::SetPointer { key, value } => {
                    state.pointers.insert(key, value);
                }
            }
        }

        Ok(())
    }

    async fn read_record(
        &self,
        key: &ArtifactKey,
    ) -> Result<Option<ArtifactMetadata>, MetadataError> {
        let state = self.state.lock().await;
        Ok(state.records.get(&keys::record(key)).cloned())
    }

    async fn read_latest_pointer(&self, name: &str) -> Result<Option<String>, MetadataError> {
        let state = self.state.lock().await;

        if let Some(version) = state.pointers.get(&keys::latest(name)) {
            return Ok(Some(version.clone()));
        }

        // Pointer missing: fall back to the newest indexed version
        Ok(state.newest_member(&keys::versions(name)))
    }

    async fn read_ordered_versions(&self, name: &str) -> Result<Vec<String>, MetadataError> {
        let state = self.state.lock().await;

        let Some(index) = state.indexes.get(&keys::versions(name)) else {
            return Ok(Vec::new());
        };

        let mut entries: Vec<(&String, &IndexEntry)> = index.iter().collect();
        entries.sort_by(|a, b| (b.1.score, b.1.seq).cmp(&(a.1.score, a.1.seq)));

        Ok(entries.into_iter().map(|(member, _)| member.clone()).collect())
    }

    async fn record_last_seen(
        &self,
        subscriber_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), MetadataError> {
        let mut state = self.state.lock().await;
        state.last_seen.insert(keys::last_seen(subscriber_id), at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::BlobPath;

    fn metadata(name: &str, version: &str, secs: i64) -> ArtifactMetadata {
        ArtifactMetadata {
            name: name.into(),
            version: version.into(),
            checksum: "abc123def456".into(),
            size: 1024,
            path: BlobPath::new(format!("mem://{}/{}", name, version)),
            uploaded_at: DateTime::from_timestamp(secs, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_lock_set_if_absent() {
        let store = MemoryMetadataStore::new();
        let ttl = Duration::from_secs(30);

        assert!(store.try_acquire_lock("lock:a", ttl).await.unwrap());
        assert!(!store.try_acquire_lock("lock:a", ttl).await.unwrap());
        assert!(store.try_acquire_lock("lock:b", ttl).await.unwrap());

        store.release_lock("lock:a").await.unwrap();
        assert!(store.try_acquire_lock("lock:a", ttl).await.unwrap());
    }

    #[tokio::test]
    async fn test_lock_expires() {
        let store = MemoryMetadataStore::new();

        assert!(store
            .try_acquire_lock("lock:a", Duration::from_millis(20))
            .await
            .unwrap());
        assert!(store.is_locked("lock:a").await);

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(!store.is_locked("lock:a").await);
        assert!(store
            .try_acquire_lock("lock:a", Duration::from_secs(30))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_release_absent_lock_is_ok() {
        let store = MemoryMetadataStore::new();
        assert!(store.release_lock("lock:none").await.is_ok());
    }

    #[tokio::test]
    async fn test_store_and_retrieve() {
        let store = MemoryMetadataStore::new();
        let record = metadata("test-file", "1.0.0", 1_700_000_000);

        store
            .commit(MetadataTransaction::for_artifact(&record))
            .await
            .unwrap();

        let key = ArtifactKey::new("test-file", "1.0.0").unwrap();
        assert_eq!(store.read_record(&key).await.unwrap(), Some(record));
        assert_eq!(
            store.read_latest_pointer("test-file").await.unwrap(),
            Some("1.0.0".into())
        );
        assert_eq!(
            store.read_ordered_versions("test-file").await.unwrap(),
            vec!["1.0.0".to_string()]
        );
    }

    #[tokio::test]
    async fn test_versions_newest_first_with_tie_break() {
        let store = MemoryMetadataStore::new();

        for (version, secs) in [("1.0.0", 100), ("1.1.0", 300), ("1.0.1", 200), ("1.1.1", 300)] {
            store
                .commit(MetadataTransaction::for_artifact(&metadata("w", version, secs)))
                .await
                .unwrap();
        }

        // 1.1.1 ties with 1.1.0 on score but arrived later
        assert_eq!(
            store.read_ordered_versions("w").await.unwrap(),
            vec!["1.1.1", "1.1.0", "1.0.1", "1.0.0"]
        );
    }

    #[tokio::test]
    async fn test_latest_is_last_committed() {
        let store = MemoryMetadataStore::new();

        store
            .commit(MetadataTransaction::for_artifact(&metadata("w", "2.0.0", 500)))
            .await
            .unwrap();
        // Older timestamp, committed later: still becomes latest
        store
            .commit(MetadataTransaction::for_artifact(&metadata("w", "1.0.0", 100)))
            .await
            .unwrap();

        assert_eq!(
            store.read_latest_pointer("w").await.unwrap(),
            Some("1.0.0".into())
        );
        let versions = store.read_ordered_versions("w").await.unwrap();
        assert_eq!(versions, vec!["2.0.0", "1.0.0"]);
    }

    #[tokio::test]
    async fn test_latest_falls_back_to_index() {
        let store = MemoryMetadataStore::new();
        let txn = MetadataTransaction::new()
            .push(MetadataOp::IndexVersion {
                key: keys::versions("w"),
                member: "0.9.0".into(),
                score: 10,
            })
            .push(MetadataOp::IndexVersion {
                key: keys::versions("w"),
                member: "1.0.0".into(),
                score: 20,
            });
        store.commit(txn).await.unwrap();

        assert_eq!(
            store.read_latest_pointer("w").await.unwrap(),
            Some("1.0.0".into())
        );
    }

    #[tokio::test]
    async fn test_invalid_transaction_applies_nothing() {
        let store = MemoryMetadataStore::new();
        let record = metadata("w", "1.0.0", 100);
        let txn = MetadataTransaction::for_artifact(&record).push(MetadataOp::SetPointer {
            key: String::new(),
            value: "1.0.0".into(),
        });

        let result = store.commit(txn).await;
        assert!(matches!(result, Err(MetadataError::Transaction(_))));

        let key = ArtifactKey::new("w", "1.0.0").unwrap();
        assert_eq!(store.read_record(&key).await.unwrap(), None);
        assert_eq!(store.read_latest_pointer("w").await.unwrap(), None);
        assert!(store.read_ordered_versions("w").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mismatched_record_key_rejected() {
        let store = MemoryMetadataStore::new();
        let txn = MetadataTransaction::new().push(MetadataOp::PutRecord {
            key: "file:other:9.9.9".into(),
            record: metadata("w", "1.0.0", 100),
        });

        assert!(matches!(
            store.commit(txn).await,
            Err(MetadataError::Transaction(_))
        ));
    }

    #[tokio::test]
    async fn test_nonexistent_name() {
        let store = MemoryMetadataStore::new();
        let key = ArtifactKey::new("nonexistent", "1.0.0").unwrap();

        assert_eq!(store.read_record(&key).await.unwrap(), None);
        assert_eq!(store.read_latest_pointer("nonexistent").await.unwrap(), None);
        assert!(store
            .read_ordered_versions("nonexistent")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_record_last_seen() {
        let store = MemoryMetadataStore::new();
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        store.record_last_seen("c1", at).await.unwrap();
        assert_eq!(store.last_seen("c1").await, Some(at));
        assert_eq!(store.last_seen("c2").await, None);
    }
}
