//! In-memory storage implementation.

use crate::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory storage.
///
/// This stores all data in memory and is not persistent. Values are kept as
/// serialized JSON so every read hands out an independent copy.
#[derive(Default)]
pub struct MemoryStorage {
    data: RwLock<BTreeMap<Vec<String>, String>>,
}

impl MemoryStorage {
    /// Create a new in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.read().map(|d| d.len()).unwrap_or(0)
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn owned_key(key: &[&str]) -> StorageResult<Vec<String>> {
        if key.is_empty() {
            return Err(StorageError::invalid_key("Key cannot be empty"));
        }
        Ok(key.iter().map(|s| s.to_string()).collect())
    }

    fn read_guard(&self) -> StorageResult<RwLockReadGuard<'_, BTreeMap<Vec<String>, String>>> {
        self.data
            .read()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))
    }

    fn write_guard(&self) -> StorageResult<RwLockWriteGuard<'_, BTreeMap<Vec<String>, String>>> {
        self.data
            .write()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn read<T: DeserializeOwned + Send>(&self, key: &[&str]) -> StorageResult<Option<T>> {
        let key = Self::owned_key(key)?;
        let data = self.read_guard()?;

        data.get(&key)
            .map(|json| serde_json::from_str(json))
            .transpose()
            .map_err(StorageError::from)
    }

    async fn write<T: Serialize + Send + Sync>(
        &self,
        key: &[&str],
        value: &T,
    ) -> StorageResult<()> {
        let key = Self::owned_key(key)?;
        let json = serde_json::to_string(value)?;

        self.write_guard()?.insert(key, json);
        Ok(())
    }

    async fn insert<T: Serialize + Send + Sync>(
        &self,
        key: &[&str],
        value: &T,
    ) -> StorageResult<()> {
        let owned = Self::owned_key(key)?;
        let json = serde_json::to_string(value)?;

        let mut data = self.write_guard()?;
        if data.contains_key(&owned) {
            return Err(StorageError::already_exists(key));
        }
        data.insert(owned, json);
        Ok(())
    }

    async fn update<T, F>(&self, key: &[&str], editor: F) -> StorageResult<T>
    where
        T: DeserializeOwned + Serialize + Send + Sync + Default,
        F: FnOnce(&mut T) + Send,
    {
        let owned = Self::owned_key(key)?;

        // Hold the write lock across read-edit-write so concurrent updates
        // of the same key are not lost.
        let mut data = self.write_guard()?;
        let mut value: T = match data.get(&owned) {
            Some(json) => serde_json::from_str(json)?,
            None => T::default(),
        };
        editor(&mut value);
        data.insert(owned, serde_json::to_string(&value)?);

        Ok(value)
    }

    async fn remove(&self, key: &[&str]) -> StorageResult<()> {
        let key = Self::owned_key(key)?;
        self.write_guard()?.remove(&key);
        Ok(())
    }

    async fn list(&self, prefix: &[&str]) -> StorageResult<Vec<Vec<String>>> {
        let data = self.read_guard()?;

        // Only direct children of the prefix
        Ok(data
            .keys()
            .filter(|k| {
                k.len() == prefix.len() + 1 && k.iter().zip(prefix).all(|(a, b)| a == b)
            })
            .cloned()
            .collect())
    }

    async fn exists(&self, key: &[&str]) -> StorageResult<bool> {
        let key = Self::owned_key(key)?;
        Ok(self.read_guard()?.contains_key(&key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
    struct Counter {
        last: u64,
    }

    #[tokio::test]
    async fn test_memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        assert!(storage.is_empty());

        storage
            .write(&["sequences", "doc_a"], &Counter { last: 3 })
            .await
            .unwrap();

        let read: Option<Counter> = storage.read(&["sequences", "doc_a"]).await.unwrap();
        assert_eq!(read, Some(Counter { last: 3 }));
        assert!(storage.exists(&["sequences", "doc_a"]).await.unwrap());
        assert!(!storage.exists(&["sequences", "doc_b"]).await.unwrap());
        assert_eq!(storage.len(), 1);

        storage.remove(&["sequences", "doc_a"]).await.unwrap();
        assert!(!storage.exists(&["sequences", "doc_a"]).await.unwrap());

        // Removing nonexistent key should not error
        storage.remove(&["sequences", "doc_a"]).await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_storage_insert_is_exclusive() {
        let storage = MemoryStorage::new();

        storage.insert(&["seq", "1"], &Counter { last: 1 }).await.unwrap();
        let err = storage
            .insert(&["seq", "1"], &Counter { last: 2 })
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(ref k) if k == "seq/1"));

        let result: Option<Counter> = storage.read(&["seq", "1"]).await.unwrap();
        assert_eq!(result, Some(Counter { last: 1 }));

        // After removal the key can be claimed again
        storage.remove(&["seq", "1"]).await.unwrap();
        storage.insert(&["seq", "1"], &Counter { last: 2 }).await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_storage_update() {
        let storage = MemoryStorage::new();

        // Update creates default if not exists
        let result: Counter = storage
            .update(&["sequences", "doc_a"], |c: &mut Counter| c.last += 1)
            .await
            .unwrap();
        assert_eq!(result.last, 1);

        let result: Counter = storage
            .update(&["sequences", "doc_a"], |c: &mut Counter| c.last += 1)
            .await
            .unwrap();
        assert_eq!(result.last, 2);
    }

    #[tokio::test]
    async fn test_memory_storage_list_direct_children() {
        let storage = MemoryStorage::new();

        let value = Counter::default();
        storage.write(&["snapshots", "doc_a"], &value).await.unwrap();
        storage.write(&["snapshots", "doc_b"], &value).await.unwrap();
        storage
            .write(&["snapshots", "doc_a", "00000000000000000001"], &value)
            .await
            .unwrap();
        storage.write(&["sequences", "doc_a"], &value).await.unwrap();

        let items = storage.list(&["snapshots"]).await.unwrap();
        assert_eq!(
            items,
            vec![
                vec!["snapshots".to_string(), "doc_a".to_string()],
                vec!["snapshots".to_string(), "doc_b".to_string()],
            ]
        );

        let nested = storage.list(&["snapshots", "doc_a"]).await.unwrap();
        assert_eq!(nested.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_storage_rejects_empty_key() {
        let storage = MemoryStorage::new();
        assert!(storage.write(&[], &Counter::default()).await.is_err());
    }
}
