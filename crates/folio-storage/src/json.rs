//! JSON file-based storage implementation.
//!
//! This storage backend stores each key as a separate JSON file.
//! Keys are mapped to file paths: `["snapshots", "doc_1", "00000000000000000001"]`
//! -> `snapshots/doc_1/00000000000000000001.json`

use crate::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracing::debug;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// JSON file-based storage.
#[derive(Clone)]
pub struct JsonStorage {
    base_path: PathBuf,
}

impl JsonStorage {
    /// Create a new JSON storage at the given base path.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// The directory this storage writes under.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Get the file path for a key.
    fn key_to_path(&self, key: &[&str]) -> StorageResult<PathBuf> {
        let Some((last, parents)) = key.split_last() else {
            return Err(StorageError::invalid_key("Key cannot be empty"));
        };

        // Validate key components (no path traversal)
        for component in key {
            if component.is_empty()
                || component.contains('/')
                || component.contains('\\')
                || component.starts_with('.')
            {
                return Err(StorageError::invalid_key(format!(
                    "Invalid key component: {}",
                    component
                )));
            }
        }

        // Components may contain dots, so append the extension
        let mut path = self.prefix_to_dir(parents);
        path.push(format!("{}.json", last));

        Ok(path)
    }

    /// Get the directory path for a prefix.
    fn prefix_to_dir(&self, prefix: &[&str]) -> PathBuf {
        let mut path = self.base_path.clone();
        for component in prefix {
            path.push(component);
        }
        path
    }

    /// Serialize a value into a uniquely named temp file next to `path`.
    ///
    /// Temp files are dot-prefixed with a `.tmp` extension so `list` never
    /// reports them.
    async fn write_temp<T: Serialize + Send + Sync>(
        path: &Path,
        value: &T,
    ) -> StorageResult<PathBuf> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(value)?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("value");
        let temp_path = path.with_file_name(format!(
            ".{}.{}-{}.tmp",
            stem,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&temp_path, &content).await?;

        Ok(temp_path)
    }
}

#[async_trait]
impl Storage for JsonStorage {
    async fn read<T: DeserializeOwned + Send>(&self, key: &[&str]) -> StorageResult<Option<T>> {
        let path = self.key_to_path(key)?;
        debug!(path = %path.display(), "Reading from storage");

        match fs::read_to_string(&path).await {
            Ok(content) => {
                let value: T = serde_json::from_str(&content)?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn write<T: Serialize + Send + Sync>(
        &self,
        key: &[&str],
        value: &T,
    ) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        debug!(path = %path.display(), "Writing to storage");

        // Write atomically (write to temp file, then rename)
        let temp_path = Self::write_temp(&path, value).await?;
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StorageError::Io(e));
        }

        Ok(())
    }

    async fn insert<T: Serialize + Send + Sync>(
        &self,
        key: &[&str],
        value: &T,
    ) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        debug!(path = %path.display(), "Inserting into storage");

        // A hard link fails if the target exists, which makes the
        // check-and-create a single filesystem operation.
        let temp_path = Self::write_temp(&path, value).await?;
        let linked = fs::hard_link(&temp_path, &path).await;
        let _ = fs::remove_file(&temp_path).await;

        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StorageError::already_exists(key))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn update<T, F>(&self, key: &[&str], editor: F) -> StorageResult<T>
    where
        T: DeserializeOwned + Serialize + Send + Sync + Default,
        F: FnOnce(&mut T) + Send,
    {
        // Read current value
        let mut value: T = self.read(key).await?.unwrap_or_default();

        // Apply edit
        editor(&mut value);

        // Write back
        self.write(key, &value).await?;

        Ok(value)
    }

    async fn remove(&self, key: &[&str]) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        debug!(path = %path.display(), "Removing from storage");

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn list(&self, prefix: &[&str]) -> StorageResult<Vec<Vec<String>>> {
        let dir = self.prefix_to_dir(prefix);
        debug!(path = %dir.display(), "Listing storage");

        let mut results = Vec::new();

        match fs::read_dir(&dir).await {
            Ok(mut entries) => {
                while let Some(entry) = entries.next_entry().await? {
                    let name = entry.file_name();
                    let Some(name) = name.to_str() else {
                        continue;
                    };

                    // Only .json values; dot files are in-flight temp files
                    if name.starts_with('.') {
                        continue;
                    }
                    if let Some(component) = name.strip_suffix(".json") {
                        let mut key: Vec<String> = prefix.iter().map(|s| s.to_string()).collect();
                        key.push(component.to_string());
                        results.push(key);
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Directory doesn't exist, return empty list
            }
            Err(e) => return Err(StorageError::Io(e)),
        }

        Ok(results)
    }

    async fn exists(&self, key: &[&str]) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
    struct TestData {
        name: String,
        value: i32,
    }

    fn data(value: i32) -> TestData {
        TestData {
            name: "test".to_string(),
            value,
        }
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let dir = tempdir().unwrap();
        let storage = JsonStorage::new(dir.path());

        storage.write(&["test", "data"], &data(42)).await.unwrap();

        let read: Option<TestData> = storage.read(&["test", "data"]).await.unwrap();
        assert_eq!(read, Some(data(42)));
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let dir = tempdir().unwrap();
        let storage = JsonStorage::new(dir.path());

        let read: Option<TestData> = storage.read(&["nonexistent"]).await.unwrap();
        assert_eq!(read, None);
    }

    #[tokio::test]
    async fn test_insert_rejects_existing_key() {
        let dir = tempdir().unwrap();
        let storage = JsonStorage::new(dir.path());

        storage.insert(&["seq", "1"], &data(1)).await.unwrap();
        let err = storage.insert(&["seq", "1"], &data(2)).await.unwrap_err();
        assert!(err.is_already_exists());

        // The original value is untouched
        let read: Option<TestData> = storage.read(&["seq", "1"]).await.unwrap();
        assert_eq!(read, Some(data(1)));
    }

    #[tokio::test]
    async fn test_insert_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let storage = JsonStorage::new(dir.path());

        storage.insert(&["seq", "1"], &data(1)).await.unwrap();
        let _ = storage.insert(&["seq", "1"], &data(2)).await;

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("seq"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_update() {
        let dir = tempdir().unwrap();
        let storage = JsonStorage::new(dir.path());

        storage.write(&["test", "data"], &data(42)).await.unwrap();

        let updated: TestData = storage
            .update(&["test", "data"], |d: &mut TestData| {
                d.value = 100;
            })
            .await
            .unwrap();

        assert_eq!(updated.value, 100);

        let read: Option<TestData> = storage.read(&["test", "data"]).await.unwrap();
        assert_eq!(read.unwrap().value, 100);
    }

    #[tokio::test]
    async fn test_remove() {
        let dir = tempdir().unwrap();
        let storage = JsonStorage::new(dir.path());

        storage.write(&["test", "data"], &data(42)).await.unwrap();
        assert!(storage.exists(&["test", "data"]).await.unwrap());

        storage.remove(&["test", "data"]).await.unwrap();
        assert!(!storage.exists(&["test", "data"]).await.unwrap());

        // Removing again is fine
        storage.remove(&["test", "data"]).await.unwrap();
    }

    #[tokio::test]
    async fn test_list() {
        let dir = tempdir().unwrap();
        let storage = JsonStorage::new(dir.path());

        storage.write(&["project", "item1"], &data(1)).await.unwrap();
        storage.write(&["project", "item2"], &data(2)).await.unwrap();
        storage.insert(&["project", "item3"], &data(3)).await.unwrap();

        let mut items = storage.list(&["project"]).await.unwrap();
        items.sort();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], vec!["project", "item1"]);

        let missing = storage.list(&["nothing"]).await.unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn test_dotted_components_stay_distinct() {
        let dir = tempdir().unwrap();
        let storage = JsonStorage::new(dir.path());

        storage.write(&["docs", "readme.md"], &data(1)).await.unwrap();
        storage.write(&["docs", "readme.txt"], &data(2)).await.unwrap();

        let read: Option<TestData> = storage.read(&["docs", "readme.md"]).await.unwrap();
        assert_eq!(read, Some(data(1)));

        let mut items = storage.list(&["docs"]).await.unwrap();
        items.sort();
        assert_eq!(
            items,
            vec![vec!["docs", "readme.md"], vec!["docs", "readme.txt"]]
        );
    }

    #[tokio::test]
    async fn test_invalid_key() {
        let dir = tempdir().unwrap();
        let storage = JsonStorage::new(dir.path());

        // Empty key
        assert!(storage.write(&[], &data(1)).await.is_err());

        // Path traversal attempt
        assert!(storage
            .write(&["..", "etc", "passwd"], &data(1))
            .await
            .is_err());

        // Slash in component
        assert!(storage.insert(&["path/traversal"], &data(1)).await.is_err());

        // Hidden names collide with temp files
        assert!(storage.write(&[".hidden"], &data(1)).await.is_err());
    }
}
