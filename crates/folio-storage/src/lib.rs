//! Storage layer for folio.
//!
//! This crate provides a key-value storage abstraction with multiple backends:
//! - JSON file storage (default)
//! - In-memory storage (for testing and embedding)

pub mod error;
pub mod json;
pub mod memory;

pub use error::{StorageError, StorageResult};
pub use json::JsonStorage;
pub use memory::MemoryStorage;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

/// A trait for key-value storage backends.
///
/// Keys are represented as path segments, e.g., `["snapshots", "doc_123", "00000000000000000001"]`.
/// Values are serialized/deserialized as JSON.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read a value from storage.
    ///
    /// Returns `None` if the key doesn't exist.
    async fn read<T: DeserializeOwned + Send>(&self, key: &[&str]) -> StorageResult<Option<T>>;

    /// Write a value to storage, replacing any existing value.
    ///
    /// Readers observe either the old or the new value, never a partial write.
    async fn write<T: Serialize + Send + Sync>(&self, key: &[&str], value: &T)
        -> StorageResult<()>;

    /// Write a value only if the key is absent.
    ///
    /// This is the unique-constraint primitive: returns
    /// [`StorageError::AlreadyExists`] if another writer got there first.
    async fn insert<T: Serialize + Send + Sync>(
        &self,
        key: &[&str],
        value: &T,
    ) -> StorageResult<()>;

    /// Read-modify-write a value.
    ///
    /// The editor function is called with the current value (or default if not exists).
    /// The updated value is written back to storage. Callers that need the
    /// edit to be atomic across writers must serialize access themselves.
    async fn update<T, F>(&self, key: &[&str], editor: F) -> StorageResult<T>
    where
        T: DeserializeOwned + Serialize + Send + Sync + Default,
        F: FnOnce(&mut T) + Send;

    /// Remove a value from storage. Removing a missing key is not an error.
    async fn remove(&self, key: &[&str]) -> StorageResult<()>;

    /// List all keys directly under a prefix.
    ///
    /// Returns the full key paths for each item, in no particular order.
    async fn list(&self, prefix: &[&str]) -> StorageResult<Vec<Vec<String>>>;

    /// Check if a key exists.
    async fn exists(&self, key: &[&str]) -> StorageResult<bool>;
}
