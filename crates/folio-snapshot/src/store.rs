//! Snapshot storage implementation.

use crate::sequence::{Reservation, SequenceAllocator};
use crate::validate::{validate_actor_id, validate_document_id, validate_new_snapshot};
use crate::{
    Metadata, RestoredFrom, SnapshotError, SnapshotId, SnapshotRecord, SnapshotResult, VersionRef,
};
use folio_storage::Storage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Configuration for the version store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Page size used when a listing asks for zero items.
    pub default_page_size: usize,

    /// Upper bound on a listing page.
    pub max_page_size: usize,

    /// Largest accepted content, in bytes.
    pub max_content_bytes: usize,

    /// Largest accepted serialized metadata, in bytes.
    pub max_metadata_bytes: usize,

    /// Version numbers tried before giving up with a conflict.
    pub max_allocation_attempts: u32,

    /// Whether a snapshot may have empty content.
    pub allow_empty_content: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
            max_content_bytes: 1024 * 1024,
            max_metadata_bytes: 64 * 1024,
            max_allocation_attempts: 5,
            allow_empty_content: false,
        }
    }
}

impl SnapshotConfig {
    /// Effective page size for a requested limit.
    pub fn clamp_limit(&self, limit: usize) -> usize {
        let limit = if limit == 0 {
            self.default_page_size
        } else {
            limit
        };
        limit.clamp(1, self.max_page_size.max(1))
    }
}

/// One page of a document's history, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionPage {
    pub versions: Vec<SnapshotRecord>,

    /// Live snapshots of the document.
    pub total: u64,

    pub offset: usize,

    /// Effective limit after clamping.
    pub limit: usize,
}

/// Locates a snapshot from its id alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Locator {
    document_id: String,
    version_number: u64,
}

/// Persistent, append-only store of document snapshots.
///
/// Layout within the backing [`Storage`]:
/// ```text
/// snapshots/<document_id>/<version_number:020>   # SnapshotRecord, insert-only
/// ids/<snapshot_id>                              # document + number of an id
/// sequences/<document_id>                        # last allocated number
/// ```
pub struct VersionStore<S> {
    storage: Arc<S>,
    sequences: SequenceAllocator<S>,
    config: SnapshotConfig,
}

fn record_key<'a>(document_id: &'a str, number: &'a str) -> [&'a str; 3] {
    ["snapshots", document_id, number]
}

fn number_component(version_number: u64) -> String {
    format!("{:020}", version_number)
}

fn id_key(id: &SnapshotId) -> [&str; 2] {
    ["ids", id.as_str()]
}

impl<S: Storage> VersionStore<S> {
    pub fn new(storage: Arc<S>, config: SnapshotConfig) -> Self {
        let sequences = SequenceAllocator::new(storage.clone(), config.max_allocation_attempts);
        Self {
            storage,
            sequences,
            config,
        }
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn sequences(&self) -> &SequenceAllocator<S> {
        &self.sequences
    }

    /// Append a new snapshot to a document's history.
    pub async fn create(
        &self,
        document_id: &str,
        content: &str,
        metadata: &Metadata,
        created_by: &str,
    ) -> SnapshotResult<SnapshotRecord> {
        validate_new_snapshot(document_id, content, metadata, created_by, &self.config)?;

        let reservation = self.reserve(document_id).await?;
        let record = SnapshotRecord::new(
            document_id,
            reservation.number(),
            content,
            metadata,
            created_by,
            None,
        );
        self.append(reservation, record).await
    }

    /// Append a copy of an existing snapshot as the document's newest one.
    ///
    /// The source is resolved under the document's writer lock, so a
    /// concurrent delete of it either lands first and the restore fails with
    /// `NotFound`, or lands after the copy is stored.
    pub async fn create_restored(
        &self,
        document_id: &str,
        version: &VersionRef,
        created_by: &str,
    ) -> SnapshotResult<SnapshotRecord> {
        validate_document_id(document_id)?;
        validate_actor_id(created_by)?;

        let reservation = self.reserve(document_id).await?;
        let source = self.get(document_id, version).await?;
        let record = SnapshotRecord::new(
            document_id,
            reservation.number(),
            &source.content,
            &source.metadata,
            created_by,
            Some(RestoredFrom {
                id: source.id.clone(),
                version_number: source.version_number,
            }),
        );
        self.append(reservation, record).await
    }

    /// Lock the document and propose its next free number.
    ///
    /// A create dropped after its insert leaves a snapshot the counter does
    /// not cover yet. Its number is skipped here and covered by this
    /// reservation's commit.
    async fn reserve(&self, document_id: &str) -> SnapshotResult<Reservation<'_, S>> {
        let mut reservation = self.sequences.reserve(document_id).await?;
        loop {
            let number = number_component(reservation.number());
            if !self
                .storage
                .exists(&record_key(document_id, &number))
                .await?
            {
                return Ok(reservation);
            }
            reservation.skip();
        }
    }

    /// Store `record` under the reserved number and commit the counter.
    ///
    /// The insert is the commit point. The id locator is written before it,
    /// so a record that exists always resolves by id, even if this future is
    /// dropped before the counter is raised.
    async fn append(
        &self,
        mut reservation: Reservation<'_, S>,
        mut record: SnapshotRecord,
    ) -> SnapshotResult<SnapshotRecord> {
        loop {
            record.version_number = reservation.number();
            self.write_locator(&record).await?;

            let number = number_component(record.version_number);
            match self
                .storage
                .insert(&record_key(&record.document_id, &number), &record)
                .await
            {
                Ok(()) => break,
                Err(e) if e.is_already_exists() => {
                    if let Err(conflict) = reservation.collided() {
                        self.discard(&record, false).await;
                        return Err(conflict);
                    }
                }
                Err(e) => {
                    self.discard(&record, false).await;
                    return Err(e.into());
                }
            }
        }

        // Still under the document lock: a failure here must not leave a
        // record behind for the caller to retry around.
        if let Err(e) = reservation.commit().await {
            self.discard(&record, true).await;
            return Err(e);
        }
        drop(reservation);

        info!(
            document_id = %record.document_id,
            version_number = record.version_number,
            snapshot_id = %record.id,
            restored = record.is_restore(),
            "Created snapshot"
        );

        Ok(record)
    }

    async fn write_locator(&self, record: &SnapshotRecord) -> SnapshotResult<()> {
        let locator = Locator {
            document_id: record.document_id.clone(),
            version_number: record.version_number,
        };
        Ok(self.storage.write(&id_key(&record.id), &locator).await?)
    }

    /// Best-effort removal of what a failed append wrote.
    async fn discard(&self, record: &SnapshotRecord, inserted: bool) {
        let number = number_component(record.version_number);
        let record_key = record_key(&record.document_id, &number);
        let id_key = id_key(&record.id);
        let keys = if inserted {
            vec![&record_key[..], &id_key[..]]
        } else {
            vec![&id_key[..]]
        };
        for key in keys {
            if let Err(e) = self.storage.remove(key).await {
                warn!(
                    document_id = %record.document_id,
                    version_number = record.version_number,
                    error = %e,
                    "Failed to roll back snapshot"
                );
            }
        }
    }

    /// Version numbers of the document's live snapshots, newest first.
    async fn live_numbers(&self, document_id: &str) -> SnapshotResult<Vec<u64>> {
        let keys = self.storage.list(&["snapshots", document_id]).await?;
        let mut numbers: Vec<u64> = keys
            .iter()
            .filter_map(|key| key.last().and_then(|n| n.parse().ok()))
            .collect();
        numbers.sort_unstable_by(|a, b| b.cmp(a));
        Ok(numbers)
    }

    async fn read_number(
        &self,
        document_id: &str,
        version_number: u64,
    ) -> SnapshotResult<Option<SnapshotRecord>> {
        let number = number_component(version_number);
        Ok(self
            .storage
            .read(&record_key(document_id, &number))
            .await?)
    }

    /// List a page of snapshots, newest first.
    ///
    /// `limit` is clamped to the configured maximum; an offset past the end
    /// yields an empty page.
    pub async fn list(
        &self,
        document_id: &str,
        offset: usize,
        limit: usize,
    ) -> SnapshotResult<VersionPage> {
        validate_document_id(document_id)?;
        let limit = self.config.clamp_limit(limit);
        let numbers = self.live_numbers(document_id).await?;

        let mut versions = Vec::with_capacity(limit);
        for number in numbers.iter().skip(offset).take(limit) {
            match self.read_number(document_id, *number).await? {
                Some(record) => versions.push(record),
                // Deleted between listing and reading
                None => debug!(document_id, number, "Snapshot vanished during listing"),
            }
        }

        Ok(VersionPage {
            versions,
            total: numbers.len() as u64,
            offset,
            limit,
        })
    }

    /// Get a snapshot of a document by id or number.
    ///
    /// An id that belongs to another document is reported as not found.
    pub async fn get(
        &self,
        document_id: &str,
        version: &VersionRef,
    ) -> SnapshotResult<SnapshotRecord> {
        validate_document_id(document_id)?;
        let not_found = || SnapshotError::not_found(document_id, version);

        let version_number = match version {
            VersionRef::Number(n) => *n,
            VersionRef::Id(id) => {
                let locator: Locator = self
                    .storage
                    .read(&id_key(id))
                    .await?
                    .ok_or_else(not_found)?;
                if locator.document_id != document_id {
                    debug!(
                        document_id,
                        snapshot_id = %id,
                        owner = %locator.document_id,
                        "Snapshot belongs to another document"
                    );
                    return Err(not_found());
                }
                locator.version_number
            }
        };

        let record = self
            .read_number(document_id, version_number)
            .await?
            .ok_or_else(not_found)?;

        if let VersionRef::Id(id) = version {
            if &record.id != id {
                return Err(not_found());
            }
        }

        Ok(record)
    }

    /// Get the newest live snapshot of a document.
    pub async fn get_latest(&self, document_id: &str) -> SnapshotResult<SnapshotRecord> {
        validate_document_id(document_id)?;
        for number in self.live_numbers(document_id).await? {
            if let Some(record) = self.read_number(document_id, number).await? {
                return Ok(record);
            }
        }
        Err(SnapshotError::not_found(document_id, "latest"))
    }

    /// Number of live snapshots of a document.
    pub async fn count(&self, document_id: &str) -> SnapshotResult<u64> {
        validate_document_id(document_id)?;
        Ok(self.live_numbers(document_id).await?.len() as u64)
    }

    /// Highest version number ever issued for a document, deleted ones included.
    ///
    /// Covers snapshots whose create stopped before committing the counter.
    pub async fn last_allocated(&self, document_id: &str) -> SnapshotResult<u64> {
        validate_document_id(document_id)?;
        let committed = self.sequences.last_allocated(document_id).await?;
        let stored = self
            .live_numbers(document_id)
            .await?
            .first()
            .copied()
            .unwrap_or(0);
        Ok(committed.max(stored))
    }

    /// Hard-delete one snapshot.
    ///
    /// Surviving snapshots keep their numbers and the deleted number is never
    /// issued again.
    pub async fn delete(&self, document_id: &str, version: &VersionRef) -> SnapshotResult<()> {
        validate_document_id(document_id)?;
        let _guard = self.sequences.lock(document_id).await;

        let record = self.get(document_id, version).await?;
        let number = number_component(record.version_number);

        // The counter must cover this number before the record disappears.
        self.sequences
            .raise_to(document_id, record.version_number)
            .await?;
        self.storage
            .remove(&record_key(document_id, &number))
            .await?;
        self.storage.remove(&id_key(&record.id)).await?;

        info!(
            document_id,
            version_number = record.version_number,
            snapshot_id = %record.id,
            "Deleted snapshot"
        );

        Ok(())
    }

    /// Whether the document has any recorded history.
    pub async fn has_history(&self, document_id: &str) -> SnapshotResult<bool> {
        Ok(self.last_allocated(document_id).await? > 0)
    }
}
