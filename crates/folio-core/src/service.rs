//! The versioning service: the public surface over the store and the diff engine.

use crate::config::Config;
use crate::error::{CoreResult, Side};
use folio_diff::{DiffEngine, DiffResult, DiffStats};
use folio_snapshot::{
    Metadata, SnapshotRecord, VersionPage, VersionRef, VersionStore, VersionSummary,
};
use folio_storage::{JsonStorage, Storage};
use folio_util::TimingGuard;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// One metadata key whose value differs between two versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataChange {
    pub key: String,

    /// Value in the first version, absent if the key was added.
    pub before: Option<serde_json::Value>,

    /// Value in the second version, absent if the key was removed.
    pub after: Option<serde_json::Value>,
}

/// A diff together with what it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionComparison {
    pub document_id: String,
    pub a: VersionSummary,
    pub b: VersionSummary,
    pub diff: DiffResult,
    pub stats: DiffStats,

    /// Changed keys, sorted by key.
    pub metadata_changes: Vec<MetadataChange>,
}

/// Per-key differences between two metadata maps.
pub fn metadata_changes(before: &Metadata, after: &Metadata) -> Vec<MetadataChange> {
    let mut keys: Vec<&String> = before.keys().chain(after.keys()).collect();
    keys.sort();
    keys.dedup();

    keys.into_iter()
        .filter_map(|key| {
            let old = before.get(key);
            let new = after.get(key);
            (old != new).then(|| MetadataChange {
                key: key.clone(),
                before: old.cloned(),
                after: new.cloned(),
            })
        })
        .collect()
}

/// The service over the JSON-file store.
pub type JsonVersioningService = VersioningService<JsonStorage>;

/// Document versioning: create, browse, restore and compare snapshots.
pub struct VersioningService<S> {
    store: VersionStore<S>,
    engine: DiffEngine,
}

impl VersioningService<JsonStorage> {
    /// Open the JSON-file store the configuration points at.
    pub fn open(config: &Config) -> CoreResult<Self> {
        let dir = config.store_dir()?;
        debug!(path = %dir.display(), "Opening version store");
        let storage = Arc::new(JsonStorage::new(dir));
        Ok(Self::new(
            VersionStore::new(storage, config.snapshot_config()),
            DiffEngine::new(config.diff_options()),
        ))
    }
}

impl<S: Storage> VersioningService<S> {
    pub fn new(store: VersionStore<S>, engine: DiffEngine) -> Self {
        Self { store, engine }
    }

    /// Service over `storage` with default limits and diff options.
    pub fn with_storage(storage: Arc<S>) -> Self {
        Self::new(
            VersionStore::new(storage, Default::default()),
            DiffEngine::default(),
        )
    }

    pub fn store(&self) -> &VersionStore<S> {
        &self.store
    }

    pub fn engine(&self) -> &DiffEngine {
        &self.engine
    }

    /// Store a new snapshot as the document's next version.
    pub async fn create_version(
        &self,
        document_id: &str,
        content: &str,
        metadata: &Metadata,
        actor_id: &str,
    ) -> CoreResult<SnapshotRecord> {
        let mut timing = TimingGuard::start("create_version", document_id);
        let record = self
            .store
            .create(document_id, content, metadata, actor_id)
            .await?;
        timing.record_version(record.version_number);
        Ok(record)
    }

    /// A page of the document's history, newest first.
    pub async fn get_versions(
        &self,
        document_id: &str,
        offset: usize,
        limit: usize,
    ) -> CoreResult<VersionPage> {
        let _timing = TimingGuard::start("get_versions", document_id);
        let page = self.store.list(document_id, offset, limit).await?;
        debug!(
            document_id,
            offset,
            limit = page.limit,
            returned = page.versions.len(),
            total = page.total,
            "Listed versions"
        );
        Ok(page)
    }

    pub async fn get_version(
        &self,
        document_id: &str,
        version: &VersionRef,
    ) -> CoreResult<SnapshotRecord> {
        let mut timing = TimingGuard::start("get_version", document_id);
        let record = self.store.get(document_id, version).await?;
        timing.record_version(record.version_number);
        Ok(record)
    }

    pub async fn get_latest_version(&self, document_id: &str) -> CoreResult<SnapshotRecord> {
        let mut timing = TimingGuard::start("get_latest_version", document_id);
        let record = self.store.get_latest(document_id).await?;
        timing.record_version(record.version_number);
        Ok(record)
    }

    /// Make an older version current again by appending a copy of it.
    ///
    /// The copy gets the next version number and is attributed to `actor_id`;
    /// nothing in the existing history changes.
    pub async fn restore_version(
        &self,
        document_id: &str,
        version: &VersionRef,
        actor_id: &str,
    ) -> CoreResult<SnapshotRecord> {
        let mut timing = TimingGuard::start("restore_version", document_id);
        let restored = self
            .store
            .create_restored(document_id, version, actor_id)
            .await?;
        timing.record_version(restored.version_number);

        info!(
            document_id,
            source_version = restored.restored_from.as_ref().map(|s| s.version_number),
            version_number = restored.version_number,
            actor_id,
            "Restored version"
        );

        Ok(restored)
    }

    async fn resolve_pair(
        &self,
        document_id: &str,
        a: &VersionRef,
        b: &VersionRef,
    ) -> CoreResult<(SnapshotRecord, SnapshotRecord)> {
        let (a, b) = tokio::join!(self.store.get(document_id, a), self.store.get(document_id, b));
        let a = a.map_err(|e| crate::CoreError::from(e).on_side(Side::A))?;
        let b = b.map_err(|e| crate::CoreError::from(e).on_side(Side::B))?;
        Ok((a, b))
    }

    /// Line diff turning version `a` into version `b`.
    ///
    /// A missing reference fails with `NotFound` naming the side.
    pub async fn compare_versions(
        &self,
        document_id: &str,
        a: &VersionRef,
        b: &VersionRef,
    ) -> CoreResult<DiffResult> {
        let mut timing = TimingGuard::start("compare_versions", document_id);
        let (a, b) = self.resolve_pair(document_id, a, b).await?;
        timing.record_version(a.version_number);
        timing.record_version(b.version_number);
        Ok(self.engine.diff(&a.content, &b.content))
    }

    /// Like [`compare_versions`](Self::compare_versions), with both version
    /// headers, line statistics and metadata changes.
    pub async fn compare_versions_detailed(
        &self,
        document_id: &str,
        a: &VersionRef,
        b: &VersionRef,
    ) -> CoreResult<VersionComparison> {
        let mut timing = TimingGuard::start("compare_versions_detailed", document_id);
        let (a, b) = self.resolve_pair(document_id, a, b).await?;
        timing.record_version(a.version_number);
        timing.record_version(b.version_number);
        let diff = self.engine.diff(&a.content, &b.content);

        Ok(VersionComparison {
            document_id: document_id.to_string(),
            stats: diff.stats(),
            metadata_changes: metadata_changes(&a.metadata, &b.metadata),
            a: a.summary(),
            b: b.summary(),
            diff,
        })
    }

    /// Render a comparison as unified diff text, labelled `<document>@<version>`.
    pub fn unified(&self, comparison: &VersionComparison) -> String {
        self.engine.unified(
            &comparison.diff,
            &format!("{}@{}", comparison.document_id, comparison.a.version_number),
            &format!("{}@{}", comparison.document_id, comparison.b.version_number),
        )
    }

    /// Permanently remove one version. Its number is never reissued.
    pub async fn delete_version(&self, document_id: &str, version: &VersionRef) -> CoreResult<()> {
        let _timing = TimingGuard::start("delete_version", document_id);
        Ok(self.store.delete(document_id, version).await?)
    }

    /// Number of versions currently retrievable.
    pub async fn count_versions(&self, document_id: &str) -> CoreResult<u64> {
        Ok(self.store.count(document_id).await?)
    }
}
