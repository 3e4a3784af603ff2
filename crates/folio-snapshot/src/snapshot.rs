//! Snapshot data structures.

use chrono::{DateTime, Utc};
use folio_util::Identifier;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Opaque metadata stored verbatim with a snapshot.
pub type Metadata = HashMap<String, serde_json::Value>;

/// Unique identifier for a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(pub String);

impl SnapshotId {
    /// Create a new snapshot ID. IDs sort by creation time.
    pub fn new() -> Self {
        Self(Identifier::snapshot())
    }

    /// Create a snapshot ID from a string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SnapshotId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Addresses one snapshot of a document, by id or by version number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionRef {
    Id(SnapshotId),
    Number(u64),
}

impl VersionRef {
    /// All-digit strings are version numbers, anything else is an id.
    pub fn parse(s: &str) -> Self {
        match s.parse::<u64>() {
            Ok(n) if s.bytes().all(|b| b.is_ascii_digit()) => Self::Number(n),
            _ => Self::Id(SnapshotId::from_string(s)),
        }
    }
}

impl FromStr for VersionRef {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl std::fmt::Display for VersionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionRef::Id(id) => write!(f, "{}", id),
            VersionRef::Number(n) => write!(f, "#{}", n),
        }
    }
}

impl From<SnapshotId> for VersionRef {
    fn from(id: SnapshotId) -> Self {
        Self::Id(id)
    }
}

impl From<&SnapshotId> for VersionRef {
    fn from(id: &SnapshotId) -> Self {
        Self::Id(id.clone())
    }
}

impl From<u64> for VersionRef {
    fn from(n: u64) -> Self {
        Self::Number(n)
    }
}

impl From<&SnapshotRecord> for VersionRef {
    fn from(record: &SnapshotRecord) -> Self {
        Self::Id(record.id.clone())
    }
}

/// Where a restored snapshot's content came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoredFrom {
    pub id: SnapshotId,
    pub version_number: u64,
}

/// One immutable version of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Unique identifier for this snapshot.
    pub id: SnapshotId,

    /// The document this snapshot belongs to.
    pub document_id: String,

    /// Position in the document's history, starting at 1.
    pub version_number: u64,

    /// Full text of the document at this version.
    pub content: String,

    /// Caller-supplied metadata, never interpreted.
    #[serde(default)]
    pub metadata: Metadata,

    /// Actor who produced this snapshot.
    pub created_by: String,

    /// When the snapshot was stored.
    pub created_at: DateTime<Utc>,

    /// Set when this snapshot was produced by a restore.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restored_from: Option<RestoredFrom>,
}

impl SnapshotRecord {
    pub(crate) fn new(
        document_id: &str,
        version_number: u64,
        content: &str,
        metadata: &Metadata,
        created_by: &str,
        restored_from: Option<RestoredFrom>,
    ) -> Self {
        Self {
            id: SnapshotId::new(),
            document_id: document_id.to_string(),
            version_number,
            content: content.to_string(),
            metadata: metadata.clone(),
            created_by: created_by.to_string(),
            created_at: Utc::now(),
            restored_from,
        }
    }

    /// Whether this snapshot was produced by a restore.
    pub fn is_restore(&self) -> bool {
        self.restored_from.is_some()
    }

    /// A content-free view for listings and comparisons.
    pub fn summary(&self) -> VersionSummary {
        VersionSummary {
            id: self.id.clone(),
            version_number: self.version_number,
            created_by: self.created_by.clone(),
            created_at: self.created_at,
            content_bytes: self.content.len(),
            restored_from: self.restored_from.clone(),
        }
    }
}

/// Snapshot header without content or metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSummary {
    pub id: SnapshotId,
    pub version_number: u64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub content_bytes: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restored_from: Option<RestoredFrom>,
}
