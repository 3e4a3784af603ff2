//! Append-only snapshot store for folio documents.
//!
//! Every document owns an ordered history of immutable snapshots. Version
//! numbers start at 1, grow by one per stored snapshot and are never reused,
//! even after a snapshot is deleted.
//!
//! # Example
//!
//! ```no_run
//! use folio_snapshot::{Metadata, SnapshotConfig, VersionRef, VersionStore};
//! use folio_storage::JsonStorage;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = VersionStore::new(
//!     Arc::new(JsonStorage::new(".folio/data")),
//!     SnapshotConfig::default(),
//! );
//!
//! let v1 = store
//!     .create("doc_readme", "# Title\n", &Metadata::new(), "alice")
//!     .await?;
//! assert_eq!(v1.version_number, 1);
//!
//! let same = store.get("doc_readme", &VersionRef::Number(1)).await?;
//! assert_eq!(same.id, v1.id);
//! # Ok(())
//! # }
//! ```

mod error;
mod sequence;
mod snapshot;
mod store;
pub mod validate;

pub use error::{SnapshotError, SnapshotResult};
pub use sequence::{Reservation, SequenceAllocator, SequenceState};
pub use snapshot::{Metadata, RestoredFrom, SnapshotId, SnapshotRecord, VersionRef, VersionSummary};
pub use store::{SnapshotConfig, VersionPage, VersionStore};
