//! Core versioning logic for folio.
//!
//! This crate ties the snapshot store and the diff engine together:
//! - Configuration management (multi-source, JSONC support)
//! - The [`VersioningService`]: create, list, get, restore, compare and
//!   delete document versions
//! - A single error type with a coarse [`ErrorKind`] for callers

pub mod config;
pub mod error;
pub mod service;

pub use config::Config;
pub use error::{ConfigError, CoreError, CoreResult, ErrorKind, Side};
pub use service::{
    metadata_changes, JsonVersioningService, MetadataChange, VersionComparison, VersioningService,
};

pub use folio_diff::{DiffAlgorithm, DiffLine, DiffOptions, DiffResult, DiffStats, LineTag};
pub use folio_snapshot::{
    Metadata, RestoredFrom, SnapshotConfig, SnapshotId, SnapshotRecord, VersionPage, VersionRef,
    VersionSummary,
};
