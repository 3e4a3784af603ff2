//! ULID-based identifier generation with prefixes.
//!
//! Identifiers in folio follow the pattern: `prefix_ulid`
//! For example: `snp_01hqxyz...` for snapshots.

use ulid::Ulid;

/// Known identifier prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPrefix {
    Snapshot,
}

impl IdPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdPrefix::Snapshot => "snp",
        }
    }
}

/// Identifier generation.
pub struct Identifier;

impl Identifier {
    /// Generate a new ascending identifier (newer = larger).
    pub fn ascending(prefix: IdPrefix) -> String {
        format!("{}_{}", prefix.as_str(), Ulid::new().to_string().to_lowercase())
    }

    /// Generate a snapshot ID (ascending, so ids sort by creation time).
    pub fn snapshot() -> String {
        Self::ascending(IdPrefix::Snapshot)
    }
}
