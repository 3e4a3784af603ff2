//! Line-level text diffing for folio snapshots.
//!
//! Diffs are structured: an ordered list of lines tagged unchanged, added or
//! removed, from which unified text or a side-by-side view can be derived.
//!
//! # Example
//!
//! ```
//! let result = folio_diff::diff("a\nb\n", "a\nc\n");
//! assert_eq!(result.stats().added, 1);
//! assert_eq!(result.stats().removed, 1);
//! assert_eq!(result.new_text(), "a\nc\n");
//! ```

mod engine;
mod result;
pub mod unified;

pub use engine::{DiffAlgorithm, DiffEngine, DiffOptions};
pub use result::{DiffLine, DiffResult, DiffStats, InlineSegment, LineTag};

/// Diff two texts with the default engine options.
pub fn diff(old: &str, new: &str) -> DiffResult {
    DiffEngine::default().diff(old, new)
}
