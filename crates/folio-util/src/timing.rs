//! Duration logging for versioning operations.
//!
//! A [`TimingGuard`] is created at the top of an operation on a document and
//! logs how long the operation took when it goes out of scope, together with
//! the document and the version numbers the operation touched.
//!
//! # Example
//!
//! ```rust,ignore
//! use folio_util::timing::TimingGuard;
//!
//! async fn restore(document_id: &str) {
//!     let mut timing = TimingGuard::start("restore_version", document_id);
//!     let record = append_copy(document_id).await?;
//!     timing.record_version(record.version_number);
//! }
//! ```

use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Operations slower than this are logged at warn.
pub const SLOW_OPERATION: Duration = Duration::from_millis(250);

/// Logs the duration of one operation on a document when dropped.
pub struct TimingGuard {
    operation: &'static str,
    document_id: String,
    versions: Vec<u64>,
    start: Instant,
    slow: Duration,
}

impl TimingGuard {
    pub fn start(operation: &'static str, document_id: impl Into<String>) -> Self {
        Self {
            operation,
            document_id: document_id.into(),
            versions: Vec::new(),
            start: Instant::now(),
            slow: SLOW_OPERATION,
        }
    }

    /// Override the slow-operation threshold.
    pub fn with_slow_threshold(mut self, slow: Duration) -> Self {
        self.slow = slow;
        self
    }

    /// Attach a version number the operation produced or resolved.
    pub fn record_version(&mut self, version_number: u64) {
        self.versions.push(version_number);
    }

    pub fn versions(&self) -> &[u64] {
        &self.versions
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Whether the operation has already run past the slow threshold.
    pub fn is_slow(&self) -> bool {
        self.elapsed() >= self.slow
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        let elapsed = self.elapsed();
        let duration_ms = elapsed.as_millis() as u64;

        if elapsed >= self.slow {
            warn!(
                operation = self.operation,
                document_id = %self.document_id,
                versions = ?self.versions,
                duration_ms,
                "Slow versioning operation"
            );
        } else {
            debug!(
                operation = self.operation,
                document_id = %self.document_id,
                versions = ?self.versions,
                duration_ms,
                "Versioning operation finished"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_records_versions_in_order() {
        let mut guard = TimingGuard::start("compare_versions", "doc_1");
        guard.record_version(3);
        guard.record_version(1);
        assert_eq!(guard.versions(), &[3, 1]);
    }

    #[test]
    fn test_slow_threshold() {
        let guard = TimingGuard::start("create_version", "doc_1")
            .with_slow_threshold(Duration::from_millis(5));
        sleep(Duration::from_millis(10));
        assert!(guard.is_slow());
    }

    #[test]
    fn test_default_threshold_not_hit_by_fast_operation() {
        let guard = TimingGuard::start("get_version", "doc_1");
        assert!(guard.elapsed() < SLOW_OPERATION);
        assert!(!guard.is_slow());
    }
}
