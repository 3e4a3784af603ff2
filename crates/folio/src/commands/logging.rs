//! Logging initialization.
//!
//! Logs go to stderr so command output on stdout stays machine-readable.

use folio_core::config::LogLevel;
use folio_util::log::{self, LogConfig};

/// Initialize logging from the `--verbose` flag and the configured level.
///
/// Without either, only warnings and errors are printed.
pub fn init_logging(verbose: bool, configured: Option<LogLevel>) {
    let level = if verbose {
        log::LogLevel::Debug
    } else {
        configured.map(Into::into).unwrap_or(log::LogLevel::Warn)
    };

    log::init(LogConfig {
        print: true,
        level,
        include_location: verbose,
    });
}
