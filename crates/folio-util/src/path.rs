//! Path utilities.

use std::path::PathBuf;

/// Get the folio configuration directory.
///
/// This follows XDG conventions on Linux/macOS:
/// - `$XDG_CONFIG_HOME/folio` if set
/// - `~/.config/folio` otherwise
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("folio"))
}

/// Get the folio data directory.
///
/// - `$XDG_DATA_HOME/folio` if set
/// - `~/.local/share/folio` otherwise
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("folio"))
}

/// Default directory for the version store.
pub fn default_store_dir() -> Option<PathBuf> {
    data_dir().map(|p| p.join("data"))
}
