//! Error types for the core crate.

use folio_snapshot::SnapshotError;
use thiserror::Error;

/// Which side of a comparison an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The first (older) reference of a comparison.
    A,
    /// The second (newer) reference of a comparison.
    B,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::A => write!(f, "a"),
            Side::B => write!(f, "b"),
        }
    }
}

/// Coarse classification of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    Storage,
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Validation => "validation",
            ErrorKind::Storage => "storage",
            ErrorKind::Config => "config",
        }
    }
}

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The referenced version does not exist in the document.
    #[error("{}", not_found_message(.document_id, .version, .side))]
    NotFound {
        document_id: String,
        version: String,
        side: Option<Side>,
    },

    /// No version number could be allocated; safe to retry.
    #[error("version conflict on document {document_id} after {attempts} attempts")]
    Conflict { document_id: String, attempts: u32 },

    /// Input rejected before anything was written.
    #[error("validation error: {0}")]
    Validation(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] folio_storage::StorageError),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

fn not_found_message(document_id: &str, version: &str, side: &Option<Side>) -> String {
    match side {
        Some(side) => format!(
            "version {} (side {}) not found in document {}",
            version, side, document_id
        ),
        None => format!("version {} not found in document {}", version, document_id),
    }
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::Conflict { .. } => ErrorKind::Conflict,
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::Storage(_) => ErrorKind::Storage,
            CoreError::Config(_) => ErrorKind::Config,
        }
    }

    /// Only allocation conflicts are worth retrying unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Conflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// The comparison side a not-found error refers to.
    pub fn side(&self) -> Option<Side> {
        match self {
            CoreError::NotFound { side, .. } => *side,
            _ => None,
        }
    }

    /// Attach a comparison side to a not-found error.
    pub(crate) fn on_side(self, side: Side) -> Self {
        match self {
            CoreError::NotFound {
                document_id,
                version,
                ..
            } => CoreError::NotFound {
                document_id,
                version,
                side: Some(side),
            },
            other => other,
        }
    }
}

impl From<SnapshotError> for CoreError {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::NotFound {
                document_id,
                version,
            } => CoreError::NotFound {
                document_id,
                version,
                side: None,
            },
            SnapshotError::Conflict {
                document_id,
                attempts,
            } => CoreError::Conflict {
                document_id,
                attempts,
            },
            SnapshotError::Validation(message) => CoreError::Validation(message),
            SnapshotError::Storage(e) => CoreError::Storage(e),
        }
    }
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid JSON/JSONC syntax.
    #[error("invalid config at {path}: {message}")]
    InvalidJson { path: String, message: String },

    /// Config could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config value rejected.
    #[error("config validation failed: {message}")]
    Validation { message: String },

    /// Environment variable not found during substitution.
    #[error("environment variable not found: {name}")]
    EnvVarNotFound { name: String },

    /// Invalid path (e.g., could not determine config directory).
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
