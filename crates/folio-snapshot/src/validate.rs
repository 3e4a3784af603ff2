//! Input validation, run before any version number is allocated.

use crate::{Metadata, SnapshotConfig, SnapshotError, SnapshotResult};

/// Identifiers end up as storage key components.
fn validate_identifier(kind: &str, value: &str) -> SnapshotResult<()> {
    if value.trim().is_empty() {
        return Err(SnapshotError::validation(format!("{kind} cannot be empty")));
    }
    if value.contains('/') || value.contains('\\') || value.starts_with('.') {
        return Err(SnapshotError::validation(format!(
            "{kind} contains reserved characters: {value:?}"
        )));
    }
    Ok(())
}

pub fn validate_document_id(document_id: &str) -> SnapshotResult<()> {
    validate_identifier("document id", document_id)
}

pub fn validate_actor_id(actor_id: &str) -> SnapshotResult<()> {
    if actor_id.trim().is_empty() {
        return Err(SnapshotError::validation("actor id cannot be empty"));
    }
    Ok(())
}

pub fn validate_content(content: &str, config: &SnapshotConfig) -> SnapshotResult<()> {
    if content.is_empty() && !config.allow_empty_content {
        return Err(SnapshotError::validation("content cannot be empty"));
    }
    if content.len() > config.max_content_bytes {
        return Err(SnapshotError::validation(format!(
            "content is {} bytes, limit is {}",
            content.len(),
            config.max_content_bytes
        )));
    }
    Ok(())
}

pub fn validate_metadata(metadata: &Metadata, config: &SnapshotConfig) -> SnapshotResult<()> {
    if metadata.keys().any(|k| k.trim().is_empty()) {
        return Err(SnapshotError::validation("metadata keys cannot be empty"));
    }

    let size = serde_json::to_vec(metadata)
        .map_err(|e| SnapshotError::validation(format!("metadata is not serializable: {e}")))?
        .len();
    if size > config.max_metadata_bytes {
        return Err(SnapshotError::validation(format!(
            "metadata is {} bytes, limit is {}",
            size, config.max_metadata_bytes
        )));
    }
    Ok(())
}

/// Validate everything a new snapshot needs.
pub fn validate_new_snapshot(
    document_id: &str,
    content: &str,
    metadata: &Metadata,
    created_by: &str,
    config: &SnapshotConfig,
) -> SnapshotResult<()> {
    validate_document_id(document_id)?;
    validate_actor_id(created_by)?;
    validate_content(content, config)?;
    validate_metadata(metadata, config)
}
