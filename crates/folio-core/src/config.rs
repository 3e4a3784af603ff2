//! Configuration management for folio.
//!
//! Configuration is loaded from multiple sources and merged:
//! 1. Global config: `~/.config/folio/config.json` (or `config.jsonc`)
//! 2. Environment variable: `FOLIO_CONFIG_CONTENT`
//! 3. Project config: `folio.json` or `folio.jsonc` in the project directory
//! 4. Environment overrides: `FOLIO_DATA_DIR`, `FOLIO_LOG_LEVEL`
//!
//! Supports JSONC (JSON with comments) and `{env:VAR_NAME}` substitution.

use crate::error::{ConfigError, CoreResult};
use folio_diff::{DiffAlgorithm, DiffOptions};
use folio_snapshot::SnapshotConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Static regex for variable substitution, compiled once.
static VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

fn var_regex() -> &'static regex::Regex {
    VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\{env:([^}]+)\}")
            .expect("Invalid regex pattern - this is a compile-time constant")
    })
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSON Schema reference.
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Directory holding the version store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Log level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,

    /// Version store limits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versioning: Option<VersioningConfig>,

    /// Diff engine settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<DiffConfig>,
}

/// Log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for folio_util::log::LogLevel {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::Trace,
            LogLevel::Debug => Self::Debug,
            LogLevel::Info => Self::Info,
            LogLevel::Warn => Self::Warn,
            LogLevel::Error => Self::Error,
        }
    }
}

/// Version store limits. Unset fields fall back to [`SnapshotConfig`] defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersioningConfig {
    /// Page size when a listing asks for zero items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_page_size: Option<usize>,

    /// Largest page a listing returns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_page_size: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_content_bytes: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_metadata_bytes: Option<usize>,

    /// Version numbers tried before reporting a conflict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_allocation_retries: Option<u32>,
}

impl VersioningConfig {
    /// Merge with another VersioningConfig, preferring values from other if present.
    pub fn merge(self, other: Self) -> Self {
        Self {
            default_page_size: other.default_page_size.or(self.default_page_size),
            max_page_size: other.max_page_size.or(self.max_page_size),
            max_content_bytes: other.max_content_bytes.or(self.max_content_bytes),
            max_metadata_bytes: other.max_metadata_bytes.or(self.max_metadata_bytes),
            max_allocation_retries: other.max_allocation_retries.or(self.max_allocation_retries),
        }
    }

    /// Resolve against the store defaults.
    pub fn snapshot_config(&self) -> SnapshotConfig {
        let defaults = SnapshotConfig::default();
        SnapshotConfig {
            default_page_size: self.default_page_size.unwrap_or(defaults.default_page_size),
            max_page_size: self.max_page_size.unwrap_or(defaults.max_page_size),
            max_content_bytes: self.max_content_bytes.unwrap_or(defaults.max_content_bytes),
            max_metadata_bytes: self
                .max_metadata_bytes
                .unwrap_or(defaults.max_metadata_bytes),
            max_allocation_attempts: self
                .max_allocation_retries
                .unwrap_or(defaults.max_allocation_attempts),
            allow_empty_content: defaults.allow_empty_content,
        }
    }
}

/// Diff engine settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<DiffAlgorithm>,

    /// Unchanged lines shown around each hunk of unified output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_lines: Option<usize>,
}

impl DiffConfig {
    pub fn merge(self, other: Self) -> Self {
        Self {
            algorithm: other.algorithm.or(self.algorithm),
            context_lines: other.context_lines.or(self.context_lines),
        }
    }

    pub fn diff_options(&self) -> DiffOptions {
        let defaults = DiffOptions::default();
        DiffOptions {
            algorithm: self.algorithm.unwrap_or(defaults.algorithm),
            context_lines: self.context_lines.unwrap_or(defaults.context_lines),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Loading order (later sources override earlier):
    /// 1. Global config from `~/.config/folio/`
    /// 2. `FOLIO_CONFIG_CONTENT` environment variable
    /// 3. Project config from `project_dir`
    /// 4. `FOLIO_DATA_DIR` / `FOLIO_LOG_LEVEL`
    pub async fn load(project_dir: Option<&Path>) -> CoreResult<(Self, Vec<PathBuf>)> {
        let mut config = Config::default();
        let mut sources = Vec::new();

        if let Some(global_dir) = Self::global_config_dir() {
            if let Some(path) = Self::find_file(&global_dir, &["config.jsonc", "config.json"]) {
                config = config.merge(Self::load_file(&path).await?);
                sources.push(path);
            }
        }

        if let Ok(content) = std::env::var("FOLIO_CONFIG_CONTENT") {
            let content = Self::substitute_variables(&content)?;
            config = config.merge(Self::parse_jsonc(&content, "<env>")?);
        }

        if let Some(dir) = project_dir {
            if let Some(path) = Self::find_file(dir, &["folio.jsonc", "folio.json"]) {
                config = config.merge(Self::load_file(&path).await?);
                sources.push(path);
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok((config, sources))
    }

    fn find_file(dir: &Path, names: &[&str]) -> Option<PathBuf> {
        names.iter().map(|name| dir.join(name)).find(|p| p.exists())
    }

    /// Get the global config directory.
    pub fn global_config_dir() -> Option<PathBuf> {
        folio_util::path::config_dir()
    }

    /// Load configuration from a file.
    pub async fn load_file(path: &Path) -> CoreResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
        let content = Self::substitute_variables(&content)?;
        Self::parse_jsonc(&content, &path.display().to_string())
    }

    fn apply_env_overrides(&mut self) -> CoreResult<()> {
        if let Ok(dir) = std::env::var("FOLIO_DATA_DIR") {
            if !dir.is_empty() {
                self.data_dir = Some(PathBuf::from(dir));
            }
        }
        if let Ok(level) = std::env::var("FOLIO_LOG_LEVEL") {
            let parsed = serde_json::from_value(serde_json::Value::String(level.to_lowercase()))
                .map_err(|_| ConfigError::Validation {
                    message: format!("FOLIO_LOG_LEVEL has unknown level {level:?}"),
                })?;
            self.log_level = Some(parsed);
        }
        Ok(())
    }

    /// Reject settings the store cannot work with.
    pub fn validate(&self) -> CoreResult<()> {
        let store = self.snapshot_config();
        if store.max_page_size == 0 {
            return Err(ConfigError::Validation {
                message: "versioning.max_page_size must be at least 1".to_string(),
            }
            .into());
        }
        if store.default_page_size == 0 || store.default_page_size > store.max_page_size {
            return Err(ConfigError::Validation {
                message: format!(
                    "versioning.default_page_size must be between 1 and {}",
                    store.max_page_size
                ),
            }
            .into());
        }
        if store.max_allocation_attempts == 0 {
            return Err(ConfigError::Validation {
                message: "versioning.max_allocation_retries must be at least 1".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Parse JSONC (JSON with comments).
    fn parse_jsonc(content: &str, source: &str) -> CoreResult<Self> {
        let stripped = Self::strip_comments(content);

        serde_json::from_str(&stripped).map_err(|e| {
            ConfigError::InvalidJson {
                path: source.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Strip `//` and `/* */` comments outside of strings.
    fn strip_comments(input: &str) -> String {
        let mut result = String::with_capacity(input.len());
        let mut chars = input.chars().peekable();
        let mut in_string = false;
        let mut escape_next = false;

        while let Some(c) = chars.next() {
            if escape_next {
                result.push(c);
                escape_next = false;
                continue;
            }

            if in_string {
                match c {
                    '\\' => escape_next = true,
                    '"' => in_string = false,
                    _ => {}
                }
                result.push(c);
                continue;
            }

            let next = chars.peek().copied();
            match (c, next) {
                ('"', _) => {
                    in_string = true;
                    result.push(c);
                }
                ('/', Some('/')) => {
                    for c in chars.by_ref() {
                        if c == '\n' {
                            result.push('\n');
                            break;
                        }
                    }
                }
                ('/', Some('*')) => {
                    chars.next();
                    let mut prev = ' ';
                    for c in chars.by_ref() {
                        if prev == '*' && c == '/' {
                            break;
                        }
                        // Keep line numbers stable for parse errors
                        if c == '\n' {
                            result.push('\n');
                        }
                        prev = c;
                    }
                }
                _ => result.push(c),
            }
        }

        result
    }

    /// Substitute `{env:VAR_NAME}` references.
    fn substitute_variables(content: &str) -> CoreResult<String> {
        let mut missing = None;
        let result = var_regex().replace_all(content, |cap: &regex::Captures<'_>| {
            let name = &cap[1];
            match std::env::var(name) {
                Ok(value) => value,
                Err(_) => {
                    missing = Some(name.to_string());
                    String::new()
                }
            }
        });

        if let Some(name) = missing {
            return Err(ConfigError::EnvVarNotFound { name }.into());
        }
        Ok(result.into_owned())
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(mut self, other: Self) -> Self {
        if other.schema.is_some() {
            self.schema = other.schema;
        }
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }
        self.versioning = merge_nested(self.versioning, other.versioning, VersioningConfig::merge);
        self.diff = merge_nested(self.diff, other.diff, DiffConfig::merge);
        self
    }

    /// Effective version store settings.
    pub fn snapshot_config(&self) -> SnapshotConfig {
        self.versioning.clone().unwrap_or_default().snapshot_config()
    }

    /// Effective diff engine settings.
    pub fn diff_options(&self) -> DiffOptions {
        self.diff.clone().unwrap_or_default().diff_options()
    }

    /// Store directory: configured, else the platform default.
    pub fn store_dir(&self) -> CoreResult<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => folio_util::path::default_store_dir().ok_or_else(|| {
                ConfigError::InvalidPath("Could not determine data directory".to_string()).into()
            }),
        }
    }
}

fn merge_nested<T>(base: Option<T>, other: Option<T>, merge: fn(T, T) -> T) -> Option<T> {
    match (base, other) {
        (Some(b), Some(o)) => Some(merge(b, o)),
        (b, None) => b,
        (None, o) => o,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_comments() {
        let input = r#"{
            // Line comment
            "data_dir": "/tmp/folio", // trailing comment
            /* block comment */
            "key2": "val/*not a comment*/ue",
            "url": "http://example.com"
        }"#;

        let result = Config::strip_comments(input);
        assert!(!result.contains("Line comment"));
        assert!(!result.contains("trailing comment"));
        assert!(!result.contains("block comment"));
        assert!(result.contains("val/*not a comment*/ue"));
        assert!(result.contains("http://example.com"));
    }

    #[test]
    fn test_parse_jsonc() {
        let input = r#"{
            // This is a comment
            "log_level": "debug",
            "versioning": { "max_page_size": 50 },
            "diff": { "algorithm": "patience" }
        }"#;

        let config = Config::parse_jsonc(input, "test").unwrap();
        assert_eq!(config.log_level, Some(LogLevel::Debug));
        assert_eq!(config.snapshot_config().max_page_size, 50);
        assert_eq!(config.snapshot_config().default_page_size, 10);
        assert_eq!(config.diff_options().algorithm, DiffAlgorithm::Patience);
        assert_eq!(config.diff_options().context_lines, 3);
    }

    #[test]
    fn test_invalid_json_names_source() {
        let err = Config::parse_jsonc("{ nope", "folio.json").unwrap_err();
        assert!(err.to_string().contains("folio.json"));
    }

    #[test]
    fn test_merge_config() {
        let base = Config {
            data_dir: Some(PathBuf::from("/global")),
            log_level: Some(LogLevel::Info),
            versioning: Some(VersioningConfig {
                max_page_size: Some(20),
                max_content_bytes: Some(1000),
                ..Default::default()
            }),
            ..Default::default()
        };

        let other = Config {
            log_level: Some(LogLevel::Warn),
            versioning: Some(VersioningConfig {
                max_page_size: Some(40),
                ..Default::default()
            }),
            ..Default::default()
        };

        let merged = base.merge(other);
        assert_eq!(merged.log_level, Some(LogLevel::Warn));
        assert_eq!(merged.data_dir, Some(PathBuf::from("/global")));
        let store = merged.snapshot_config();
        assert_eq!(store.max_page_size, 40);
        assert_eq!(store.max_content_bytes, 1000);
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let config = Config {
            versioning: Some(VersioningConfig {
                max_page_size: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            versioning: Some(VersioningConfig {
                default_page_size: Some(30),
                max_page_size: Some(20),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_missing_env_var_is_an_error() {
        let err = Config::substitute_variables(r#"{"data_dir": "{env:FOLIO_TEST_SURELY_UNSET}"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("FOLIO_TEST_SURELY_UNSET"));
    }

    #[tokio::test]
    async fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio.jsonc");
        tokio::fs::write(
            &path,
            r#"{
                // project store
                "data_dir": "/srv/folio",
                "diff": { "context_lines": 1 }
            }"#,
        )
        .await
        .unwrap();

        let loaded = Config::load_file(&path).await.unwrap();
        assert_eq!(loaded.store_dir().unwrap(), PathBuf::from("/srv/folio"));
        assert_eq!(loaded.diff_options().context_lines, 1);
    }
}
