//! Version command handlers.
//!
//! Handles creating, listing, showing, restoring, comparing and deleting
//! document versions.

use super::Context;
use anyhow::{bail, Context as _};
use folio_core::config::DiffConfig;
use folio_core::{
    DiffResult, JsonVersioningService, LineTag, Metadata, SnapshotRecord, VersionRef,
    VersioningService,
};
use std::io::Read;
use std::path::PathBuf;

/// Output format for `compare`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CompareFormat {
    /// Unified diff text
    Unified,
    /// Numbered lines, changed words in brackets
    Lines,
    /// Full comparison as JSON
    Json,
}

fn open(ctx: &Context) -> anyhow::Result<JsonVersioningService> {
    Ok(VersioningService::open(&ctx.config)?)
}

fn resolve_actor(actor: Option<String>) -> anyhow::Result<String> {
    match actor {
        Some(actor) => Ok(actor),
        None => std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .context("no --actor given and $USER is not set"),
    }
}

/// Parse `key=value` pairs. Values that parse as JSON are stored as JSON,
/// anything else as a string.
fn parse_metadata(pairs: &[String]) -> anyhow::Result<Metadata> {
    let mut metadata = Metadata::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("metadata must be KEY=VALUE, got {pair:?}");
        };
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        metadata.insert(key.to_string(), value);
    }
    Ok(metadata)
}

fn read_content(file: Option<PathBuf>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("failed to read content from stdin")?;
            Ok(content)
        }
    }
}

fn print_header(record: &SnapshotRecord) {
    println!("Version:  {}", record.version_number);
    println!("ID:       {}", record.id);
    println!("Document: {}", record.document_id);
    println!("Author:   {}", record.created_by);
    println!(
        "Created:  {}",
        record.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(source) = &record.restored_from {
        println!("Restored: from version {} ({})", source.version_number, source.id);
    }
    if !record.metadata.is_empty() {
        let mut keys: Vec<_> = record.metadata.keys().collect();
        keys.sort();
        for key in keys {
            println!("Meta:     {} = {}", key, record.metadata[key]);
        }
    }
}

fn print_record(ctx: &Context, record: &SnapshotRecord) -> anyhow::Result<()> {
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(record)?);
    } else {
        print_header(record);
        println!();
        print!("{}", record.content);
        if !record.content.ends_with('\n') {
            println!();
        }
    }
    Ok(())
}

/// Handle `create`.
pub async fn create(
    ctx: &Context,
    document: &str,
    file: Option<PathBuf>,
    actor: Option<String>,
    metadata: &[String],
) -> anyhow::Result<()> {
    let actor = resolve_actor(actor)?;
    let metadata = parse_metadata(metadata)?;
    let content = read_content(file)?;

    let service = open(ctx)?;
    let record = service
        .create_version(document, &content, &metadata, &actor)
        .await?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&record.summary())?);
    } else {
        println!(
            "Created version {} of {} ({})",
            record.version_number, record.document_id, record.id
        );
    }
    Ok(())
}

/// Handle `list`.
pub async fn list(ctx: &Context, document: &str, offset: usize, limit: usize) -> anyhow::Result<()> {
    let service = open(ctx)?;
    let page = service.get_versions(document, offset, limit).await?;

    if ctx.json {
        let summaries: Vec<_> = page.versions.iter().map(|v| v.summary()).collect();
        let value = serde_json::json!({
            "versions": summaries,
            "total": page.total,
            "offset": page.offset,
            "limit": page.limit,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if page.versions.is_empty() {
        println!("No versions found.");
        return Ok(());
    }

    println!(
        "{:<8} {:<32} {:<16} {:<20} {:>8}",
        "VERSION", "ID", "AUTHOR", "CREATED", "BYTES"
    );
    println!("{}", "-".repeat(88));
    for version in &page.versions {
        let author = if version.created_by.len() > 16 {
            format!("{}...", version.created_by.chars().take(13).collect::<String>())
        } else {
            version.created_by.clone()
        };
        let marker = if version.is_restore() { "*" } else { "" };
        println!(
            "{:<8} {:<32} {:<16} {:<20} {:>8}",
            format!("{}{}", version.version_number, marker),
            version.id,
            author,
            version.created_at.format("%Y-%m-%d %H:%M:%S"),
            version.content.len()
        );
    }
    println!();
    println!(
        "Showing {}-{} of {} (* = restored)",
        page.offset + 1,
        page.offset + page.versions.len(),
        page.total
    );
    Ok(())
}

/// Handle `show`.
pub async fn show(ctx: &Context, document: &str, version: &str) -> anyhow::Result<()> {
    let service = open(ctx)?;
    let record = service
        .get_version(document, &VersionRef::parse(version))
        .await?;
    print_record(ctx, &record)
}

/// Handle `latest`.
pub async fn latest(ctx: &Context, document: &str) -> anyhow::Result<()> {
    let service = open(ctx)?;
    let record = service.get_latest_version(document).await?;
    print_record(ctx, &record)
}

/// Handle `restore`.
pub async fn restore(
    ctx: &Context,
    document: &str,
    version: &str,
    actor: Option<String>,
) -> anyhow::Result<()> {
    let actor = resolve_actor(actor)?;
    let service = open(ctx)?;
    let record = service
        .restore_version(document, &VersionRef::parse(version), &actor)
        .await?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&record.summary())?);
    } else {
        let source = record
            .restored_from
            .as_ref()
            .map(|s| s.version_number.to_string())
            .unwrap_or_else(|| version.to_string());
        println!(
            "Restored version {} of {} as version {} ({})",
            source, record.document_id, record.version_number, record.id
        );
    }
    Ok(())
}

/// Handle `compare`.
pub async fn compare(
    ctx: &Context,
    document: &str,
    a: &str,
    b: &str,
    format: CompareFormat,
    context: Option<usize>,
) -> anyhow::Result<()> {
    let mut config = ctx.config.clone();
    if let Some(lines) = context {
        let flag = DiffConfig {
            algorithm: None,
            context_lines: Some(lines),
        };
        config.diff = Some(config.diff.unwrap_or_default().merge(flag));
    }
    let service = VersioningService::open(&config)?;

    let comparison = service
        .compare_versions_detailed(document, &VersionRef::parse(a), &VersionRef::parse(b))
        .await?;

    match format {
        CompareFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&comparison)?);
        }
        CompareFormat::Unified => {
            print!("{}", service.unified(&comparison));
            for change in &comparison.metadata_changes {
                println!(
                    "# meta {}: {} -> {}",
                    change.key,
                    display_value(change.before.as_ref()),
                    display_value(change.after.as_ref())
                );
            }
        }
        CompareFormat::Lines => print_lines(&comparison.diff),
    }
    Ok(())
}

fn display_value(value: Option<&serde_json::Value>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "(none)".to_string())
}

fn print_lines(diff: &DiffResult) {
    for line in &diff.lines {
        let number = |index: Option<usize>| {
            index
                .map(|i| (i + 1).to_string())
                .unwrap_or_default()
        };
        let text = match line.tag {
            LineTag::Unchanged => line.text().to_string(),
            _ => line
                .segments
                .iter()
                .map(|s| {
                    if s.emphasized {
                        format!("[{}]", s.value.trim_end_matches(['\r', '\n']))
                    } else {
                        s.value.trim_end_matches(['\r', '\n']).to_string()
                    }
                })
                .collect(),
        };
        println!(
            "{:>5} {:>5} {} {}",
            number(line.old_index),
            number(line.new_index),
            line.tag.sign(),
            text
        );
    }
}

/// Handle `delete`.
pub async fn delete(ctx: &Context, document: &str, version: &str) -> anyhow::Result<()> {
    let service = open(ctx)?;
    let reference = VersionRef::parse(version);
    service.delete_version(document, &reference).await?;

    if ctx.json {
        println!(
            "{}",
            serde_json::json!({ "document_id": document, "deleted": reference.to_string() })
        );
    } else {
        println!("Deleted version {} of {}", reference, document);
    }
    Ok(())
}
