//! Configuration display.

use folio_core::Config;
use std::path::PathBuf;

/// State shared by every command.
pub struct Context {
    pub config: Config,
    /// Config files that were merged, in load order.
    pub sources: Vec<PathBuf>,
    /// Print JSON instead of text.
    pub json: bool,
}

/// Print the effective configuration.
pub fn show_config(ctx: &Context) -> anyhow::Result<()> {
    let store_dir = ctx.config.store_dir()?;
    let store = ctx.config.snapshot_config();
    let diff = ctx.config.diff_options();

    if ctx.json {
        let value = serde_json::json!({
            "sources": ctx.sources,
            "data_dir": store_dir,
            "log_level": ctx.config.log_level,
            "versioning": store,
            "diff": diff,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Configuration:");
    println!();
    if ctx.sources.is_empty() {
        println!("  Sources:            (defaults only)");
    } else {
        for source in &ctx.sources {
            println!("  Source:             {}", source.display());
        }
    }
    println!("  Data directory:     {}", store_dir.display());
    if let Some(level) = ctx.config.log_level {
        println!("  Log level:          {:?}", level);
    }
    println!("  Default page size:  {}", store.default_page_size);
    println!("  Max page size:      {}", store.max_page_size);
    println!("  Max content bytes:  {}", store.max_content_bytes);
    println!("  Max metadata bytes: {}", store.max_metadata_bytes);
    println!("  Allocation retries: {}", store.max_allocation_attempts);
    println!("  Diff algorithm:     {:?}", diff.algorithm);
    println!("  Context lines:      {}", diff.context_lines);
    Ok(())
}
