//! Folio - document version store.
//!
//! This is the main entry point for the folio CLI.

mod commands;

use clap::{Parser, Subcommand};
use commands::{CompareFormat, Context};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "folio")]
#[command(author, version, about = "Document version store and diff engine", long_about = None)]
struct Cli {
    /// Directory holding the version store
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a new version of a document
    Create {
        /// Document ID
        document: String,
        /// Read content from this file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Who is making the change (defaults to $USER)
        #[arg(short, long)]
        actor: Option<String>,
        /// Metadata entry as key=value; JSON values are kept as JSON
        #[arg(short, long = "meta", value_name = "KEY=VALUE")]
        metadata: Vec<String>,
    },
    /// List versions of a document, newest first
    List {
        /// Document ID
        document: String,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Page size (0 uses the configured default)
        #[arg(short, long, default_value_t = 0)]
        limit: usize,
    },
    /// Print one version
    Show {
        /// Document ID
        document: String,
        /// Version number or snapshot ID
        version: String,
    },
    /// Print the newest version
    Latest {
        /// Document ID
        document: String,
    },
    /// Make an older version current by appending a copy of it
    Restore {
        /// Document ID
        document: String,
        /// Version number or snapshot ID to restore
        version: String,
        /// Who is restoring (defaults to $USER)
        #[arg(short, long)]
        actor: Option<String>,
    },
    /// Diff two versions of a document
    Compare {
        /// Document ID
        document: String,
        /// Old version (number or snapshot ID)
        a: String,
        /// New version (number or snapshot ID)
        b: String,
        /// Output format
        #[arg(long, value_enum, default_value = "unified")]
        format: CompareFormat,
        /// Context lines around each hunk (overrides config)
        #[arg(short = 'U', long)]
        context: Option<usize>,
    },
    /// Permanently delete one version
    Delete {
        /// Document ID
        document: String,
        /// Version number or snapshot ID
        version: String,
    },
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir()?;
    let (mut config, sources) = folio_core::Config::load(Some(&cwd)).await?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }

    commands::init_logging(cli.verbose, config.log_level);
    for source in &sources {
        tracing::debug!(path = %source.display(), "Loaded config");
    }

    let ctx = Context {
        config,
        sources,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Create {
            document,
            file,
            actor,
            metadata,
        } => commands::create(&ctx, &document, file, actor, &metadata).await,
        Commands::List {
            document,
            offset,
            limit,
        } => commands::list(&ctx, &document, offset, limit).await,
        Commands::Show { document, version } => commands::show(&ctx, &document, &version).await,
        Commands::Latest { document } => commands::latest(&ctx, &document).await,
        Commands::Restore {
            document,
            version,
            actor,
        } => commands::restore(&ctx, &document, &version, actor).await,
        Commands::Compare {
            document,
            a,
            b,
            format,
            context,
        } => commands::compare(&ctx, &document, &a, &b, format, context).await,
        Commands::Delete { document, version } => {
            commands::delete(&ctx, &document, &version).await
        }
        Commands::Config => commands::show_config(&ctx),
    };

    if let Err(e) = &result {
        tracing::debug!(error = %e, "Command failed");
    }
    result
}
