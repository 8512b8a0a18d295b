//! # Agent Architect CLI (`architect`)
//!
//! ## Usage
//!
//! ```bash
//! architect --config ./config/architect.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `architect index` | Embed the knowledge base and write the index snapshot |
//! | `architect search "<query>"` | Show the knowledge sections retrieved for a query |
//! | `architect generate "<idea>"` | Stream spec files for an agent idea |
//! | `architect serve` | Start the HTTP server |
//! | `architect extract` | Run the streaming field extractor over stdin |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use agent_architect::extract::ExtractOptions;
use agent_architect::{config, extract, generate, knowledge, logging, retrieval, server};

/// Agent Architect: grounded, streamed specs for AI agent ideas.
#[derive(Parser)]
#[command(
    name = "architect",
    about = "Agent Architect: turn an agent idea into requirements, design, and task specs",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/architect.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed the knowledge base.
    ///
    /// Scans `[knowledge].root`, chunks every file on headings, embeds the
    /// chunks, and writes the index to `[knowledge].index_path` if set.
    Index {
        /// Show file and chunk counts without embedding.
        #[arg(long)]
        dry_run: bool,
    },

    /// Retrieve knowledge sections for a query.
    Search {
        query: String,

        /// Number of results (defaults to `[retrieval].top_k`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Generate spec files for an agent idea.
    ///
    /// Spec text streams to stdout; progress goes to stderr.
    Generate {
        /// The agent idea, in plain language.
        query: String,

        /// Directory to write requirements.md, design.md, and tasks.md to.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Extract string fields from a JSON object on stdin, incrementally.
    ///
    /// Does not read the config file.
    Extract {
        /// Fragment size in characters (0 = whole input at once).
        #[arg(long, default_value_t = 16)]
        chunk_size: usize,

        /// Field to extract (repeatable). Defaults to requirements, design, tasks.
        #[arg(long = "field")]
        fields: Vec<String>,

        /// Print one JSON object of assembled fields instead of delta lines.
        #[arg(long)]
        assemble: bool,

        /// Keep `\uXXXX` escapes undecoded.
        #[arg(long)]
        legacy_unicode: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();
    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Extract {
        chunk_size,
        fields,
        assemble,
        legacy_unicode,
    } = &cli.command
    {
        extract::run_extract(&ExtractOptions {
            chunk_size: *chunk_size,
            fields: fields.clone(),
            assemble: *assemble,
            legacy_unicode: *legacy_unicode,
        })?;
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Index { dry_run } => {
            knowledge::run_index(&cfg, dry_run).await?;
        }
        Commands::Search { query, limit } => {
            retrieval::run_search(&cfg, &query, limit).await?;
        }
        Commands::Generate { query, out } => {
            generate::run_generate(cfg, &query, out.as_deref()).await?;
        }
        Commands::Serve => {
            server::run_server(cfg).await?;
        }
        Commands::Extract { .. } => {
            // Handled above (before config loading)
        }
    }

    Ok(())
}
