//! CLI definitions: argument parsing, subcommands, and help text.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use clap_complete::Shell;

use crate::core::export::ExportFormat;

pub use clap_complete::generate;

const AFTER_HELP: &str = "\
EXAMPLES:
  llm-discovery update                      Fetch models from all providers and cache them
  llm-discovery list --query gpt            List cached models matching 'gpt'
  llm-discovery export --format csv         Export cached models as CSV to stdout
  llm-discovery changes                     Show what the last update added or removed
  llm-discovery changes --from A --to B     Diff two stored snapshots
  llm-discovery snapshots prune             Delete snapshots past the retention window
  llm-discovery completions bash            Generate bash completions

ENVIRONMENT:
  OPENAI_API_KEY, GOOGLE_API_KEY, OPENROUTER_API_KEY
  LLM_DISCOVERY_PROVIDERS (default: openai,google,anthropic)
  LLM_DISCOVERY_CACHE_DIR, LLM_DISCOVERY_RETENTION_DAYS (default: 30)
  LLM_DISCOVERY_TIMEOUT_SECS (default: 10), LLM_DISCOVERY_DEADLINE_SECS
";

/// Command-line arguments for the application.
#[derive(Parser)]
#[command(
    author,
    version,
    about = "Discover, cache, and track the models offered by LLM providers",
    after_help = AFTER_HELP
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (use multiple times for debug)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Reduce log output (errors only)
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch models from every configured provider and refresh the cache
    Update,
    /// List cached models (no network access)
    List {
        /// Filter models by id, name, or provider
        #[arg(long)]
        query: Option<String>,
    },
    /// Export cached models to a file or stdout
    Export {
        /// Output format
        #[arg(long, value_enum)]
        format: ExportFormat,
        /// Output file path (stdout if omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show model additions and removals
    Changes {
        /// Baseline snapshot id (requires --to)
        #[arg(long, requires = "to")]
        from: Option<String>,
        /// Snapshot id to compare against the baseline (requires --from)
        #[arg(long, requires = "from")]
        to: Option<String>,
        /// Print the change ledger as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect or prune stored snapshots
    Snapshots {
        #[command(subcommand)]
        subcommand: SnapshotsSubcommand,
    },
    /// Show resolved configuration
    Config,
    /// Generate shell completion script
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        #[arg(value_parser = clap::value_parser!(Shell))]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum SnapshotsSubcommand {
    /// List stored snapshots, newest first
    List {
        /// Maximum number of snapshots to show
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Show one snapshot's per-provider outcome
    Show {
        /// Snapshot id
        id: String,
    },
    /// Delete snapshots older than the retention window (the newest is always kept)
    Prune {
        /// Override LLM_DISCOVERY_RETENTION_DAYS
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        retention_days: Option<u32>,
    },
}

impl Args {
    /// Log level based on -v/-q flags: error, warn, info, or debug.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose >= 2 {
            "debug"
        } else if self.verbose >= 1 {
            "info"
        } else {
            "warn"
        }
    }
}
