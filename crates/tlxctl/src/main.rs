//! tlxctl - command-line front end for tinyllamax
//!
//! Plans package operations from typed intents or plain text, simulates
//! them, and only runs the real command after confirmation.

mod commands;
mod output;

use clap::{Args, Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "tlxctl")]
#[command(about = "tinyllamax - plan, simulate and safely run package operations", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Do not read or write the operation history
    #[arg(long, global = true)]
    pub no_history: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Plan one package operation, simulate it, optionally execute it
    Plan {
        #[command(flatten)]
        action: ActionArgs,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Run a raw JSON intent, e.g. '{"intent":"InstallPackage","package":"htop"}'
    Intent {
        #[arg(long)]
        json: String,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Decide the intent from plain text with a model backend
    Chat {
        text: String,

        /// fake or ollama (default from config)
        #[arg(long)]
        backend: Option<String>,

        /// Model name for the ollama backend
        #[arg(long)]
        model: Option<String>,

        /// Make the fake backend return this text verbatim
        #[arg(long)]
        fake_json: Option<String>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Query the operation history
    History {
        #[command(subcommand)]
        action: HistoryCommand,
    },

    /// Show the detected distribution and package manager
    Distro,

    /// Print the effective configuration as TOML
    Config,
}

/// Exactly one operation for `plan`
#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct ActionArgs {
    /// Install a package
    #[arg(long, value_name = "PKG")]
    pub install: Option<String>,

    /// Remove a package
    #[arg(long, value_name = "PKG")]
    pub remove: Option<String>,

    /// Search package metadata
    #[arg(long, value_name = "QUERY")]
    pub search: Option<String>,

    /// Refresh package lists
    #[arg(long)]
    pub update: bool,

    /// Upgrade installed packages
    #[arg(long)]
    pub upgrade: bool,

    /// Explain a command
    #[arg(long, value_name = "CMD")]
    pub explain: Option<String>,

    /// Detect the distribution
    #[arg(long)]
    pub detect: bool,
}

#[derive(Args, Clone)]
pub struct RunArgs {
    /// Plan for this distro id instead of the detected one
    #[arg(long)]
    pub distro: Option<String>,

    /// Execute the real command after simulating
    #[arg(long, alias = "run")]
    pub real: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Subcommand)]
pub enum HistoryCommand {
    /// Most recent operations
    Recent {
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },

    /// Failed operations whose command contains PATTERN
    Failures {
        pattern: String,

        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },

    /// Counts by status
    Stats {
        /// Only count this intent type
        #[arg(long)]
        intent: Option<String>,
    },

    /// Delete all but the most recent records
    Cleanup {
        /// Records to keep (default from config)
        #[arg(long)]
        keep: Option<usize>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match commands::dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
