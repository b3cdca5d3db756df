//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// Queuefairy - review-queue reconciliation engine
#[derive(Parser)]
#[command(
    name = "qf",
    about = "Review-queue state reconciliation engine for chat platforms",
    version,
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Replay a JSONL event stream through the engine and print the
    /// platform actions it performs
    Replay {
        /// Event file (defaults to stdin)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Print the effective configuration as YAML
    Config,
}

/// Path of the log file the engine writes to
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("queuefairy")
        .join("logs")
        .join("queuefairy.log");
    debug!(?path, "get_log_path: returning path");
    path
}
