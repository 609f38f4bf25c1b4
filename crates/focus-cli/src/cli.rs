//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use focus_core::SessionKind;

use crate::commands::blocked::BlockedAction;
use crate::commands::history::HistoryArgs;
use crate::commands::run::RunArgs;
use crate::commands::stats::StatsArgs;

/// Distraction-aware focus timer.
///
/// Hosts Pomodoro-style work and break sessions in the terminal, detects
/// distractions while you work, and keeps a history of how focused you were.
#[derive(Debug, Parser)]
#[command(name = "focus", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a session, reading signals from stdin.
    Run(RunArgs),

    /// Show the remote session status.
    Status,

    /// Manage the advisory list of distracting applications.
    Blocked {
        #[command(subcommand)]
        action: BlockedAction,
    },

    /// Set the session type used when `run` is given neither --work nor --break.
    Default {
        /// `work` or `break`.
        kind: SessionKind,
    },

    /// List finished sessions.
    History(HistoryArgs),

    /// Show focus statistics.
    Stats(StatsArgs),
}
