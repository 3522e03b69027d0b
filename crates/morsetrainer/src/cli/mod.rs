//! Argument parsing for the `morsetrain` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    CheckCommand, ConfigCommand, DecodeCommand, DrillCommand, HarnessCommand, HistoryCommand,
    ModeArg, StatsCommand, StatusCommand,
};

/// morsetrain - Koch-method Morse code trainer
///
/// Practice sending and copying Morse code with Farnsworth timing and a
/// charset that grows as your accuracy improves, plus a build timing
/// harness for hands-free test loops.
#[derive(Debug, Parser)]
#[command(name = "morsetrain")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Read configuration from this file instead of the default
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the build timing harness
    #[command(subcommand)]
    Harness(HarnessCommand),

    /// Generate a practice drill
    Drill(DrillCommand),

    /// Score an answer against the pending drill
    Check(CheckCommand),

    /// Decode Morse element text
    Decode(DecodeCommand),

    /// Show per-character proficiency
    Stats(StatsCommand),

    /// Show recent drill attempts
    History(HistoryCommand),

    /// Show trainer status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Fold `-q` and `-v` counts into one verbosity setting.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        use crate::logging::Verbosity;
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::Trace,
            }
        }
    }
}
