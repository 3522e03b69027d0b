//! Subcommand argument structs.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// Build timing harness commands.
#[derive(Debug, Subcommand)]
pub enum HarnessCommand {
    /// Run the timed build loop
    Run {
        /// Number of iterations to run (0 = until interrupted)
        #[arg(short, long, default_value = "0")]
        limit: u64,

        /// Label; swept crash reports land in a subdirectory of this name
        #[arg(long)]
        label: Option<String>,

        /// Build command to time, overriding the configured one
        #[arg(long, value_name = "CMD", num_args = 1..)]
        build: Vec<String>,
    },

    /// Sweep crash reports into the save directory once
    Sweep {
        /// Label; swept crash reports land in a subdirectory of this name
        #[arg(long)]
        label: Option<String>,
    },
}

/// Drill command arguments.
#[derive(Debug, Args)]
pub struct DrillCommand {
    /// Practice mode
    #[arg(short, long, value_enum, default_value = "copy")]
    pub mode: ModeArg,

    /// Number of groups (0 = use configured value)
    #[arg(long, default_value = "0")]
    pub count: usize,

    /// Characters per group (0 = use configured value)
    #[arg(short, long, default_value = "0")]
    pub size: usize,

    /// Write the drill as raw PCM samples to this file
    #[arg(short, long, value_name = "FILE")]
    pub render: Option<PathBuf>,
}

/// Check command arguments.
#[derive(Debug, Args)]
pub struct CheckCommand {
    /// The answer to score against the pending drill
    pub answer: String,

    /// Practice mode
    #[arg(short, long, value_enum, default_value = "copy")]
    pub mode: ModeArg,

    /// Print as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Decode command arguments.
#[derive(Debug, Args)]
pub struct DecodeCommand {
    /// Morse element text, e.g. ".- -... / -.-."
    #[arg(required_unless_present = "samples", conflicts_with = "samples")]
    pub elements: Option<String>,

    /// Decode raw PCM audio from a file, as written by drill --render
    #[arg(short, long, value_name = "FILE")]
    pub samples: Option<PathBuf>,
}

/// Stats command arguments.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Practice mode
    #[arg(short, long, value_enum, default_value = "copy")]
    pub mode: ModeArg,

    /// Print as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// History command arguments.
#[derive(Debug, Args)]
pub struct HistoryCommand {
    /// Maximum number of attempts to show
    #[arg(short, long, default_value = "20")]
    pub limit: usize,

    /// Only show attempts for this mode
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Print as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Print as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration inspection commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show {
        /// Print as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Print where the config file is looked for
    Path,

    /// Check a config file for problems
    Validate {
        /// File to check instead of the default location
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Practice mode argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Keying drills
    Send,
    /// Listening drills
    Copy,
}

impl From<ModeArg> for crate::session::Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Send => Self::Send,
            ModeArg::Copy => Self::Copy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_arg_conversion() {
        assert_eq!(
            crate::session::Mode::from(ModeArg::Send),
            crate::session::Mode::Send
        );
        assert_eq!(
            crate::session::Mode::from(ModeArg::Copy),
            crate::session::Mode::Copy
        );
    }

    #[test]
    fn test_harness_command_debug() {
        let cmd = HarnessCommand::Run {
            limit: 3,
            label: None,
            build: vec!["make".to_string()],
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Run"));
        assert!(debug_str.contains("limit"));
    }

    #[test]
    fn test_drill_command_debug() {
        let cmd = DrillCommand {
            mode: ModeArg::Copy,
            count: 5,
            size: 0,
            render: None,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("count"));
    }

    #[test]
    fn test_check_command_debug() {
        let cmd = CheckCommand {
            answer: "KM MK".to_string(),
            mode: ModeArg::Send,
            json: false,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("answer"));
        assert!(debug_str.contains("KM MK"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Validate { file: None };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Validate"));
    }

    #[test]
    fn test_mode_arg_debug() {
        assert_eq!(format!("{:?}", ModeArg::Copy), "Copy");
    }

    #[test]
    fn test_mode_arg_is_copy() {
        let arg = ModeArg::Send;
        let copied = arg;
        assert_eq!(arg, copied);
    }
}
