//! Tracing setup for the trainer binary.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How chatty the log output should be.
///
/// Mapped from `-q` and repeated `-v` flags on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Info and above.
    #[default]
    Normal,
    /// Debug and above.
    Verbose,
    /// Everything.
    Trace,
}

impl Verbosity {
    /// The maximum [`Level`] this verbosity lets through.
    #[must_use]
    pub fn max_level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }
}

/// Install the global tracing subscriber.
///
/// Call once at startup. `RUST_LOG`, when set, wins over the
/// verbosity chosen on the command line.
///
/// # Examples
///
/// ```no_run
/// use morsetrainer::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Verbose);
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let fallback = format!("morsetrainer={}", verbosity.max_level());
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&fallback));

    // try_init rather than init: a second call (tests, embedding) is a no-op.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init();
}

/// Quiet subscriber for unit tests, routed through the test writer.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
