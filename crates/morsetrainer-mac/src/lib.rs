//! macOS pieces of the build timing harness: suppressing the
//! crash-reporter dialog during timing runs and locating the crash
//! reports the OS writes while a build loop runs.

#![cfg(target_os = "macos")]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod crash_reporter;
pub mod reports;

use std::path::PathBuf;

pub use crash_reporter::{CrashDialogState, CrashReporterError};
pub use reports::crash_report_dir as diagnostic_reports_dir;

/// Name shown in status output.
#[must_use]
pub fn platform_name() -> &'static str {
    "macOS"
}

/// Suppress crash-reporter dialogs, returning the previous setting.
///
/// # Errors
///
/// Returns an error if the preference cannot be read or written.
pub fn disable_crash_dialogs() -> Result<CrashDialogState, Box<dyn std::error::Error>> {
    Ok(crash_reporter::disable()?)
}

/// Put the previous crash-reporter setting back.
///
/// # Errors
///
/// Returns an error if the preference cannot be written.
pub fn restore_crash_dialogs(state: CrashDialogState) -> Result<(), Box<dyn std::error::Error>> {
    crash_reporter::restore(state)?;
    Ok(())
}

/// Directory macOS writes per-user crash reports into.
#[must_use]
pub fn crash_report_dir() -> Option<PathBuf> {
    reports::crash_report_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_name() {
        assert_eq!(platform_name(), "macOS");
    }

    #[test]
    fn test_crash_report_dir_exported() {
        assert_eq!(crash_report_dir(), reports::crash_report_dir());
    }
}
