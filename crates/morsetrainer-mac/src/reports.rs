//! Location of macOS crash reports.

use std::path::PathBuf;

/// Per-user crash-report directory relative to the home directory.
const DIAGNOSTIC_REPORTS: &str = "Library/Logs/DiagnosticReports";

/// Directory macOS writes per-user crash reports into.
///
/// `None` when the home directory cannot be determined.
#[must_use]
pub fn crash_report_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DIAGNOSTIC_REPORTS))
}
