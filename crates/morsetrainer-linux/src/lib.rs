//! Linux pieces of the build timing harness.
//!
//! Linux has no per-user crash-dialog preference to toggle and no fixed
//! crash-report directory, so these operations are no-ops here.

#![cfg(target_os = "linux")]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;

/// Opaque record of the crash-dialog setting before it was disabled.
///
/// Nothing is changed on Linux, so nothing is remembered.
#[derive(Debug)]
pub struct CrashDialogState;

/// Name shown in status output.
#[must_use]
pub fn platform_name() -> &'static str {
    "Linux"
}

/// Disable crash-reporter dialogs. No-op on Linux.
///
/// # Errors
///
/// Never fails on Linux.
pub fn disable_crash_dialogs() -> Result<CrashDialogState, Box<dyn std::error::Error>> {
    tracing::debug!("no crash-dialog preference on Linux");
    Ok(CrashDialogState)
}

/// Restore crash-reporter dialogs. No-op on Linux.
///
/// # Errors
///
/// Never fails on Linux.
pub fn restore_crash_dialogs(_state: CrashDialogState) -> Result<(), Box<dyn std::error::Error>> {
    Ok(())
}

/// Directory the OS writes crash reports into. None on Linux.
#[must_use]
pub fn crash_report_dir() -> Option<PathBuf> {
    None
}
