//! Control of the macOS crash-reporter dialog.
//!
//! The `com.apple.CrashReporter DialogType` user default decides
//! whether a dialog pops up when a process crashes. During a timing
//! run those dialogs steal focus and stall the loop, so the harness
//! sets the key to `none` and puts the old value back afterwards.
//!
//! The key is read and written by shelling out to `defaults`, the same
//! way a user would toggle it.

use std::process::Command;

use thiserror::Error;
use tracing::{debug, info};

/// Preference domain holding the crash-reporter settings.
const DOMAIN: &str = "com.apple.CrashReporter";

/// Key controlling the crash dialog.
const KEY: &str = "DialogType";

/// Value that suppresses the dialog.
const DIALOG_NONE: &str = "none";

/// Errors from toggling the crash-reporter preference.
#[derive(Error, Debug)]
pub enum CrashReporterError {
    /// The `defaults` tool could not be run.
    #[error("could not run defaults: {0}")]
    Spawn(#[from] std::io::Error),

    /// The `defaults` tool ran but reported failure.
    #[error("defaults {action} failed: {detail}")]
    Command {
        /// Which defaults subcommand failed.
        action: &'static str,
        /// stderr of the failed invocation.
        detail: String,
    },
}

/// The `DialogType` value before it was overridden.
///
/// `None` means the key was unset, so restoring deletes it instead of
/// writing a value back.
#[derive(Debug)]
pub struct CrashDialogState {
    previous: Option<String>,
}

/// Read the current `DialogType` value, `None` when unset.
fn read_dialog_type() -> Result<Option<String>, CrashReporterError> {
    let output = Command::new("defaults")
        .args(["read", DOMAIN, KEY])
        .output()?;

    if output.status.success() {
        let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(Some(value))
    } else {
        // defaults read fails when the key does not exist
        Ok(None)
    }
}

/// Write a `DialogType` value.
fn write_dialog_type(value: &str) -> Result<(), CrashReporterError> {
    let output = Command::new("defaults")
        .args(["write", DOMAIN, KEY, value])
        .output()?;

    if output.status.success() {
        Ok(())
    } else {
        Err(CrashReporterError::Command {
            action: "write",
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Delete the `DialogType` key.
fn delete_dialog_type() -> Result<(), CrashReporterError> {
    let output = Command::new("defaults")
        .args(["delete", DOMAIN, KEY])
        .output()?;

    if output.status.success() {
        Ok(())
    } else {
        Err(CrashReporterError::Command {
            action: "delete",
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Suppress crash-reporter dialogs, returning the previous setting.
///
/// # Errors
///
/// Returns an error if the preference cannot be read or written.
pub fn disable() -> Result<CrashDialogState, CrashReporterError> {
    let previous = read_dialog_type()?;
    write_dialog_type(DIALOG_NONE)?;
    info!(?previous, "crash-reporter dialogs disabled");
    Ok(CrashDialogState { previous })
}

/// Put the previous crash-reporter setting back.
///
/// # Errors
///
/// Returns an error if the preference cannot be written.
pub fn restore(state: CrashDialogState) -> Result<(), CrashReporterError> {
    match state.previous {
        Some(value) => write_dialog_type(&value)?,
        None => delete_dialog_type()?,
    }
    debug!("crash-reporter setting restored");
    Ok(())
}
