//! Build timing harness.
//!
//! Repeatedly invokes a build command, measures wall-clock duration,
//! and appends `date|cwpm|wpm|delta` records to a pipe-delimited log.
//! The speeds come from the session state file so each record ties a
//! build time to the trainer settings in effect at the time.
//!
//! Crash-reporter dialogs are disabled for the whole run and restored
//! exactly once on exit, interrupt included. After each iteration any
//! new crash reports are swept out of the OS crash-log directory into
//! a save directory.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Local;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

#[cfg(target_os = "linux")]
use morsetrainer_linux as platform;

#[cfg(target_os = "macos")]
use morsetrainer_mac as platform;

/// Timestamp format for log records.
const RECORD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Settings for one harness run.
#[derive(Debug, Clone)]
pub struct HarnessOptions {
    /// Build command as program plus arguments.
    pub build_command: Vec<String>,
    /// Session state file the speeds are extracted from.
    pub state_path: PathBuf,
    /// Append-only timing log.
    pub log_path: PathBuf,
    /// Directory swept crash reports are moved into.
    pub save_dir: PathBuf,
    /// Number of iterations to run. 0 runs until interrupted.
    pub limit: u64,
}

/// Extract a numeric field from pretty-printed JSON state text.
///
/// Matches one `"name": value,` line, the shape the state file writer
/// produces. Returns `None` when the field is absent or non-numeric.
fn extract_field(text: &str, field: &str) -> Result<Option<u32>> {
    let pattern = format!(r#""{}"\s*:\s*(\d+)\s*,"#, regex::escape(field));
    let re = Regex::new(&pattern).map_err(|e| Error::internal(e.to_string()))?;
    Ok(re
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok()))
}

/// Read the copy speeds from the state file.
///
/// Missing files or fields fall back to zero so a run can still be
/// timed; the gap is visible in the log as `0|0` speeds.
fn read_speeds(state_path: &Path) -> (u32, u32) {
    let text = match std::fs::read_to_string(state_path) {
        Ok(text) => text,
        Err(err) => {
            warn!(path = %state_path.display(), %err, "cannot read state file, using zero speeds");
            return (0, 0);
        }
    };

    let cwpm = extract_field(&text, "copy_cwpm").ok().flatten();
    let wpm = extract_field(&text, "copy_wpm").ok().flatten();
    if cwpm.is_none() || wpm.is_none() {
        warn!(path = %state_path.display(), "state file has no usable speed fields");
    }
    (cwpm.unwrap_or(0), wpm.unwrap_or(0))
}

/// Append one timing record to the log, creating the file if absent.
fn append_record(log_path: &Path, cwpm: u32, wpm: u32, delta_secs: f64) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|source| Error::LogAppend {
            path: log_path.to_path_buf(),
            source,
        })?;

    let date = Local::now().format(RECORD_TIME_FORMAT);
    writeln!(file, "{date}|{cwpm}|{wpm}|{delta_secs:.2}").map_err(|source| Error::LogAppend {
        path: log_path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Move every file out of `crash_dir` into `save_dir`.
///
/// Returns the number of files moved. An absent crash directory is
/// not an error; there is simply nothing to sweep.
fn sweep_dir(crash_dir: &Path, save_dir: &Path) -> Result<usize> {
    if !crash_dir.is_dir() {
        debug!(path = %crash_dir.display(), "no crash directory, nothing to sweep");
        return Ok(0);
    }

    std::fs::create_dir_all(save_dir).map_err(|source| Error::DirectoryCreate {
        path: save_dir.to_path_buf(),
        source,
    })?;

    let mut moved = 0;
    for entry in std::fs::read_dir(crash_dir)? {
        let entry = entry?;
        let from = entry.path();
        if !from.is_file() {
            continue;
        }
        let to = save_dir.join(entry.file_name());
        // rename fails across filesystems; fall back to copy + remove
        if std::fs::rename(&from, &to).is_err() {
            std::fs::copy(&from, &to)?;
            std::fs::remove_file(&from)?;
        }
        moved += 1;
    }

    if moved > 0 {
        info!(moved, to = %save_dir.display(), "swept crash reports");
    }
    Ok(moved)
}

/// Sweep the OS crash-log directory into `save_dir` once.
///
/// # Errors
///
/// Returns an error if files cannot be moved or the save directory
/// cannot be created.
pub fn sweep(save_dir: &Path) -> Result<usize> {
    match platform::crash_report_dir() {
        Some(crash_dir) => sweep_dir(&crash_dir, save_dir),
        None => {
            debug!("platform has no crash-report directory");
            Ok(0)
        }
    }
}

/// Run one timed build iteration and log it.
///
/// Build failures are recorded in the log like any other iteration;
/// only a log that cannot be appended stops the run.
async fn iterate(opts: &HarnessOptions) -> Result<()> {
    let (cwpm, wpm) = read_speeds(&opts.state_path);

    let start = Instant::now();
    let program = &opts.build_command[0];
    let status = tokio::process::Command::new(program)
        .args(&opts.build_command[1..])
        .status()
        .await;
    let delta = start.elapsed().as_secs_f64();

    match status {
        Ok(status) if status.success() => {
            debug!(delta, "build finished");
        }
        Ok(status) => {
            warn!(%status, delta, "build failed, continuing");
        }
        Err(err) => {
            warn!(%program, %err, "could not run build command, continuing");
        }
    }

    append_record(&opts.log_path, cwpm, wpm, delta)?;

    if let Err(err) = sweep(&opts.save_dir) {
        warn!(%err, "crash report sweep failed");
    }
    Ok(())
}

/// Run the timing loop until the limit is reached or Ctrl-C arrives.
///
/// # Errors
///
/// Returns an error if the build command is empty, crash dialogs
/// cannot be toggled, or the timing log cannot be appended.
pub async fn run(opts: &HarnessOptions) -> Result<()> {
    if opts.build_command.is_empty() {
        return Err(Error::ConfigValidation {
            message: "harness build_command must not be empty".to_string(),
        });
    }

    let dialog_state =
        platform::disable_crash_dialogs().map_err(|e| Error::platform(e.to_string()))?;
    info!(command = ?opts.build_command, "timing harness started");

    let result = run_loop(opts).await;

    // restore happens on every exit path, interrupt included
    if let Err(err) = platform::restore_crash_dialogs(dialog_state) {
        warn!(%err, "could not restore crash-dialog setting");
    }
    result
}

async fn run_loop(opts: &HarnessOptions) -> Result<()> {
    let mut iterations = 0_u64;
    loop {
        tokio::select! {
            result = iterate(opts) => {
                result?;
                iterations += 1;
                if opts.limit != 0 && iterations >= opts.limit {
                    info!(iterations, "iteration limit reached");
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!(iterations, "interrupted, stopping harness");
                return Ok(());
            }
        }
    }
}
