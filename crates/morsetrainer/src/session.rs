//! Koch-method training sessions.
//!
//! A session tracks two independent progressions, one for sending and
//! one for copying. Each progression is a prefix of the Koch character
//! order plus per-character statistics; when every active character is
//! well sampled and above the proficiency threshold, the next Koch
//! character is unlocked.
//!
//! All of it persists in a single state file. The file is written as
//! pretty-printed JSON with one field per line, so external tooling can
//! pull individual fields out with a line-oriented pattern match.

use std::fmt;
use std::fs;
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::code;
use crate::error::{Error, Result};
use crate::stats::CharStats;
use crate::timing;
use crate::tone::{DEFAULT_CWPM, DEFAULT_WPM};

/// Smallest allowed active charset.
pub const MIN_CHARSET_SIZE: usize = 2;

/// Results needed per character before promotion is considered.
pub const DEFAULT_MIN_SAMPLE: usize = 50;

/// Proficiency fraction needed for promotion.
pub const DEFAULT_THRESHOLD: f64 = 0.9;

/// Characters each count unit contributes when grouping is off.
const UNGROUPED_RUN: usize = 5;

/// Which half of the trainer a drill exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// The user keys characters shown as text.
    Send,
    /// The user transcribes characters played as tone.
    Copy,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Send => write!(f, "send"),
            Self::Copy => write!(f, "copy"),
        }
    }
}

/// Promotion criteria, normally sourced from configuration.
#[derive(Debug, Clone, Copy)]
pub struct KochSettings {
    /// Results required per character.
    pub min_sample: usize,
    /// Proficiency fraction required per character.
    pub threshold: f64,
}

impl Default for KochSettings {
    fn default() -> Self {
        Self {
            min_sample: DEFAULT_MIN_SAMPLE,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Outcome of scoring a drill answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrillReport {
    /// Text the drill asked for.
    pub expected: String,
    /// Text the user produced, normalized to upper case.
    pub received: String,
    /// Characters answered correctly.
    pub hits: usize,
    /// Characters scored (spaces excluded).
    pub total: usize,
    /// `hits / total`, or `0.0` for an empty drill.
    pub fraction: f64,
    /// Whether this answer unlocked a new Koch character.
    pub promoted: bool,
}

/// Persistent trainer state.
///
/// Field order matters to the serialized form: the speed fields come
/// first so each lands on its own `"name": value,` line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    /// Character speed for copy practice, words per minute.
    pub copy_cwpm: u32,
    /// Effective (Farnsworth) speed for copy practice.
    pub copy_wpm: u32,
    /// Character speed for send practice.
    pub send_cwpm: u32,
    /// Effective speed for send practice.
    pub send_wpm: u32,
    /// Active Koch charset size for copy practice.
    pub copy_chars: usize,
    /// Active Koch charset size for send practice.
    pub send_chars: usize,
    /// Per-character copy results.
    pub copy_stats: CharStats,
    /// Per-character send results.
    pub send_stats: CharStats,
    /// Generated copy drill awaiting an answer.
    pub pending_copy: Option<String>,
    /// Generated send drill awaiting an answer.
    pub pending_send: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            copy_cwpm: DEFAULT_CWPM,
            copy_wpm: DEFAULT_WPM,
            send_cwpm: DEFAULT_CWPM,
            send_wpm: DEFAULT_WPM,
            copy_chars: MIN_CHARSET_SIZE,
            send_chars: MIN_CHARSET_SIZE,
            copy_stats: CharStats::new(code::koch_prefix(MIN_CHARSET_SIZE)),
            send_stats: CharStats::new(code::koch_prefix(MIN_CHARSET_SIZE)),
            pending_copy: None,
            pending_send: None,
        }
    }
}

impl SessionState {
    /// Load state from `path`, falling back to defaults when the file
    /// does not exist yet.
    ///
    /// Loaded values are normalized: speeds snap to the nearest speed
    /// step, effective speed is capped at character speed, and charset
    /// sizes are clamped to the valid Koch range.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no state file, starting fresh");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        let mut state: Self =
            serde_json::from_str(&raw).map_err(|err| Error::Malformed {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;
        state.normalize();
        debug!(path = %path.display(), "loaded session state");
        Ok(state)
    }

    /// Write state to `path` as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        fs::write(path, json)?;
        Ok(())
    }

    fn normalize(&mut self) {
        let step = timing::SPEED_STEP;
        self.copy_cwpm = timing::round_to_step(self.copy_cwpm, step).max(step);
        self.copy_wpm = timing::round_to_step(self.copy_wpm, step)
            .max(step)
            .min(self.copy_cwpm);
        self.send_cwpm = timing::round_to_step(self.send_cwpm, step).max(step);
        self.send_wpm = timing::round_to_step(self.send_wpm, step)
            .max(step)
            .min(self.send_cwpm);
        let max_chars = code::KOCH.chars().count();
        self.copy_chars = self.copy_chars.clamp(MIN_CHARSET_SIZE, max_chars);
        self.send_chars = self.send_chars.clamp(MIN_CHARSET_SIZE, max_chars);
    }

    /// The active Koch charset for a mode.
    #[must_use]
    pub fn charset(&self, mode: Mode) -> &'static str {
        match mode {
            Mode::Send => code::koch_prefix(self.send_chars),
            Mode::Copy => code::koch_prefix(self.copy_chars),
        }
    }

    /// Speeds for a mode as `(cwpm, wpm)`.
    #[must_use]
    pub fn speeds(&self, mode: Mode) -> (u32, u32) {
        match mode {
            Mode::Send => (self.send_cwpm, self.send_wpm),
            Mode::Copy => (self.copy_cwpm, self.copy_wpm),
        }
    }

    fn stats(&self, mode: Mode) -> &CharStats {
        match mode {
            Mode::Send => &self.send_stats,
            Mode::Copy => &self.copy_stats,
        }
    }

    fn stats_mut(&mut self, mode: Mode) -> &mut CharStats {
        match mode {
            Mode::Send => &mut self.send_stats,
            Mode::Copy => &mut self.copy_stats,
        }
    }

    fn pending_mut(&mut self, mode: Mode) -> &mut Option<String> {
        match mode {
            Mode::Send => &mut self.pending_send,
            Mode::Copy => &mut self.pending_copy,
        }
    }

    /// Generate a drill and remember it as the pending answer key.
    ///
    /// With a nonzero `group_size` the drill is `group_count` groups of
    /// that length separated by single spaces. `group_size == 0` means
    /// no grouping: one continuous run, `UNGROUPED_RUN` characters per
    /// count unit, no word breaks. Characters come from the active
    /// charset, biased toward the ones that need work.
    pub fn generate_drill<R: Rng + ?Sized>(
        &mut self,
        mode: Mode,
        koch: KochSettings,
        group_size: usize,
        group_count: usize,
        rng: &mut R,
    ) -> String {
        let charset = self.charset(mode);
        let drill = if group_size == 0 {
            (0..group_count * UNGROUPED_RUN)
                .filter_map(|_| {
                    self.stats(mode)
                        .pick_biased(charset, koch.min_sample, koch.threshold, rng)
                })
                .collect()
        } else {
            let mut groups = Vec::with_capacity(group_count);
            for _ in 0..group_count {
                let group: String = (0..group_size)
                    .filter_map(|_| {
                        self.stats(mode)
                            .pick_biased(charset, koch.min_sample, koch.threshold, rng)
                    })
                    .collect();
                groups.push(group);
            }
            groups.join(" ")
        };
        debug!(%mode, %drill, "generated drill");
        *self.pending_mut(mode) = Some(drill.clone());
        drill
    }

    /// Score `answer` against the pending drill for a mode.
    ///
    /// Every non-space position of the drill is scored; a too-short
    /// answer counts the missing positions as wrong. Each result is
    /// recorded against the expected character, and when all active
    /// characters clear the promotion criteria the charset grows by
    /// one.
    pub fn check_drill(&mut self, mode: Mode, answer: &str, koch: KochSettings) -> Result<DrillReport> {
        let expected = self
            .pending_mut(mode)
            .take()
            .ok_or_else(|| Error::NoPendingDrill {
                mode: mode.to_string(),
            })?;
        let received = answer.trim().to_uppercase();

        let mut hits = 0_usize;
        let mut total = 0_usize;
        let mut got = received.chars();
        for want in expected.chars() {
            let have = got.next();
            if want == ' ' {
                continue;
            }
            total += 1;
            let correct = have == Some(want);
            if correct {
                hits += 1;
            }
            self.stats_mut(mode).record(want, correct);
        }

        let promoted = self.maybe_promote(mode, koch);
        #[allow(clippy::cast_precision_loss)]
        let fraction = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };
        info!(%mode, hits, total, promoted, "drill scored");
        Ok(DrillReport {
            expected,
            received,
            hits,
            total,
            fraction,
            promoted,
        })
    }

    fn maybe_promote(&mut self, mode: Mode, koch: KochSettings) -> bool {
        let charset = self.charset(mode);
        let max_chars = code::KOCH.chars().count();
        let size = match mode {
            Mode::Send => self.send_chars,
            Mode::Copy => self.copy_chars,
        };
        if size >= max_chars {
            return false;
        }
        if !self
            .stats(mode)
            .all_ok(charset, koch.min_sample, koch.threshold)
        {
            return false;
        }
        let new_size = size + 1;
        match mode {
            Mode::Send => self.send_chars = new_size,
            Mode::Copy => self.copy_chars = new_size,
        }
        let unlocked = code::koch_prefix(new_size).chars().last();
        info!(%mode, new_size, ?unlocked, "charset promoted");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::path::PathBuf;

    fn temp_state_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "morsetrainer_test_{}_{name}.state",
            std::process::id()
        ))
    }

    fn lenient() -> KochSettings {
        KochSettings {
            min_sample: 1,
            threshold: 0.0,
        }
    }

    #[test]
    fn test_default_state() {
        let state = SessionState::default();
        assert_eq!(state.copy_cwpm, 10);
        assert_eq!(state.copy_wpm, 5);
        assert_eq!(state.copy_chars, MIN_CHARSET_SIZE);
        assert_eq!(state.charset(Mode::Copy), "KM");
        assert_eq!(state.charset(Mode::Send), "KM");
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let path = temp_state_path("missing");
        let _ = std::fs::remove_file(&path);
        let state = SessionState::load(&path).unwrap();
        assert_eq!(state, SessionState::default());
    }

    #[test]
    fn test_save_load_round_trip() {
        let path = temp_state_path("round_trip");

        let mut state = SessionState::default();
        state.copy_cwpm = 15;
        state.copy_wpm = 10;
        state.copy_stats.record('K', true);
        state.pending_copy = Some("KM MK".to_string());
        state.save(&path).unwrap();

        let restored = SessionState::load(&path).unwrap();
        assert_eq!(restored, state);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_saved_speed_fields_are_line_extractable() {
        let path = temp_state_path("extractable");
        SessionState::default().save(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.lines().any(|l| l.trim() == r#""copy_cwpm": 10,"#));
        assert!(raw.lines().any(|l| l.trim() == r#""copy_wpm": 5,"#));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let path = temp_state_path("malformed");
        std::fs::write(&path, "not json").unwrap();
        let err = SessionState::load(&path).unwrap_err();
        assert!(err.to_string().contains(".state"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_normalizes_speeds_and_sizes() {
        let path = temp_state_path("normalize");
        std::fs::write(
            &path,
            r#"{"copy_cwpm": 13, "copy_wpm": 22, "copy_chars": 1, "send_chars": 999}"#,
        )
        .unwrap();

        let state = SessionState::load(&path).unwrap();
        assert_eq!(state.copy_cwpm, 15); // snapped to step
        assert_eq!(state.copy_wpm, 15); // capped at cwpm after snapping 22 -> 20
        assert_eq!(state.copy_chars, MIN_CHARSET_SIZE);
        assert_eq!(state.send_chars, code::KOCH.chars().count());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_generate_drill_ungrouped_is_continuous() {
        let mut state = SessionState::default();
        let mut rng = StdRng::seed_from_u64(7);
        let drill = state.generate_drill(Mode::Copy, KochSettings::default(), 0, 5, &mut rng);

        assert_eq!(drill.len(), 5 * UNGROUPED_RUN);
        assert!(!drill.contains(' '));
        assert!(drill.chars().all(|ch| ch == 'K' || ch == 'M'));
        assert_eq!(state.pending_copy.as_deref(), Some(drill.as_str()));
    }

    #[test]
    fn test_generate_drill_fixed_group_size() {
        let mut state = SessionState::default();
        let mut rng = StdRng::seed_from_u64(7);
        let drill = state.generate_drill(Mode::Send, KochSettings::default(), 4, 3, &mut rng);
        for group in drill.split(' ') {
            assert_eq!(group.len(), 4);
        }
        assert!(state.pending_send.is_some());
        assert!(state.pending_copy.is_none());
    }

    #[test]
    fn test_check_without_pending_drill() {
        let mut state = SessionState::default();
        let err = state
            .check_drill(Mode::Copy, "KM", KochSettings::default())
            .unwrap_err();
        assert!(err.to_string().contains("copy"));
    }

    #[test]
    fn test_check_perfect_answer() {
        let mut state = SessionState::default();
        state.pending_copy = Some("KM MK".to_string());
        let report = state
            .check_drill(Mode::Copy, "km mk", KochSettings::default())
            .unwrap();

        assert_eq!(report.hits, 4);
        assert_eq!(report.total, 4);
        assert!((report.fraction - 1.0).abs() < 1e-9);
        assert_eq!(report.received, "KM MK");
        assert!(state.pending_copy.is_none());
    }

    #[test]
    fn test_check_short_answer_counts_missing_as_wrong() {
        let mut state = SessionState::default();
        state.pending_copy = Some("KMKM".to_string());
        let report = state
            .check_drill(Mode::Copy, "KM", KochSettings::default())
            .unwrap();
        assert_eq!(report.hits, 2);
        assert_eq!(report.total, 4);
    }

    #[test]
    fn test_check_records_stats_against_expected() {
        let mut state = SessionState::default();
        state.pending_send = Some("KM".to_string());
        state
            .check_drill(Mode::Send, "KK", KochSettings::default())
            .unwrap();

        assert_eq!(state.send_stats.proficiency('K').sample_size, 1);
        let m = state.send_stats.proficiency('M');
        assert_eq!(m.sample_size, 1);
        assert!((m.fraction - 0.0).abs() < 1e-9);
        // copy side untouched
        assert_eq!(state.copy_stats.proficiency('K').sample_size, 0);
    }

    #[test]
    fn test_promotion_unlocks_next_koch_char() {
        let mut state = SessionState::default();
        state.pending_copy = Some("KM".to_string());
        let report = state.check_drill(Mode::Copy, "KM", lenient()).unwrap();

        assert!(report.promoted);
        assert_eq!(state.copy_chars, 3);
        assert_eq!(state.charset(Mode::Copy), "KMR");
        // send progression is independent
        assert_eq!(state.send_chars, MIN_CHARSET_SIZE);
    }

    #[test]
    fn test_no_promotion_below_threshold() {
        let mut state = SessionState::default();
        state.pending_copy = Some("KM".to_string());
        let report = state
            .check_drill(
                Mode::Copy,
                "KX",
                KochSettings {
                    min_sample: 1,
                    threshold: 0.9,
                },
            )
            .unwrap();

        assert!(!report.promoted);
        assert_eq!(state.copy_chars, MIN_CHARSET_SIZE);
    }

    #[test]
    fn test_no_promotion_when_under_sampled() {
        let mut state = SessionState::default();
        state.pending_copy = Some("KM".to_string());
        let report = state
            .check_drill(
                Mode::Copy,
                "KM",
                KochSettings {
                    min_sample: 50,
                    threshold: 0.9,
                },
            )
            .unwrap();
        assert!(!report.promoted);
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(Mode::Send.to_string(), "send");
        assert_eq!(Mode::Copy.to_string(), "copy");
    }
}
