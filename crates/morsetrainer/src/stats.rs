//! Per-character proficiency statistics.
//!
//! Each tested character keeps a bounded history of recent results. The
//! histories drive drill-character selection (weak characters come up
//! more often) and the Koch promotion decision.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Default bound on the per-character result history.
pub const MAX_HISTORY: usize = 50;

/// Proficiency summary for one character.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Proficiency {
    /// Fraction of recent results that were correct, in `[0.0, 1.0]`.
    pub fraction: f64,
    /// Number of results in the history.
    pub sample_size: usize,
}

/// Bounded result histories for a set of characters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharStats {
    histories: BTreeMap<char, Vec<bool>>,
}

impl CharStats {
    /// Create empty histories for every character in `charset`.
    #[must_use]
    pub fn new(charset: &str) -> Self {
        Self {
            histories: charset.chars().map(|ch| (ch, Vec::new())).collect(),
        }
    }

    /// Record one result for a character, trimming the history to the
    /// most recent [`MAX_HISTORY`] entries.
    pub fn record(&mut self, ch: char, correct: bool) {
        let history = self.histories.entry(ch).or_default();
        history.push(correct);
        if history.len() > MAX_HISTORY {
            let excess = history.len() - MAX_HISTORY;
            history.drain(..excess);
        }
    }

    /// Proficiency for one character. Unknown characters read as empty.
    #[must_use]
    pub fn proficiency(&self, ch: char) -> Proficiency {
        let history = self.histories.get(&ch).map_or(&[][..], Vec::as_slice);
        let sample_size = history.len();
        let fraction = if sample_size == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            {
                history.iter().filter(|&&r| r).count() as f64 / sample_size as f64
            }
        };
        Proficiency {
            fraction,
            sample_size,
        }
    }

    /// Proficiency for every tracked character.
    #[must_use]
    pub fn proficiencies(&self) -> BTreeMap<char, Proficiency> {
        self.histories
            .keys()
            .map(|&ch| (ch, self.proficiency(ch)))
            .collect()
    }

    /// Check whether every character in `charset` has at least
    /// `min_sample` results and a proficiency of at least `threshold`.
    ///
    /// The active charset may have been reduced, so characters outside
    /// it are ignored even when they hold results.
    #[must_use]
    pub fn all_ok(&self, charset: &str, min_sample: usize, threshold: f64) -> bool {
        charset.chars().all(|ch| {
            let prof = self.proficiency(ch);
            prof.sample_size >= min_sample && prof.fraction >= threshold
        })
    }

    /// Characters of `charset` ordered weakest first.
    ///
    /// Characters with few results are pulled toward the front by
    /// scaling their success fraction by `n / MAX_HISTORY`, since a
    /// freshly added character needs testing most.
    #[must_use]
    pub fn weakest_first(&self, charset: &str) -> Vec<char> {
        let mut rated: Vec<(f64, char)> = charset
            .chars()
            .map(|ch| {
                let prof = self.proficiency(ch);
                let mut rate = if prof.sample_size == 0 {
                    0.01
                } else {
                    prof.fraction
                };
                if prof.sample_size < MAX_HISTORY {
                    #[allow(clippy::cast_precision_loss)]
                    {
                        rate *= prof.sample_size as f64 / MAX_HISTORY as f64;
                    }
                }
                (rate, ch)
            })
            .collect();

        rated.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        rated.into_iter().map(|(_, ch)| ch).collect()
    }

    /// Pick a random character from `charset`, biased toward trouble.
    ///
    /// Characters that are under-sampled (fewer than `min_sample`
    /// results) or below the proficiency `threshold` appear three times
    /// in the pool instead of once, so they come up more often.
    ///
    /// Returns `None` for an empty charset.
    pub fn pick_biased<R: rand::Rng + ?Sized>(
        &self,
        charset: &str,
        min_sample: usize,
        threshold: f64,
        rng: &mut R,
    ) -> Option<char> {
        let mut pool = Vec::new();
        for ch in charset.chars() {
            pool.push(ch);
            let prof = self.proficiency(ch);
            if prof.sample_size < min_sample || prof.fraction < threshold {
                pool.push(ch);
                pool.push(ch);
            }
        }
        pool.choose(rng).copied()
    }
}
