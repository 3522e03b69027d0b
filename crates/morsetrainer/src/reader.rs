//! Adaptive Morse decoder.
//!
//! Decodes a stream of averaged signal levels into characters. Dot and
//! dash lengths adapt to the sender's fist, and the sound threshold adapts
//! to the signal environment, so the decoder tracks a human on a straight
//! key. The audio hardware lives behind the [`SampleSource`] seam.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::code;
use crate::error::{Error, Result};

/// A source of averaged signal level samples.
///
/// Implementors average a small window of raw audio samples into one
/// level value per call. `None` means the stream has ended.
pub trait SampleSource {
    /// Get the next averaged signal level.
    fn next_level(&mut self) -> Option<u32>;
}

impl SampleSource for std::vec::IntoIter<u32> {
    fn next_level(&mut self) -> Option<u32> {
        self.next()
    }
}

// raw PCM samples averaged into one level
const PCM_WINDOW: usize = 64;
// gain on the per-window peak-to-peak swing
const PCM_GAIN: u32 = 64;

/// Signal levels derived from raw 8-bit PCM audio.
///
/// Each level is the peak-to-peak swing over a short window of samples,
/// scaled so a tone at the default volume clears the default
/// [`DecoderParams::signal_threshold`]. Silence windows read as zero.
#[derive(Debug)]
pub struct PcmLevels<I> {
    samples: I,
}

impl<I: Iterator<Item = u8>> PcmLevels<I> {
    /// Wrap an iterator of raw PCM samples.
    pub fn new(samples: I) -> Self {
        Self { samples }
    }
}

impl PcmLevels<std::vec::IntoIter<u8>> {
    /// Wrap an owned PCM buffer.
    #[must_use]
    pub fn from_buffer(samples: Vec<u8>) -> Self {
        Self::new(samples.into_iter())
    }
}

impl<I: Iterator<Item = u8>> SampleSource for PcmLevels<I> {
    fn next_level(&mut self) -> Option<u32> {
        let mut lo = u8::MAX;
        let mut hi = u8::MIN;
        let mut count = 0;
        for sample in self.samples.by_ref().take(PCM_WINDOW) {
            lo = lo.min(sample);
            hi = hi.max(sample);
            count += 1;
        }
        if count == 0 {
            return None;
        }
        Some(u32::from(hi - lo) * PCM_GAIN)
    }
}

/// One decoded item from the level stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A full character's worth of elements ended.
    ///
    /// `ch` is `None` when the element string matches nothing.
    Character {
        /// The recognized character, if any.
        ch: Option<char>,
        /// The dot/dash element string that was keyed.
        elements: String,
    },
    /// Enough silence passed to call it a space.
    Gap,
}

/// Tunable decoder parameters.
///
/// These adapt while decoding and can be persisted between runs so the
/// decoder starts tuned to its user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderParams {
    /// Dot length estimate, in sample counts.
    pub len_dot: u32,
    /// Dash length estimate, in sample counts.
    pub len_dash: u32,
    /// Sound-run length separating dots from dashes.
    pub dot_dash_threshold: u32,
    /// Number of silence runs that ends a character.
    pub char_space: u32,
    /// Number of silence runs that ends a word.
    pub word_space: u32,
    /// Observed loud-signal level.
    pub max_signal: u32,
    /// Observed quiet-signal level.
    pub min_signal: u32,
    /// Level separating sound from silence.
    pub signal_threshold: u32,
}

impl Default for DecoderParams {
    fn default() -> Self {
        Self {
            len_dot: 30,
            len_dash: 90,
            dot_dash_threshold: 60,
            char_space: 3,
            word_space: 9,
            max_signal: 5000,
            min_signal: 500,
            signal_threshold: 3000,
        }
    }
}

impl DecoderParams {
    /// Load parameters from a JSON file.
    ///
    /// An absent file yields the defaults; a present but malformed or
    /// incomplete file is an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if the file cannot be parsed or is
    /// missing a field, or [`Error::Io`] if it cannot be read.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("reading decoder params from {}", path.display());

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&contents).map_err(|e| Error::Malformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Save parameters to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        debug!("saving decoder params to {}", path.display());

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json + "\n")?;
        Ok(())
    }
}

// sound/silence segmentation constants, in sample counts
const SILENCE_HORIZON: u32 = 20;
const HOLD: u32 = 2;

// sound runs shorter than this are key bounce, not elements
const MIN_SOUND_RUN: i64 = 3;

/// A run of sound or silence from the level stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Run {
    /// Positive: sound for N samples. Negative: silence for N samples.
    count: i64,
    /// Average level over the run.
    level: u32,
}

/// The adaptive Morse decoder.
#[derive(Debug, Clone)]
pub struct MorseReader {
    params: DecoderParams,
    sent_space: bool,
    sent_word_space: bool,
}

impl MorseReader {
    /// Create a decoder with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::with_params(DecoderParams::default())
    }

    /// Create a decoder with explicit parameters.
    #[must_use]
    pub fn with_params(params: DecoderParams) -> Self {
        Self {
            params,
            sent_space: true,
            sent_word_space: true,
        }
    }

    /// Get the current (possibly adapted) parameters.
    #[must_use]
    pub fn params(&self) -> &DecoderParams {
        &self.params
    }

    /// Get the next sound or silence run from the stream.
    ///
    /// Returns `None` when the stream ends during segmentation.
    fn next_run(&self, src: &mut dyn SampleSource) -> Option<Run> {
        let mut in_sound = false;
        let mut count: i64 = 0;
        let mut hold = HOLD;
        let mut values: Vec<u64> = Vec::new();

        loop {
            let value = src.next_level()?;
            values.push(u64::from(value));

            if in_sound {
                if value < self.params.signal_threshold {
                    hold -= 1;
                    if hold == 0 {
                        // silence at the end of a sound period
                        return Some(Run {
                            count,
                            level: Self::average(&values),
                        });
                    }
                } else {
                    hold = HOLD;
                    count += 1;
                }
            } else if value < self.params.signal_threshold {
                count += 1;
                if count >= i64::from(SILENCE_HORIZON) {
                    return Some(Run {
                        count: -count,
                        level: Self::average(&values),
                    });
                }
            } else {
                // signal appeared, switch to sound
                in_sound = true;
                count = 1;
                values.clear();
                values.push(u64::from(value));
            }
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn average(values: &[u64]) -> u32 {
        if values.is_empty() {
            return 0;
        }
        (values.iter().sum::<u64>() / values.len() as u64) as u32
    }

    /// Decode the next character or gap from the level stream.
    ///
    /// Returns `None` when the stream ends with nothing pending; a
    /// partially keyed character at end of stream is still emitted.
    pub fn read(&mut self, src: &mut dyn SampleSource) -> Option<Decoded> {
        let mut space_count: u32 = 0;
        let mut word_count: u32 = 0;
        let mut elements = String::new();

        loop {
            let Some(run) = self.next_run(src) else {
                // stream ended; flush any pending elements
                if elements.is_empty() {
                    return None;
                }
                return Some(self.emit(elements));
            };

            if run.count > 0 {
                // a sound run
                self.params.max_signal = run.level;
                if run.count < MIN_SOUND_RUN {
                    continue;
                }

                self.sent_word_space = false;
                self.sent_space = false;
                space_count = 0;
                word_count = 0;

                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let count = run.count as u32;
                if count > self.params.dot_dash_threshold {
                    elements.push('-');
                    self.params.len_dash = (self.params.len_dash * 2 + count) / 3;
                } else {
                    elements.push('.');
                    self.params.len_dot = (self.params.len_dot * 2 + count) / 3;
                }
                self.params.dot_dash_threshold =
                    (self.params.len_dot + self.params.len_dash) / 2;
            } else {
                // a silence run
                space_count += 1;
                word_count += 1;
                self.params.min_signal = run.level;

                if space_count >= self.params.char_space {
                    if !elements.is_empty() {
                        return Some(self.emit(elements));
                    }
                    if !self.sent_space {
                        self.sent_space = true;
                        return Some(Decoded::Gap);
                    }
                    space_count = 0;
                }

                if word_count >= self.params.word_space {
                    if !self.sent_word_space {
                        self.sent_word_space = true;
                        return Some(Decoded::Gap);
                    }
                    word_count = 0;
                }
            }

            // track the signal environment
            self.params.signal_threshold =
                (self.params.min_signal + 2 * self.params.max_signal) / 3;
            debug!(
                signal_threshold = self.params.signal_threshold,
                "adapted decoder threshold"
            );
        }
    }

    fn emit(&self, elements: String) -> Decoded {
        Decoded::Character {
            ch: code::char_for(&elements),
            elements,
        }
    }
}

impl Default for MorseReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOUD: u32 = 6000;
    const QUIET: u32 = 100;

    /// Build a level stream: sound runs and silence runs in samples.
    fn stream(runs: &[(bool, usize)]) -> std::vec::IntoIter<u32> {
        let mut levels = Vec::new();
        for &(sound, len) in runs {
            let level = if sound { LOUD } else { QUIET };
            levels.extend(std::iter::repeat(level).take(len));
        }
        levels.into_iter()
    }

    /// A keyed character at default params: dots ~20 samples, dashes ~80,
    /// element gaps ~10, trailed by a long silence.
    fn keyed(elements: &str) -> std::vec::IntoIter<u32> {
        let mut runs = Vec::new();
        for sign in elements.chars() {
            match sign {
                '.' => runs.push((true, 20)),
                '-' => runs.push((true, 80)),
                _ => panic!("bad test element"),
            }
            runs.push((false, 10));
        }
        runs.push((false, 200));
        stream(&runs)
    }

    #[test]
    fn test_decode_single_dot() {
        let mut reader = MorseReader::new();
        let mut src = keyed(".");
        let decoded = reader.read(&mut src).unwrap();
        assert_eq!(
            decoded,
            Decoded::Character {
                ch: Some('E'),
                elements: ".".to_string()
            }
        );
    }

    #[test]
    fn test_decode_single_dash() {
        let mut reader = MorseReader::new();
        let mut src = keyed("-");
        let decoded = reader.read(&mut src).unwrap();
        assert_eq!(
            decoded,
            Decoded::Character {
                ch: Some('T'),
                elements: "-".to_string()
            }
        );
    }

    #[test]
    fn test_decode_letter_a() {
        let mut reader = MorseReader::new();
        let mut src = keyed(".-");
        let decoded = reader.read(&mut src).unwrap();
        assert_eq!(
            decoded,
            Decoded::Character {
                ch: Some('A'),
                elements: ".-".to_string()
            }
        );
    }

    #[test]
    fn test_decode_emits_gap_after_character() {
        let mut reader = MorseReader::new();
        let mut src = keyed(".");
        let first = reader.read(&mut src);
        assert!(matches!(first, Some(Decoded::Character { .. })));
        // trailing silence becomes a gap
        let second = reader.read(&mut src);
        assert_eq!(second, Some(Decoded::Gap));
    }

    #[test]
    fn test_stream_end_returns_none() {
        let mut reader = MorseReader::new();
        let mut src = stream(&[]);
        assert_eq!(reader.read(&mut src), None);
    }

    #[test]
    fn test_short_bounce_ignored() {
        let mut reader = MorseReader::new();
        // a 2-sample blip is key bounce, then a real dot
        let mut src = stream(&[(true, 2), (false, 10), (true, 20), (false, 200)]);
        let decoded = reader.read(&mut src).unwrap();
        assert_eq!(
            decoded,
            Decoded::Character {
                ch: Some('E'),
                elements: ".".to_string()
            }
        );
    }

    #[test]
    fn test_dot_length_adapts() {
        let mut reader = MorseReader::new();
        let before = reader.params().len_dot;
        let mut src = keyed(".");
        reader.read(&mut src);
        let after = reader.params().len_dot;
        // (30*2 + ~20) / 3 pulls the estimate down
        assert!(after < before, "len_dot {before} -> {after}");
    }

    #[test]
    fn test_threshold_adapts_to_levels() {
        let mut reader = MorseReader::new();
        let mut src = keyed("-");
        reader.read(&mut src);
        let params = reader.params();
        assert_eq!(params.max_signal, LOUD);
        assert_eq!(
            params.signal_threshold,
            (params.min_signal + 2 * params.max_signal) / 3
        );
    }

    #[test]
    fn test_unrecognized_elements() {
        let mut reader = MorseReader::new();
        let mut src = keyed("........");
        let decoded = reader.read(&mut src).unwrap();
        assert_eq!(
            decoded,
            Decoded::Character {
                ch: None,
                elements: "........".to_string()
            }
        );
    }

    #[test]
    fn test_pcm_levels_empty_buffer() {
        let mut src = PcmLevels::from_buffer(Vec::new());
        assert_eq!(src.next_level(), None);
    }

    #[test]
    fn test_pcm_levels_silence_reads_zero() {
        let mut src = PcmLevels::from_buffer(vec![0_u8; 256]);
        assert_eq!(src.next_level(), Some(0));
    }

    #[test]
    fn test_pcm_levels_tone_clears_threshold() {
        // a swing comparable to a rendered tone at default volume
        let buffer: Vec<u8> = (0..256).map(|i| if i % 2 == 0 { 0 } else { 89 }).collect();
        let mut src = PcmLevels::from_buffer(buffer);
        let level = src.next_level().unwrap();
        assert!(level > DecoderParams::default().signal_threshold);
    }

    #[test]
    fn test_decode_rendered_audio() {
        let tone = crate::tone::ToneGenerator::new().unwrap();
        let samples = tone.render("E").unwrap();
        let mut src = PcmLevels::from_buffer(samples);
        let mut reader = MorseReader::new();
        let decoded = reader.read(&mut src);
        assert_eq!(
            decoded,
            Some(Decoded::Character {
                ch: Some('E'),
                elements: ".".to_string()
            })
        );
    }

    #[test]
    fn test_params_default() {
        let params = DecoderParams::default();
        assert_eq!(params.len_dot, 30);
        assert_eq!(params.len_dash, 90);
        assert_eq!(params.dot_dash_threshold, 60);
        assert_eq!(params.char_space, 3);
        assert_eq!(params.word_space, 9);
    }

    #[test]
    fn test_params_save_and_load() {
        let path = std::env::temp_dir().join("morsetrainer_params_roundtrip.json");
        let params = DecoderParams {
            len_dot: 25,
            ..DecoderParams::default()
        };
        params.save(&path).unwrap();
        let loaded = DecoderParams::load(&path).unwrap();
        assert_eq!(loaded, params);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_params_load_absent_file_is_default() {
        let loaded = DecoderParams::load("/nonexistent/read_morse.param").unwrap();
        assert_eq!(loaded, DecoderParams::default());
    }

    #[test]
    fn test_params_load_malformed_file() {
        let path = std::env::temp_dir().join("morsetrainer_params_malformed.json");
        std::fs::write(&path, "not json at all").unwrap();
        let result = DecoderParams::load(&path);
        assert!(matches!(result, Err(Error::Malformed { .. })));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_params_incomplete_file_is_error() {
        let path = std::env::temp_dir().join(format!(
            "morsetrainer_params_partial_{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{"len_dot": 40}"#).unwrap();
        let err = DecoderParams::load(&path).unwrap_err();
        assert!(matches!(err, Error::Malformed { .. }));
        assert!(err.to_string().contains("len_dash"));
        let _ = std::fs::remove_file(&path);
    }
}
