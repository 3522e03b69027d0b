//! Morse tone synthesis.
//!
//! Renders well-formed Morse as 8-bit unsigned PCM sample buffers. There
//! is deliberately no audio device here; callers write the samples to a
//! file or hand them to whatever playback they have.

use tracing::debug;

use crate::code;
use crate::error::{Error, Result};
use crate::timing;

/// Samples per second of the rendered PCM.
pub const SAMPLE_RATE: u32 = 14_400;

/// Default character speed (words per minute).
pub const DEFAULT_CWPM: u32 = 10;

/// Default word speed (words per minute).
pub const DEFAULT_WPM: u32 = 5;

/// Default volume, in `[0.0, 1.0]`.
pub const DEFAULT_VOLUME: f64 = 0.7;

/// Default tone frequency in hertz.
pub const DEFAULT_FREQUENCY: u32 = 700;

/// Number of sine cycles over which a tone ramps in and out.
const LEAD_IN_OUT_CYCLES: usize = 3;

/// Renders Morse element tones and silences as PCM buffers.
///
/// The five element buffers are built once per settings change and
/// concatenated when rendering strings.
#[derive(Debug, Clone)]
pub struct ToneGenerator {
    cwpm: u32,
    wpm: u32,
    volume: f64,
    frequency: u32,

    dot_sound: Vec<u8>,
    dash_sound: Vec<u8>,
    inter_element_silence: Vec<u8>,
    inter_char_silence: Vec<u8>,
    inter_word_silence: Vec<u8>,
}

impl ToneGenerator {
    /// Create a generator with the default speeds, volume, and frequency.
    ///
    /// # Errors
    ///
    /// Returns an error if the element buffers cannot be built.
    pub fn new() -> Result<Self> {
        Self::with_settings(DEFAULT_CWPM, DEFAULT_WPM, DEFAULT_VOLUME, DEFAULT_FREQUENCY)
    }

    /// Create a generator with explicit settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSpeed`] for zero speeds and
    /// [`Error::ConfigValidation`] for an unusable volume or frequency.
    pub fn with_settings(cwpm: u32, wpm: u32, volume: f64, frequency: u32) -> Result<Self> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(Error::ConfigValidation {
                message: format!("volume ({volume}) must be in [0.0, 1.0]"),
            });
        }
        if frequency == 0 || frequency > SAMPLE_RATE / 2 {
            return Err(Error::ConfigValidation {
                message: format!("frequency ({frequency} Hz) must be in (0, {}]", SAMPLE_RATE / 2),
            });
        }

        let mut tone = Self {
            cwpm,
            wpm,
            volume,
            frequency,
            dot_sound: Vec::new(),
            dash_sound: Vec::new(),
            inter_element_silence: Vec::new(),
            inter_char_silence: Vec::new(),
            inter_word_silence: Vec::new(),
        };
        tone.create_sounds()?;
        Ok(tone)
    }

    /// Get the current `(cwpm, wpm)` speeds.
    #[must_use]
    pub fn speeds(&self) -> (u32, u32) {
        (self.cwpm, self.wpm)
    }

    /// Set the morse speeds and rebuild the element buffers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSpeed`] if either speed is zero.
    pub fn set_speeds(&mut self, cwpm: u32, wpm: u32) -> Result<()> {
        self.cwpm = cwpm;
        self.wpm = wpm;
        self.create_sounds()
    }

    /// Set the volume and rebuild the element buffers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] for a volume outside `[0.0, 1.0]`.
    pub fn set_volume(&mut self, volume: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(Error::ConfigValidation {
                message: format!("volume ({volume}) must be in [0.0, 1.0]"),
            });
        }
        self.volume = volume;
        self.create_sounds()
    }

    /// Set the tone frequency and rebuild the element buffers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] for an unusable frequency.
    pub fn set_frequency(&mut self, frequency: u32) -> Result<()> {
        if frequency == 0 || frequency > SAMPLE_RATE / 2 {
            return Err(Error::ConfigValidation {
                message: format!("frequency ({frequency} Hz) must be in (0, {}]", SAMPLE_RATE / 2),
            });
        }
        self.frequency = frequency;
        self.create_sounds()
    }

    /// Build a sine-wave buffer of roughly `duration` seconds.
    ///
    /// A short amplitude ramp at each end avoids key clicks.
    fn make_tone(&self, duration: f64, volume: f64) -> Vec<u8> {
        // amplitude midpoint of 8-bit unsigned samples
        let max_value = f64::from(2_u32.pow(7) / 2);

        let num_cycle_samples = (SAMPLE_RATE / self.frequency) as usize;
        let mut cycle = Vec::with_capacity(num_cycle_samples);
        for n in 0..num_cycle_samples {
            #[allow(clippy::cast_precision_loss)]
            let phase = 2.0 * std::f64::consts::PI * n as f64 / num_cycle_samples as f64;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            cycle.push(((phase.sin() * max_value + max_value) * volume) as u8);
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let num_cycles = (f64::from(self.frequency) * duration) as usize;
        let mut data = Vec::with_capacity(num_cycles * num_cycle_samples);
        for _ in 0..num_cycles {
            data.extend_from_slice(&cycle);
        }

        // lead-in and lead-out ramps
        let lead_samples = (num_cycle_samples * LEAD_IN_OUT_CYCLES).min(data.len() / 2);
        let len = data.len();
        for i in 0..lead_samples {
            #[allow(clippy::cast_precision_loss)]
            let scale = i as f64 / lead_samples as f64;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                data[i] = (f64::from(data[i]) * scale) as u8;
                data[len - 1 - i] = (f64::from(data[len - 1 - i]) * scale) as u8;
            }
        }

        data
    }

    /// Rebuild the five element buffers from the current settings.
    fn create_sounds(&mut self) -> Result<()> {
        let times = timing::element_times(self.cwpm, self.wpm)?;

        debug!(
            cwpm = self.cwpm,
            wpm = self.wpm,
            dot_secs = times.dot,
            "rebuilding element buffers"
        );

        self.dot_sound = self.make_tone(times.dot, self.volume);
        self.dash_sound = self.make_tone(times.dash, self.volume);
        self.inter_element_silence = self.make_tone(times.inter_element, 0.0);
        self.inter_char_silence = self.make_tone(times.inter_char, 0.0);
        self.inter_word_silence = self.make_tone(times.inter_word, 0.0);
        Ok(())
    }

    /// Render the characters in `text` to one PCM buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCharacter`] for characters that have no
    /// Morse encoding.
    pub fn render(&self, text: &str) -> Result<Vec<u8>> {
        let mut samples = Vec::new();

        for ch in text.chars() {
            if ch == ' ' {
                samples.extend_from_slice(&self.inter_word_silence);
                continue;
            }
            let elements = code::elements_for(ch).ok_or(Error::UnknownCharacter { ch })?;
            for sign in elements.chars() {
                match sign {
                    '.' => samples.extend_from_slice(&self.dot_sound),
                    '-' => samples.extend_from_slice(&self.dash_sound),
                    _ => {}
                }
                samples.extend_from_slice(&self.inter_element_silence);
            }
            samples.extend_from_slice(&self.inter_char_silence);
        }

        Ok(samples)
    }

    /// Duration in seconds of a rendered sample buffer.
    #[must_use]
    pub fn duration_of(samples: &[u8]) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        {
            samples.len() as f64 / f64::from(SAMPLE_RATE)
        }
    }
}
