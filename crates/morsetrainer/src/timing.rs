//! Morse timing calculations.
//!
//! Farnsworth spacing, element durations, and the interpolation between
//! decoder dot-length units and words-per-minute speeds.

use crate::error::{Error, Result};

/// Words/minute below which we use the Farnsworth timing method.
pub const FARNSWORTH_THRESHOLD: u32 = 18;

/// The speed step the UI moves in; speeds are kept to multiples of this.
pub const SPEED_STEP: u32 = 5;

/// Calibration points `(dot_units, wpm)` used to interpolate between the
/// decoder's dot-length units and WPM speeds.
///
/// Sentinel values at both ends; MUST BE SORTED ON WPM. This is arbitrary
/// and will probably need adjustment.
const CALIBRATION: &[(u32, u32)] = &[
    (120, 0),
    (120, 5),
    (60, 10),
    (40, 15),
    (30, 20),
    (24, 25),
    (20, 30),
    (17, 35),
    (15, 40),
    (13, 45),
    (10, 50),
];

/// Durations (seconds) of the five Morse elements at some speed pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementTimes {
    /// Duration of a dot tone.
    pub dot: f64,
    /// Duration of a dash tone (three dots).
    pub dash: f64,
    /// Silence between elements of one character.
    pub inter_element: f64,
    /// Silence between characters.
    pub inter_char: f64,
    /// Silence between words.
    pub inter_word: f64,
}

/// Calculate Farnsworth spacing.
///
/// Returns `(dot_time, stretched_dot_time)` in seconds. The stretched dot
/// time is used to calculate the inter-char and inter-word spacings in
/// Farnsworth mode: characters sound at `cwpm` but the gaps are widened
/// until the overall rate falls to `wpm`.
///
/// # Errors
///
/// Returns [`Error::InvalidSpeed`] if either speed is zero.
pub fn farnsworth_times(cwpm: u32, wpm: u32) -> Result<(f64, f64)> {
    if cwpm == 0 || wpm == 0 {
        return Err(Error::invalid_speed(format!(
            "cwpm ({cwpm}) and wpm ({wpm}) must both be greater than 0"
        )));
    }

    let dot_time = 1.2 / f64::from(cwpm);
    let word_time_cwpm = 60.0 / f64::from(cwpm);
    let word_time_wpm = 60.0 / f64::from(wpm);

    // a standard word is 50 units, 19 of which are inter-char/word gaps
    let delta_per_word = word_time_wpm - word_time_cwpm;
    let stretched_dot_time = dot_time + delta_per_word / 19.0;

    Ok((dot_time, stretched_dot_time))
}

/// Calculate the element durations for a speed pair.
///
/// Below [`FARNSWORTH_THRESHOLD`] the inter-char and inter-word gaps are
/// stretched to slow the effective word rate.
///
/// # Errors
///
/// Returns [`Error::InvalidSpeed`] if either speed is zero.
pub fn element_times(cwpm: u32, wpm: u32) -> Result<ElementTimes> {
    let (dot_time, dot_time_f) = farnsworth_times(cwpm, wpm)?;

    let mut times = ElementTimes {
        dot: dot_time,
        dash: 3.0 * dot_time,
        inter_element: dot_time,
        inter_char: 3.0 * dot_time,
        inter_word: 7.0 * dot_time,
    };

    if wpm < FARNSWORTH_THRESHOLD {
        times.inter_char = 3.0 * dot_time_f;
        times.inter_word = 7.0 * dot_time_f;
    }

    Ok(times)
}

/// Convert a WPM speed to decoder dot-length units by interpolation.
///
/// Returns `None` for speeds beyond the calibration table.
#[must_use]
pub fn wpm_to_dot_units(wpm: u32) -> Option<u32> {
    let mut low_units = 0u32;
    let mut low_wpm = 0u32;

    for &(units, cal_wpm) in CALIBRATION {
        if cal_wpm > wpm {
            // first calibration point with a faster speed, interpolate
            let unit_range = f64::from(low_units) - f64::from(units);
            let wpm_range = f64::from(cal_wpm - low_wpm);
            let delta = f64::from(cal_wpm - wpm);
            let ratio = delta / wpm_range;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            return Some((f64::from(units) + ratio * unit_range) as u32);
        }
        low_units = units;
        low_wpm = cal_wpm;
    }
    None
}

/// Convert decoder dot-length units to a WPM speed by interpolation.
///
/// Returns `None` for dot lengths beyond the calibration table.
#[must_use]
pub fn dot_units_to_wpm(dot_units: u32) -> Option<u32> {
    // dots longer than the slowest calibration entry are off the table
    let &(slowest_units, _) = CALIBRATION.first()?;
    if dot_units > slowest_units {
        return None;
    }

    let mut low_units = 0u32;
    let mut low_wpm = 0u32;

    for &(units, cal_wpm) in CALIBRATION {
        if units < dot_units {
            // first calibration point with a shorter dot, interpolate
            let wpm_range = f64::from(cal_wpm - low_wpm);
            let unit_range = f64::from(low_units - units);
            let delta = f64::from(low_units) - f64::from(dot_units);
            let ratio = delta / unit_range;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            return Some((f64::from(low_wpm) + ratio * wpm_range) as u32);
        }
        low_units = units;
        low_wpm = cal_wpm;
    }
    None
}

/// Round a speed to the nearest multiple of `step`.
#[must_use]
pub fn round_to_step(value: u32, step: u32) -> u32 {
    if step == 0 {
        return value;
    }
    (value + step / 2) / step * step
}
