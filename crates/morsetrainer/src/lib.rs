//! `morsetrainer` - a Koch-method Morse code trainer
//!
//! This library provides the core functionality for practicing Morse code:
//! encoding text to dot/dash elements, Farnsworth-timed tone synthesis,
//! adaptive decoding of keyed input, proficiency tracking with Koch-method
//! charset progression, and a build timing harness for hands-free test loops.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod code;
pub mod config;
pub mod error;
pub mod harness;
pub mod logging;
pub mod reader;
pub mod session;
pub mod stats;
pub mod storage;
pub mod timing;
pub mod tone;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use reader::{Decoded, DecoderParams, MorseReader, PcmLevels};
pub use session::{Mode, SessionState};
pub use stats::CharStats;
pub use storage::{Attempt, Storage, StorageStats};
pub use tone::ToneGenerator;
