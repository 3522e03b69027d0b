//! Layered configuration via figment.
//!
//! Defaults, an optional TOML file, and `MORSETRAINER_` environment
//! variables are merged in that order and validated on load.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::session;
use crate::tone;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "morsetrainer";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "attempts.db";

/// Default session state file name, kept in the working directory so
/// external tooling can find it next to the build it times.
const STATE_FILE_NAME: &str = "morse_trainer.state";

/// Default decoder parameter file name.
const PARAMS_FILE_NAME: &str = "read_morse.param";

/// Default timing log file name.
const TIMING_LOG_FILE_NAME: &str = "timeit.log";

/// Everything the trainer can be told through its config file.
///
/// Precedence, highest first: `MORSETRAINER_` environment variables,
/// then the TOML file at `~/.config/morsetrainer/config.toml`, then
/// built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage and file-location configuration.
    pub storage: StorageConfig,
    /// Tone generation configuration.
    pub sound: SoundConfig,
    /// Koch progression configuration.
    pub koch: KochConfig,
    /// Build timing harness configuration.
    pub harness: HarnessConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the attempts database.
    /// Defaults to `~/.local/share/morsetrainer/attempts.db`
    pub database_path: Option<PathBuf>,
    /// Path to the session state file.
    /// Defaults to `./morse_trainer.state`
    pub state_path: Option<PathBuf>,
    /// Path to the decoder parameter file.
    /// Defaults to `./read_morse.param`
    pub params_path: Option<PathBuf>,
    /// Maximum age of stored attempts in days.
    /// Set to 0 for unlimited.
    pub max_age_days: u32,
}

/// Tone generation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    /// Tone frequency in Hz.
    pub frequency: u32,
    /// Playback volume, 0.0 to 1.0.
    pub volume: f64,
}

/// Koch progression configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KochConfig {
    /// Proficiency fraction required to unlock the next character.
    pub threshold: f64,
    /// Results required per character before promotion is considered.
    pub min_sample: usize,
    /// Drill group length. 0 turns grouping off.
    pub group_size: usize,
    /// Number of groups per drill.
    pub group_count: usize,
}

/// Build timing harness configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Build command to time, as program plus arguments.
    pub build_command: Vec<String>,
    /// Path to the timing log.
    /// Defaults to `./timeit.log`
    pub log_path: Option<PathBuf>,
    /// Directory crash reports are swept into.
    /// Defaults to `~/.local/share/morsetrainer/crash_reports`
    pub save_dir: Option<PathBuf>,
    /// Optional label; swept reports land in a subdirectory of this name.
    pub label: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            state_path: None,
            params_path: None,
            max_age_days: 0,
        }
    }
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            frequency: tone::DEFAULT_FREQUENCY,
            volume: tone::DEFAULT_VOLUME,
        }
    }
}

impl Default for KochConfig {
    fn default() -> Self {
        Self {
            threshold: session::DEFAULT_THRESHOLD,
            min_sample: session::DEFAULT_MIN_SAMPLE,
            group_size: 0,
            group_count: 5,
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            build_command: vec!["make".to_string()],
            log_path: None,
            save_dir: None,
            label: None,
        }
    }
}

impl Config {
    /// Load and validate configuration from the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a source fails to parse or a value fails
    /// validation.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Like [`Config::load`] but reading the TOML file at `config_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if a source fails to parse or a value fails
    /// validation.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("MORSETRAINER_").split("_"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Where the config file lives when the user has not said otherwise.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Base directory for the database and swept crash reports.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Reject settings no drill could run with.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first out-of-range value.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.sound.volume) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "volume ({}) must be between 0.0 and 1.0",
                    self.sound.volume
                ),
            });
        }

        if self.sound.frequency == 0 || self.sound.frequency > tone::SAMPLE_RATE / 2 {
            return Err(Error::ConfigValidation {
                message: format!(
                    "frequency ({}) must be between 1 and {} Hz",
                    self.sound.frequency,
                    tone::SAMPLE_RATE / 2
                ),
            });
        }

        if !(0.0..=1.0).contains(&self.koch.threshold) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "koch threshold ({}) must be between 0.0 and 1.0",
                    self.koch.threshold
                ),
            });
        }

        if self.koch.min_sample == 0 {
            return Err(Error::ConfigValidation {
                message: "koch min_sample must be greater than 0".to_string(),
            });
        }

        if self.koch.group_count == 0 {
            return Err(Error::ConfigValidation {
                message: "koch group_count must be greater than 0".to_string(),
            });
        }

        if self.harness.build_command.is_empty() {
            return Err(Error::ConfigValidation {
                message: "harness build_command must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// The attempts database, configured or default.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// The session state file, configured or default.
    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.storage
            .state_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(STATE_FILE_NAME))
    }

    /// The decoder parameter file, configured or default.
    #[must_use]
    pub fn params_path(&self) -> PathBuf {
        self.storage
            .params_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(PARAMS_FILE_NAME))
    }

    /// The timing log, configured or default.
    #[must_use]
    pub fn timing_log_path(&self) -> PathBuf {
        self.harness
            .log_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(TIMING_LOG_FILE_NAME))
    }

    /// Where swept crash reports land.
    ///
    /// A configured label adds a subdirectory of that name.
    #[must_use]
    pub fn crash_save_dir(&self) -> PathBuf {
        let base = self
            .harness
            .save_dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("crash_reports"));
        match &self.harness.label {
            Some(label) => base.join(label),
            None => base,
        }
    }

    /// Retention window for stored attempts, `None` for keep-forever.
    #[must_use]
    pub fn max_age(&self) -> Option<chrono::Duration> {
        if self.storage.max_age_days == 0 {
            None
        } else {
            Some(chrono::Duration::days(i64::from(self.storage.max_age_days)))
        }
    }

    /// Promotion criteria from the Koch section.
    #[must_use]
    pub fn koch_settings(&self) -> session::KochSettings {
        session::KochSettings {
            min_sample: self.koch.min_sample,
            threshold: self.koch.threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.sound.frequency, 700);
        assert!((config.sound.volume - 0.7).abs() < 1e-9);
        assert!((config.koch.threshold - 0.9).abs() < 1e-9);
        assert_eq!(config.koch.min_sample, 50);
        assert_eq!(config.harness.build_command, vec!["make".to_string()]);
    }

    #[test]
    fn test_default_storage_config() {
        let storage = StorageConfig::default();

        assert!(storage.database_path.is_none());
        assert!(storage.state_path.is_none());
        assert!(storage.params_path.is_none());
        assert_eq!(storage.max_age_days, 0);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_volume() {
        let mut config = Config::default();
        config.sound.volume = 1.5;

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("volume"));
    }

    #[test]
    fn test_validate_bad_frequency() {
        let mut config = Config::default();
        config.sound.frequency = 0;
        assert!(config.validate().is_err());

        config.sound.frequency = tone::SAMPLE_RATE;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("frequency"));
    }

    #[test]
    fn test_validate_bad_threshold() {
        let mut config = Config::default();
        config.koch.threshold = 1.1;

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("threshold"));
    }

    #[test]
    fn test_validate_zero_min_sample() {
        let mut config = Config::default();
        config.koch.min_sample = 0;

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("min_sample"));
    }

    #[test]
    fn test_validate_zero_group_count() {
        let mut config = Config::default();
        config.koch.group_count = 0;

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("group_count"));
    }

    #[test]
    fn test_validate_empty_build_command() {
        let mut config = Config::default();
        config.harness.build_command.clear();

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("build_command"));
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        let path = config.database_path();

        assert!(path.to_string_lossy().contains("attempts.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/srv/morse/history.db"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/srv/morse/history.db")
        );
    }

    #[test]
    fn test_state_path_default() {
        let config = Config::default();
        assert_eq!(config.state_path(), PathBuf::from("morse_trainer.state"));
    }

    #[test]
    fn test_params_path_default() {
        let config = Config::default();
        assert_eq!(config.params_path(), PathBuf::from("read_morse.param"));
    }

    #[test]
    fn test_timing_log_path_default() {
        let config = Config::default();
        assert_eq!(config.timing_log_path(), PathBuf::from("timeit.log"));
    }

    #[test]
    fn test_crash_save_dir_default() {
        let config = Config::default();
        let dir = config.crash_save_dir();
        assert!(dir.to_string_lossy().contains("crash_reports"));
    }

    #[test]
    fn test_crash_save_dir_with_label() {
        let mut config = Config::default();
        config.harness.label = Some("baseline".to_string());

        let dir = config.crash_save_dir();
        assert!(dir.ends_with("crash_reports/baseline"));
    }

    #[test]
    fn test_max_age_none_when_zero() {
        let config = Config::default();
        assert!(config.max_age().is_none());
    }

    #[test]
    fn test_max_age_some_when_set() {
        let mut config = Config::default();
        config.storage.max_age_days = 30;
        assert_eq!(config.max_age(), Some(chrono::Duration::days(30)));
    }

    #[test]
    fn test_koch_settings() {
        let config = Config::default();
        let koch = config.koch_settings();
        assert_eq!(koch.min_sample, 50);
        assert!((koch.threshold - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("morsetrainer"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_default_data_dir() {
        let path = Config::default_data_dir();
        assert!(path.to_string_lossy().contains("morsetrainer"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        // A missing file is not an error; the defaults stand in.
        let result = Config::load_from(Some(PathBuf::from("/no/such/config.toml")));
        assert!(result.is_ok());

        let config = result.unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_serialize() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("build_command"));
        assert!(json.contains("frequency"));
    }

    #[test]
    fn test_koch_config_deserialize() {
        let json = r#"{"threshold": 0.8, "min_sample": 25}"#;
        let koch: KochConfig = serde_json::from_str(json).unwrap();
        assert!((koch.threshold - 0.8).abs() < 1e-9);
        assert_eq!(koch.min_sample, 25);
        // unset fields keep defaults
        assert_eq!(koch.group_count, 5);
    }

    #[test]
    fn test_config_clone() {
        let config = Config::default();
        let cloned = config.clone();
        assert_eq!(config, cloned);
    }
}
