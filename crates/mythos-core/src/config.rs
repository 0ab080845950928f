//! Configuration loading and typed config structures for the Mythos ledger.
//!
//! The canonical configuration lives in `mythos-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads and validates the file.
//! Every field has a default, so an empty file is a valid configuration.

use std::path::{Path, PathBuf};

use mythos_ledger::WeightBounds;
use serde::Deserialize;

use crate::threshold::{Threshold, Thresholds};

/// Environment variable overriding [`StorageConfig::data_dir`].
pub const DATA_DIR_ENV: &str = "MYTHOS_DATA_DIR";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but breaks a rule.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Which rule was broken.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `mythos-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MythosConfig {
    /// Where the log, snapshot and export live.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Thresholds, windows and weight bounds.
    #[serde(default)]
    pub evolution: EvolutionConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl MythosConfig {
    /// Load configuration from a YAML file, apply environment overrides and
    /// validate it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value breaks a rule.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.storage.apply_env_overrides();
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value breaks a rule.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first broken rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.evolution.validate()
    }
}

/// File locations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Directory holding every persisted file.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Event log file name, relative to `data_dir`.
    #[serde(default = "default_events_file")]
    pub events_file: String,

    /// Snapshot file name, relative to `data_dir`.
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: String,

    /// Export document file name, relative to `data_dir`.
    #[serde(default = "default_export_file")]
    pub export_file: String,
}

impl StorageConfig {
    /// Override the data directory with `MYTHOS_DATA_DIR` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(DATA_DIR_ENV) {
            if !val.trim().is_empty() {
                self.data_dir = PathBuf::from(val);
            }
        }
    }

    /// Full path of the event log.
    pub fn events_path(&self) -> PathBuf {
        self.data_dir.join(&self.events_file)
    }

    /// Full path of the snapshot.
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(&self.snapshot_file)
    }

    /// Full path of the export document.
    pub fn export_path(&self) -> PathBuf {
        self.data_dir.join(&self.export_file)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            events_file: default_events_file(),
            snapshot_file: default_snapshot_file(),
            export_file: default_export_file(),
        }
    }
}

/// Evolution parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EvolutionConfig {
    /// Ascending `(stage, required_count)` pairs.
    #[serde(default = "default_thresholds")]
    pub thresholds: Vec<Threshold>,

    /// Capacity of each persona's context window.
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// How many recent contexts phrase generation draws fragments from.
    #[serde(default = "default_phrase_window")]
    pub phrase_window: usize,

    /// Smallest emotional weight accepted on invocations.
    #[serde(default = "default_weight_min")]
    pub weight_min: u8,

    /// Largest emotional weight accepted on invocations. At most 10.
    #[serde(default = "default_weight_max")]
    pub weight_max: u8,

    /// Whether an empty store starts with the canonical roster.
    #[serde(default = "default_true")]
    pub seed_roster: bool,

    /// Whether opening a store compares it against a full replay.
    #[serde(default)]
    pub verify_on_open: bool,
}

impl EvolutionConfig {
    /// Accepted weight range.
    pub const fn weight_bounds(&self) -> WeightBounds {
        WeightBounds {
            min: self.weight_min,
            max: self.weight_max,
        }
    }

    /// Validated threshold table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the pairs are not strictly
    /// ascending in both stage and count.
    pub fn threshold_table(&self) -> Result<Thresholds, ConfigError> {
        Thresholds::new(self.thresholds.clone())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.threshold_table()?;
        if self.context_window == 0 {
            return Err(ConfigError::Invalid {
                reason: "evolution.context_window must be at least 1".to_owned(),
            });
        }
        if self.phrase_window == 0 {
            return Err(ConfigError::Invalid {
                reason: "evolution.phrase_window must be at least 1".to_owned(),
            });
        }
        if self.weight_min > self.weight_max {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "evolution.weight_min ({}) exceeds weight_max ({})",
                    self.weight_min, self.weight_max
                ),
            });
        }
        if self.weight_max > WeightBounds::SCALE.max {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "evolution.weight_max ({}) is above the weight scale ({})",
                    self.weight_max,
                    WeightBounds::SCALE.max
                ),
            });
        }
        Ok(())
    }
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            thresholds: default_thresholds(),
            context_window: default_context_window(),
            phrase_window: default_phrase_window(),
            weight_min: default_weight_min(),
            weight_max: default_weight_max(),
            seed_roster: true,
            verify_on_open: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_data_dir() -> PathBuf {
    PathBuf::from("mythos-data")
}

fn default_events_file() -> String {
    "events.jsonl".to_owned()
}

fn default_snapshot_file() -> String {
    "snapshot.json".to_owned()
}

fn default_export_file() -> String {
    "mythos-export.yaml".to_owned()
}

fn default_thresholds() -> Vec<Threshold> {
    Thresholds::default().rows().to_vec()
}

const fn default_context_window() -> usize {
    20
}

const fn default_phrase_window() -> usize {
    10
}

const fn default_weight_min() -> u8 {
    0
}

const fn default_weight_max() -> u8 {
    10
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = MythosConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.evolution.context_window, 20);
        assert_eq!(config.evolution.thresholds.len(), 5);
        assert_eq!(config.evolution.weight_bounds(), WeightBounds::default());
        assert!(config.evolution.seed_roster);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
storage:
  data_dir: "/var/lib/mythos"
  events_file: "log.jsonl"
  snapshot_file: "state.json"
  export_file: "presets.yaml"

evolution:
  thresholds:
    - { stage: 1, required_count: 3 }
    - { stage: 2, required_count: 6 }
  context_window: 5
  phrase_window: 3
  weight_min: 1
  weight_max: 9
  seed_roster: false
  verify_on_open: true

logging:
  level: "debug"
  json: true
"#;
        let config = MythosConfig::parse(yaml);
        assert!(config.is_ok(), "{config:?}");
        let config = config.ok().unwrap_or_default();

        assert_eq!(
            config.storage.events_path(),
            PathBuf::from("/var/lib/mythos/log.jsonl")
        );
        assert_eq!(config.evolution.thresholds.len(), 2);
        assert_eq!(config.evolution.context_window, 5);
        assert_eq!(config.evolution.weight_bounds().max, 9);
        assert!(!config.evolution.seed_roster);
        assert!(config.evolution.verify_on_open);
        assert!(config.logging.json);
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = MythosConfig::parse("evolution:\n  context_window: 4\n");
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.evolution.context_window, 4);
        // Everything else uses defaults
        assert_eq!(config.evolution.thresholds.len(), 5);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parse_empty_yaml() {
        assert!(MythosConfig::parse("").is_ok());
    }

    #[test]
    fn descending_thresholds_rejected() {
        let yaml = r"
evolution:
  thresholds:
    - { stage: 1, required_count: 20 }
    - { stage: 2, required_count: 10 }
";
        assert!(matches!(
            MythosConfig::parse(yaml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn zero_window_rejected() {
        assert!(matches!(
            MythosConfig::parse("evolution:\n  context_window: 0\n"),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn inverted_weight_bounds_rejected() {
        let yaml = "evolution:\n  weight_min: 8\n  weight_max: 2\n";
        assert!(matches!(
            MythosConfig::parse(yaml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn weight_max_above_scale_rejected() {
        assert!(matches!(
            MythosConfig::parse("evolution:\n  weight_max: 11\n"),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("mythos-config.yaml");
        if path.exists() {
            let config = MythosConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
