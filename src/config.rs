// Configuration file
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::classifier::MIN_TRAINING_SIZE;
use crate::dispatch::CommandSpec;
use crate::gesture::{SegmenterConfig, DEFAULT_MAX_IDLE_GAP};
use crate::state::{get_config_dir, Partition, StorageError};

const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Symbol set to train and recognize
    pub partition: Partition,
    /// Silence (seconds) that ends a stroke
    pub idle_gap_secs: f64,
    /// Also end a stroke as soon as the finger is lifted
    pub end_on_finger_lift: bool,
    /// Strokes collected per training session
    pub training_size: usize,
    /// Touchpad event device, discovered when unset
    pub device_path: Option<PathBuf>,
    /// Model database, the data directory when unset
    pub database_path: Option<PathBuf>,
    /// JSONL file receiving every interpreted stroke
    pub journal_path: Option<PathBuf>,
    /// Commands of user-defined symbols
    pub commands: BTreeMap<String, CommandSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            partition: Partition::UserDefined,
            idle_gap_secs: DEFAULT_MAX_IDLE_GAP,
            end_on_finger_lift: false,
            training_size: 10,
            device_path: None,
            database_path: None,
            journal_path: None,
            commands: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.idle_gap_secs.is_finite() || self.idle_gap_secs <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "idle_gap_secs must be positive, got {}",
                self.idle_gap_secs
            )));
        }
        if self.training_size < MIN_TRAINING_SIZE {
            return Err(ConfigError::Invalid(format!(
                "training_size must be at least {}, got {}",
                MIN_TRAINING_SIZE, self.training_size
            )));
        }
        if let Some((symbol, _)) = self
            .commands
            .iter()
            .find(|(_, spec)| spec.program.trim().is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "command of '{}' has an empty program",
                symbol
            )));
        }
        Ok(())
    }

    /// Load config from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load config from the default location, or defaults if there is none
    pub fn load_default() -> ConfigResult<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn default_path() -> ConfigResult<PathBuf> {
        Ok(get_config_dir()?.join(CONFIG_FILE_NAME))
    }

    pub fn segmenter(&self) -> SegmenterConfig {
        SegmenterConfig {
            max_idle_gap: self.idle_gap_secs,
            end_on_finger_lift: self.end_on_finger_lift,
            ..SegmenterConfig::default()
        }
    }
}
