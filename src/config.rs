use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config yaml: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub top_up: TopUpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend endpoint settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageConfig {
    pub cache_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./data/cache"),
        }
    }
}

/// Send-money wizard tuning
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TransferConfig {
    /// Directory search fires once the query has at least this many chars
    pub search_min_chars: usize,
    pub search_debounce_ms: u64,
    pub max_note_chars: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            search_min_chars: 3,
            search_debounce_ms: 300,
            max_note_chars: 140,
        }
    }
}

impl TransferConfig {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

/// Top-up limits in whole shillings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TopUpConfig {
    pub min_amount: u64,
    pub max_amount: u64,
}

impl Default for TopUpConfig {
    fn default() -> Self {
        Self {
            min_amount: 10,
            max_amount: 150_000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    /// Extra `EnvFilter` directives, e.g. `pesasoft_core::transfer=debug`
    #[serde(default)]
    pub directives: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: "./logs".to_string(),
            log_file: "pesasoft.log".to_string(),
            use_json: false,
            rotation: "daily".to_string(),
            directives: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Load `config/{env}.yaml`
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        Self::from_file(&format!("config/{}.yaml", env))
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }
}
