pub mod loader;

pub use loader::{load_config, load_symbols, parse_config, parse_symbols};

use std::path::PathBuf;

use serde::Deserialize;

use crate::broker::BINANCE_WS_URL;
use crate::data::ThresholdConfig;

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_symbols_file")]
    pub symbols_file: PathBuf,

    /// Fail on trades for untracked symbols instead of dropping them
    #[serde(default)]
    pub strict_symbols: bool,

    pub threshold: ThresholdConfig,

    #[serde(default)]
    pub csv: CsvConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub stream: StreamConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CsvConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub prefix: Option<String>,
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
}

impl Default for CsvConfig {
    fn default() -> Self {
        CsvConfig {
            enabled: true,
            prefix: None,
            directory: default_directory(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_memory_capacity")]
    pub capacity: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        MemoryConfig {
            capacity: default_memory_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "default_stream_url")]
    pub url: String,
    #[serde(default = "default_cooldown_secs")]
    pub resubscribe_cooldown_secs: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            url: default_stream_url(),
            resubscribe_cooldown_secs: default_cooldown_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_symbols_file() -> PathBuf {
    PathBuf::from("ticks.txt")
}

fn default_true() -> bool {
    true
}

fn default_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_memory_capacity() -> usize {
    500
}

fn default_stream_url() -> String {
    BINANCE_WS_URL.to_string()
}

fn default_cooldown_secs() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}
