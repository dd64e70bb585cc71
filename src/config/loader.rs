/// Configuration loading from TOML file
use std::path::Path;
use std::time::Duration;

use crate::data::{SymbolMode, ThresholdConfig, ThresholdPolicy};
use crate::error::{BarError, Result};

use super::AppConfig;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| BarError::ConfigError(format!("Failed to read config file: {}", e)))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(content)
        .map_err(|e| BarError::ConfigError(format!("Failed to parse config: {}", e)))?;

    // Validate config
    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &AppConfig) -> Result<()> {
    ThresholdPolicy::from_config(config.threshold)?;

    if config.stream.resubscribe_cooldown_secs == 0 {
        return Err(BarError::ConfigError(
            "stream.resubscribe_cooldown_secs must be >= 1".to_string(),
        ));
    }

    let url = &config.stream.url;
    if !(url.starts_with("ws://") || url.starts_with("wss://")) {
        return Err(BarError::ConfigError(format!("Invalid stream.url: {}", url)));
    }

    if config.csv.enabled && config.csv_prefix().trim().is_empty() {
        return Err(BarError::ConfigError("csv.prefix is empty".to_string()));
    }

    if config.memory.capacity == 0 {
        return Err(BarError::ConfigError("memory.capacity must be >= 1".to_string()));
    }

    Ok(())
}

/// Read the newline-delimited symbol list
pub fn load_symbols<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        BarError::ConfigError(format!("Failed to read symbols file {}: {}", path.display(), e))
    })?;

    let symbols = parse_symbols(&content);
    if symbols.is_empty() {
        return Err(BarError::ConfigError(format!(
            "No symbols in {}",
            path.display()
        )));
    }

    Ok(symbols)
}

/// Trimmed, upper-cased, de-duplicated (first occurrence wins), blanks skipped
pub fn parse_symbols(content: &str) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();

    for line in content.lines() {
        let symbol = line.trim().to_uppercase();
        if symbol.is_empty() || symbols.contains(&symbol) {
            continue;
        }
        symbols.push(symbol);
    }

    symbols
}

impl AppConfig {
    pub fn policy(&self) -> Result<ThresholdPolicy> {
        ThresholdPolicy::from_config(self.threshold)
    }

    pub fn symbol_mode(&self) -> SymbolMode {
        if self.strict_symbols {
            SymbolMode::Strict
        } else {
            SymbolMode::Lenient
        }
    }

    pub fn resubscribe_cooldown(&self) -> Duration {
        Duration::from_secs(self.stream.resubscribe_cooldown_secs)
    }

    /// Explicit prefix, else one named after the bar family
    pub fn csv_prefix(&self) -> String {
        match &self.csv.prefix {
            Some(prefix) => prefix.clone(),
            None => match self.threshold {
                ThresholdConfig::TickCount(_) => "TickBars".to_string(),
                ThresholdConfig::Volume(_) => "VolumeBars".to_string(),
                ThresholdConfig::DollarValue(_) => "DollarBars".to_string(),
            },
        }
    }
}
