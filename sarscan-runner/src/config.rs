//! Scanner configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid config.
//! Credentials are never part of this struct; they come from the environment.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sarscan_core::strategy::StrategyConfig;

/// Upper bound on `data.max_retries`.
pub const MAX_RETRIES: u32 = 5;

/// Unique identifier for a run configuration (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {field} {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialize(String),
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Where bars come from and how much history to request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Calendar days of history fetched for a scan.
    pub scan_lookback_days: u32,
    /// Calendar days of history fetched for a backtest.
    pub backtest_lookback_days: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            scan_lookback_days: 365,
            backtest_lookback_days: 730,
            timeout_secs: 20,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Send the report to LINE when credentials are present.
    pub enabled: bool,
    /// Message payload limit, in characters.
    pub max_chars: usize,
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_chars: 4900,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Most recent trades listed per ticker in a backtest block.
    pub recent_trades: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { recent_trades: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub watchlist: Vec<String>,
    /// Process tickers on the rayon pool.
    pub parallel: bool,
    pub strategy: StrategyConfig,
    pub data: DataConfig,
    pub notify: NotifyConfig,
    pub report: ReportConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            watchlist: [
                "2330.TW", "00878.TW", "00919.TW", "0050.TW", "2308.TW", "2454.TW", "2886.TW",
                "6919.TW", "2408.TW", "3293.TW", "6153.TW", "6177.TW",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            parallel: false,
            strategy: StrategyConfig::default(),
            data: DataConfig::default(),
            notify: NotifyConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl ScanConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Reject configurations that cannot produce meaningful output.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watchlist.iter().all(|t| t.trim().is_empty()) {
            return Err(invalid("watchlist", "must name at least one ticker"));
        }

        self.strategy.validate().map_err(|e| ConfigError::Invalid {
            field: e.field(),
            reason: e.reason(),
        })?;

        if self.notify.max_chars == 0 {
            return Err(invalid("notify.max_chars", "must be at least 1"));
        }
        if self.notify.timeout_secs == 0 {
            return Err(invalid("notify.timeout_secs", "must be at least 1"));
        }
        if self.data.scan_lookback_days == 0 || self.data.backtest_lookback_days == 0 {
            return Err(invalid("data", "lookback windows must be at least one day"));
        }
        if self.data.timeout_secs == 0 {
            return Err(invalid("data.timeout_secs", "must be at least 1"));
        }
        if self.data.max_retries > MAX_RETRIES {
            return Err(invalid(
                "data.max_retries",
                format!("{} exceeds {MAX_RETRIES}", self.data.max_retries),
            ));
        }
        Ok(())
    }

    /// Computes a deterministic hash ID for this configuration.
    ///
    /// Two runs with identical configs share the same RunId.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
