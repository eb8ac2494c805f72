//! Scan configuration file.
//!
//! ```toml
//! data_dir = "stock_data"
//! names = "stock_names.csv"
//! output_dir = "results"
//! workers = 8
//! top_n = 30
//!
//! [strategy]
//! preset = "volume_reversal"
//! ```
//!
//! `[strategy]` is either `preset = "<name>"` or a full inline strategy table.
//! Command-line flags override file values.

use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use revscan_core::signal::StrategyPreset;
use revscan_core::strategy::{StrategyConfig, StrategyError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("strategy: {0}")]
    Strategy(#[from] StrategyError),

    #[error("worker count must be >= 1")]
    NoWorkers,

    #[error("UTC offset {0}h is out of range")]
    BadOffset(i32),
}

/// Which strategy a scan runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StrategySpec {
    Preset { preset: StrategyPreset },
    Inline(Box<StrategyConfig>),
}

impl Default for StrategySpec {
    fn default() -> Self {
        Self::Preset {
            preset: StrategyPreset::MildOversold,
        }
    }
}

impl StrategySpec {
    pub fn resolve(&self) -> Result<StrategyConfig, StrategyError> {
        let config = match self {
            Self::Preset { preset } => preset.to_config(),
            Self::Inline(config) => config.as_ref().clone(),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Everything one scan run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// CSV of (code, name). Missing file means every name is "unknown".
    #[serde(default)]
    pub names: Option<PathBuf>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Pool size; defaults to the available parallelism.
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub max_workers: Option<usize>,
    /// Keep only the best N results.
    #[serde(default)]
    pub top_n: Option<usize>,
    /// Per-security analysis budget.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Offset of report timestamps from UTC, in hours.
    #[serde(default = "default_utc_offset")]
    pub utc_offset_hours: i32,
    #[serde(default = "default_true")]
    pub write_report: bool,
    #[serde(default)]
    pub strategy: StrategySpec,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("stock_data")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_utc_offset() -> i32 {
    8
}

fn default_true() -> bool {
    true
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            names: None,
            output_dir: default_output_dir(),
            workers: None,
            max_workers: None,
            top_n: None,
            timeout_ms: None,
            utc_offset_hours: default_utc_offset(),
            write_report: true,
            strategy: StrategySpec::default(),
        }
    }
}

impl ScanConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Explicit `workers`, else the machine's parallelism; capped by `max_workers`.
    pub fn resolve_workers(&self) -> Result<usize, ConfigError> {
        let requested = match self.workers {
            Some(0) => return Err(ConfigError::NoWorkers),
            Some(n) => n,
            None => std::thread::available_parallelism().map_or(1, |n| n.get()),
        };
        match self.max_workers {
            Some(0) => Err(ConfigError::NoWorkers),
            Some(cap) => Ok(requested.min(cap)),
            None => Ok(requested),
        }
    }

    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        self.utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or(ConfigError::BadOffset(self.utc_offset_hours))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revscan_core::strategy::RankKey;

    #[test]
    fn empty_file_uses_defaults() {
        let config = ScanConfig::from_toml("").unwrap();
        assert_eq!(config, ScanConfig::default());
        assert_eq!(config.strategy.resolve().unwrap().name, "mild_oversold");
        assert_eq!(config.utc_offset().unwrap().local_minus_utc(), 8 * 3600);
    }

    #[test]
    fn preset_strategy() {
        let config = ScanConfig::from_toml(
            r#"
            data_dir = "bars"
            top_n = 10

            [strategy]
            preset = "volume_reversal"
            "#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("bars"));
        assert_eq!(config.top_n, Some(10));
        let strategy = config.strategy.resolve().unwrap();
        assert_eq!(strategy.rank_by, RankKey::WinRate { horizon: 20 });
    }

    #[test]
    fn inline_strategy() {
        let config = ScanConfig::from_toml(
            r#"
            [strategy]
            name = "breakout_only"
            min_history = 30
            horizons = [5, 20]
            rank_by = { type = "win_rate", horizon = 5 }

            [[strategy.signal]]
            type = "reversal_breakout"

            [[strategy.signal]]
            type = "volume_pickup"
            "#,
        )
        .unwrap();
        let strategy = config.strategy.resolve().unwrap();
        assert_eq!(strategy.name, "breakout_only");
        assert_eq!(strategy.horizons, vec![5, 20]);
        assert_eq!(strategy.signal.len(), 2);
    }

    #[test]
    fn invalid_inline_strategy_fails_resolve() {
        let config = ScanConfig::from_toml(
            r#"
            [strategy]
            name = "too_short"
            min_history = 10

            [[strategy.signal]]
            type = "ma60_headroom"
            min_pct = 10.0
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.strategy.resolve(),
            Err(StrategyError::HistoryTooShort { .. })
        ));
    }

    #[test]
    fn unknown_preset_is_parse_error() {
        let err = ScanConfig::from_toml("[strategy]\npreset = \"momentum\"\n");
        assert!(matches!(err, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn worker_resolution() {
        let mut config = ScanConfig {
            workers: Some(12),
            max_workers: Some(4),
            ..ScanConfig::default()
        };
        assert_eq!(config.resolve_workers().unwrap(), 4);

        config.max_workers = None;
        assert_eq!(config.resolve_workers().unwrap(), 12);

        config.workers = None;
        assert!(config.resolve_workers().unwrap() >= 1);

        config.workers = Some(0);
        assert!(matches!(config.resolve_workers(), Err(ConfigError::NoWorkers)));
    }

    #[test]
    fn offset_out_of_range() {
        let config = ScanConfig {
            utc_offset_hours: 30,
            ..ScanConfig::default()
        };
        assert!(matches!(config.utc_offset(), Err(ConfigError::BadOffset(30))));
    }
}
