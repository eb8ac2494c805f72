//! Strategy configuration: everything that defines one screening rule set.
//!
//! - `StrategyConfig`: predicate conditions, gates, history requirements,
//!   ledger horizons, classification bands and ranking.
//! - `IdentityRules`: name/code based exclusions applied before any data is read.
//! - `RankKey`: how the orchestrator orders results.
//! - `fingerprint()`: BLAKE3 over the canonical JSON, recorded in run manifests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analyzer::ClassificationConfig;
use crate::indicators::IndicatorSettings;
use crate::ledger::{LedgerWindow, DEFAULT_HORIZONS};
use crate::signal::{Condition, RulePredicate, SignalPredicate};

/// Errors from strategy validation and parsing.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("strategy '{0}' has no signal conditions")]
    EmptySignal(String),

    #[error("strategy '{0}' has no ledger horizons")]
    NoHorizons(String),

    #[error("ledger horizon must be >= 1, got {0}")]
    InvalidHorizon(usize),

    #[error("classification horizon {0} is not one of the ledger horizons")]
    UnknownClassificationHorizon(usize),

    #[error("min_history {min_history} leaves no evaluable bar (predicate warmup is {warmup})")]
    HistoryTooShort { min_history: usize, warmup: usize },

    #[error("invalid {condition} condition: {reason}")]
    InvalidCondition {
        condition: &'static str,
        reason: String,
    },

    #[error("parse strategy TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize strategy TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Identity-based exclusions (checked against code and display name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRules {
    /// Skip securities whose name contains `flag` (case-insensitive).
    #[serde(default = "default_true")]
    pub exclude_flagged_names: bool,
    #[serde(default = "default_flag")]
    pub flag: String,
    /// Skip codes starting with any of these prefixes.
    #[serde(default)]
    pub excluded_code_prefixes: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_flag() -> String {
    "ST".into()
}

impl Default for IdentityRules {
    fn default() -> Self {
        Self {
            exclude_flagged_names: true,
            flag: default_flag(),
            excluded_code_prefixes: Vec::new(),
        }
    }
}

/// Why an identity check rejected a security.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityReason {
    FlaggedName(String),
    ExcludedPrefix(String),
}

impl fmt::Display for IdentityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FlaggedName(flag) => write!(f, "name flagged '{flag}'"),
            Self::ExcludedPrefix(prefix) => write!(f, "code prefix '{prefix}' excluded"),
        }
    }
}

impl IdentityRules {
    pub fn check(&self, code: &str, name: &str) -> Result<(), IdentityReason> {
        if self.exclude_flagged_names
            && !self.flag.is_empty()
            && name.to_uppercase().contains(&self.flag.to_uppercase())
        {
            return Err(IdentityReason::FlaggedName(self.flag.clone()));
        }
        if let Some(prefix) = self
            .excluded_code_prefixes
            .iter()
            .find(|p| code.starts_with(p.as_str()))
        {
            return Err(IdentityReason::ExcludedPrefix(prefix.clone()));
        }
        Ok(())
    }
}

/// Result ordering used by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RankKey {
    /// Ascending volume ratio, then ascending RSI6 (quietest, most oversold first).
    #[default]
    VolumeRatioThenRsi,
    /// Descending historical win rate at `horizon`.
    WinRate { horizon: usize },
}

impl fmt::Display for RankKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VolumeRatioThenRsi => write!(f, "volume_ratio_then_rsi"),
            Self::WinRate { horizon } => write!(f, "win_rate:{horizon}"),
        }
    }
}

impl FromStr for RankKey {
    type Err = String;

    /// Accepts `volume_ratio_then_rsi`, `win_rate` (20-bar) or `win_rate:<horizon>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "volume_ratio_then_rsi" => Ok(Self::VolumeRatioThenRsi),
            "win_rate" => Ok(Self::WinRate { horizon: 20 }),
            other => match other.strip_prefix("win_rate:") {
                Some(h) => h
                    .parse::<usize>()
                    .map(|horizon| Self::WinRate { horizon })
                    .map_err(|e| format!("invalid win_rate horizon '{h}': {e}")),
                None => Err(format!(
                    "unknown rank key '{other}' (expected volume_ratio_then_rsi or win_rate[:H])"
                )),
            },
        }
    }
}

/// Complete strategy definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: u32,
    /// Minimum number of bars a security needs before it is analyzed.
    pub min_history: usize,
    #[serde(default)]
    pub identity: IdentityRules,
    #[serde(default)]
    pub indicators: IndicatorSettings,
    /// Today-only screening conditions; not replayed over history.
    #[serde(default)]
    pub gate: Vec<Condition>,
    /// Detection conditions, evaluated today and replayed by the ledger.
    pub signal: Vec<Condition>,
    #[serde(default = "default_horizons")]
    pub horizons: Vec<usize>,
    #[serde(default)]
    pub ledger_window: LedgerWindow,
    #[serde(default)]
    pub classification: ClassificationConfig,
    #[serde(default)]
    pub rank_by: RankKey,
}

fn default_version() -> u32 {
    1
}

fn default_horizons() -> Vec<usize> {
    DEFAULT_HORIZONS.to_vec()
}

impl StrategyConfig {
    /// The replayed detection rule.
    pub fn predicate(&self) -> RulePredicate {
        RulePredicate::new(
            self.name.clone(),
            self.version,
            self.signal.clone(),
            &self.indicators,
        )
    }

    /// The today-only gate rule.
    pub fn gate_predicate(&self) -> RulePredicate {
        RulePredicate::new(
            format!("{}_gate", self.name),
            self.version,
            self.gate.clone(),
            &self.indicators,
        )
    }

    /// Longest ledger horizon.
    pub fn max_horizon(&self) -> usize {
        self.horizons.iter().copied().max().unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.signal.is_empty() {
            return Err(StrategyError::EmptySignal(self.name.clone()));
        }
        if self.horizons.is_empty() {
            return Err(StrategyError::NoHorizons(self.name.clone()));
        }
        if let Some(&h) = self.horizons.iter().find(|&&h| h == 0) {
            return Err(StrategyError::InvalidHorizon(h));
        }
        if !self.horizons.contains(&self.classification.horizon) {
            return Err(StrategyError::UnknownClassificationHorizon(
                self.classification.horizon,
            ));
        }
        let warmup = self
            .predicate()
            .warmup_bars()
            .max(self.gate_predicate().warmup_bars());
        if self.min_history <= warmup {
            return Err(StrategyError::HistoryTooShort {
                min_history: self.min_history,
                warmup,
            });
        }
        for cond in self.gate.iter().chain(&self.signal) {
            validate_condition(cond)?;
        }
        Ok(())
    }

    /// BLAKE3 hex digest of the canonical JSON form.
    ///
    /// Two configs with identical conditions and thresholds share a fingerprint.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).expect("StrategyConfig must serialize");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    pub fn from_toml(content: &str) -> Result<Self, StrategyError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, StrategyError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn validate_condition(cond: &Condition) -> Result<(), StrategyError> {
    let invalid = |reason: String| StrategyError::InvalidCondition {
        condition: cond.name(),
        reason,
    };
    match cond {
        Condition::PriceBand {
            min: Some(lo),
            max: Some(hi),
        } if lo > hi => Err(invalid(format!("min {lo} > max {hi}"))),
        Condition::VolumeRatioBand { min, max } if min > max => {
            Err(invalid(format!("min {min} > max {max}")))
        }
        Condition::PriorActivity {
            lookback,
            multiplier,
        } => {
            if *lookback == 0 {
                Err(invalid("lookback must be >= 1".into()))
            } else if *multiplier <= 0.0 {
                Err(invalid(format!("multiplier must be > 0, got {multiplier}")))
            } else {
                Ok(())
            }
        }
        Condition::ShrinkToExtreme { bars, multiplier } => {
            if *bars == 0 {
                Err(invalid("bars must be >= 1".into()))
            } else if *multiplier <= 0.0 {
                Err(invalid(format!("multiplier must be > 0, got {multiplier}")))
            } else {
                Ok(())
            }
        }
        _ => Ok(()),
    }
}
