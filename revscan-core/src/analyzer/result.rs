//! Per-security outcome types.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Bar, Code};
use crate::indicators::IndicatorFrame;
use crate::ledger::HorizonStats;
use crate::signal::condition::ma60_headroom_pct;
use crate::strategy::IdentityReason;

use super::classify::{Advice, Strength};

/// Indicator values on the signal day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub vol_ratio: Option<f64>,
    pub rsi6: Option<f64>,
    pub kdj_k: Option<f64>,
    pub ma5: Option<f64>,
    pub ma60: Option<f64>,
    /// Percent distance from close up to MA60.
    pub headroom_pct: Option<f64>,
    pub pct_change: f64,
    pub avg_turnover_30: Option<f64>,
}

impl IndicatorSnapshot {
    pub fn at(bars: &[Bar], frame: &IndicatorFrame, i: usize) -> Self {
        let bar = &bars[i];
        Self {
            vol_ratio: frame.vol_ratio(i),
            rsi6: frame.rsi6(i),
            kdj_k: frame.kdj_k(i),
            ma5: frame.ma5(i),
            ma60: frame.ma60(i),
            headroom_pct: ma60_headroom_pct(bar.close, frame.ma60(i)),
            pct_change: bar.pct_change,
            avg_turnover_30: frame.avg_turnover_30(i),
        }
    }
}

/// One qualifying security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub code: Code,
    pub name: String,
    pub strategy: String,
    pub date: NaiveDate,
    pub close: f64,
    pub snapshot: IndicatorSnapshot,
    /// Historical occurrences of the signal before today.
    pub hit_count: usize,
    pub horizons: Vec<HorizonStats>,
    pub strength: Strength,
    pub advice: Advice,
}

impl ScanResult {
    pub fn stats_for(&self, horizon: usize) -> Option<&HorizonStats> {
        self.horizons.iter().find(|s| s.horizon == horizon)
    }

    pub fn win_rate(&self, horizon: usize) -> Option<f64> {
        self.stats_for(horizon).and_then(|s| s.win_rate)
    }
}

/// Why a security produced no result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Exclusion {
    #[error("excluded: {0}")]
    Identity(IdentityReason),

    #[error("insufficient history: have {have} bars, need {need}")]
    InsufficientHistory { have: usize, need: usize },

    #[error("data error: {0}")]
    Data(String),

    #[error("rejected by {condition}")]
    Filtered { condition: String },

    #[error("no signal today")]
    NoSignal,

    #[error("analysis exceeded {budget_ms} ms")]
    Timeout { budget_ms: u64 },
}

impl Exclusion {
    pub fn kind(&self) -> ExclusionKind {
        match self {
            Self::Identity(_) => ExclusionKind::Identity,
            Self::InsufficientHistory { .. } => ExclusionKind::InsufficientHistory,
            Self::Data(_) => ExclusionKind::Data,
            Self::Filtered { .. } => ExclusionKind::Filtered,
            Self::NoSignal => ExclusionKind::NoSignal,
            Self::Timeout { .. } => ExclusionKind::Timeout,
        }
    }
}

/// Payload-free exclusion discriminant, used for tallies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionKind {
    Identity,
    InsufficientHistory,
    Data,
    Filtered,
    NoSignal,
    Timeout,
}

impl ExclusionKind {
    pub fn all() -> &'static [ExclusionKind] {
        &[
            Self::Identity,
            Self::InsufficientHistory,
            Self::Data,
            Self::Filtered,
            Self::NoSignal,
            Self::Timeout,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::InsufficientHistory => "insufficient_history",
            Self::Data => "data",
            Self::Filtered => "filtered",
            Self::NoSignal => "no_signal",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ExclusionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of analyzing one security.
pub type Outcome = Result<ScanResult, Exclusion>;
