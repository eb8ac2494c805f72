//! Strength and advice labels derived from a ledger.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ledger::Ledger;

/// Historical quality of the signal for one security.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    Strong,
    Moderate,
}

impl Strength {
    /// Five stars for strong, three for moderate.
    pub fn stars(self) -> u8 {
        match self {
            Self::Strong => 5,
            Self::Moderate => 3,
        }
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strong => f.pad("strong"),
            Self::Moderate => f.pad("moderate"),
        }
    }
}

/// Position-sizing hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Advice {
    Aggressive,
    Probe,
    InsufficientHistory,
}

impl fmt::Display for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aggressive => f.pad("aggressive"),
            Self::Probe => f.pad("probe"),
            Self::InsufficientHistory => f.pad("insufficient history"),
        }
    }
}

/// Thresholds for labelling a ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Horizon whose stats drive both labels.
    pub horizon: usize,
    pub strong_win_rate: f64,
    pub strong_avg_return: f64,
    pub aggressive_win_rate: f64,
    /// Fewer hits with a return at `horizon` than this yields `InsufficientHistory`.
    pub min_hits: usize,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            horizon: 20,
            strong_win_rate: 0.6,
            strong_avg_return: 0.05,
            aggressive_win_rate: 0.7,
            min_hits: 3,
        }
    }
}

impl ClassificationConfig {
    pub fn strength(&self, ledger: &Ledger) -> Strength {
        let stats = ledger.stats_for(self.horizon);
        let win_rate = stats.and_then(|s| s.win_rate);
        let avg_return = stats.and_then(|s| s.avg_return);
        match (win_rate, avg_return) {
            (Some(w), Some(r)) if w > self.strong_win_rate && r > self.strong_avg_return => {
                Strength::Strong
            }
            _ => Strength::Moderate,
        }
    }

    pub fn advice(&self, ledger: &Ledger) -> Advice {
        let stats = ledger.stats_for(self.horizon);
        if stats.map_or(0, |s| s.samples) < self.min_hits {
            return Advice::InsufficientHistory;
        }
        let win_rate = stats.and_then(|s| s.win_rate);
        if win_rate.is_some_and(|w| w > self.aggressive_win_rate) {
            Advice::Aggressive
        } else {
            Advice::Probe
        }
    }

    pub fn classify(&self, ledger: &Ledger) -> (Strength, Advice) {
        (self.strength(ledger), self.advice(ledger))
    }
}
