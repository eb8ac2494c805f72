//! Named strategy presets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::analyzer::ClassificationConfig;
use crate::indicators::IndicatorSettings;
use crate::ledger::LedgerWindow;
use crate::strategy::{IdentityRules, RankKey, StrategyConfig};

use super::Condition;

/// Built-in screening rule sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyPreset {
    MildOversold,
    StrictOversold,
    VolumeReversal,
    OversoldReversal,
}

impl StrategyPreset {
    pub fn all() -> &'static [StrategyPreset] {
        &[
            Self::MildOversold,
            Self::StrictOversold,
            Self::VolumeReversal,
            Self::OversoldReversal,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::MildOversold => "mild_oversold",
            Self::StrictOversold => "strict_oversold",
            Self::VolumeReversal => "volume_reversal",
            Self::OversoldReversal => "oversold_reversal",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::MildOversold => "quiet oversold names below MA60 that have stopped falling",
            Self::StrictOversold => "deeply oversold, very low volume, near-flat day",
            Self::VolumeReversal => "active stock shrinks to extreme volume then breaks yesterday's high",
            Self::OversoldReversal => "oversold reading confirmed by a breakout on rising volume",
        }
    }

    pub fn to_config(self) -> StrategyConfig {
        match self {
            Self::MildOversold => oversold_scanner(self.name(), 35.0, 45.0, 1.15, 5.0),
            Self::StrictOversold => oversold_scanner(self.name(), 28.0, 30.0, 0.8, 3.0),
            Self::VolumeReversal => StrategyConfig {
                name: self.name().into(),
                version: 1,
                min_history: 100,
                identity: IdentityRules {
                    excluded_code_prefixes: vec!["30".into()],
                    ..IdentityRules::default()
                },
                indicators: IndicatorSettings { vol_ma_period: 20 },
                gate: vec![Condition::PriceBand {
                    min: Some(5.0),
                    max: Some(20.0),
                }],
                signal: vec![
                    Condition::PriorActivity {
                        lookback: 5,
                        multiplier: 1.5,
                    },
                    Condition::ShrinkToExtreme {
                        bars: 2,
                        multiplier: 0.7,
                    },
                    Condition::ReversalBreakout,
                ],
                horizons: crate::ledger::DEFAULT_HORIZONS.to_vec(),
                ledger_window: LedgerWindow::FullHorizon,
                classification: ClassificationConfig::default(),
                rank_by: RankKey::WinRate { horizon: 20 },
            },
            Self::OversoldReversal => StrategyConfig {
                name: self.name().into(),
                version: 1,
                min_history: 60,
                identity: IdentityRules::default(),
                indicators: IndicatorSettings::default(),
                gate: vec![Condition::PriceBand {
                    min: Some(5.0),
                    max: None,
                }],
                signal: vec![
                    Condition::Oversold {
                        rsi_max: 35.0,
                        k_max: 45.0,
                    },
                    Condition::ReversalBreakout,
                    Condition::VolumePickup,
                ],
                horizons: crate::ledger::DEFAULT_HORIZONS.to_vec(),
                ledger_window: LedgerWindow::ExcludeLatest,
                classification: ClassificationConfig::default(),
                rank_by: RankKey::WinRate { horizon: 20 },
            },
        }
    }
}

fn oversold_scanner(
    name: &str,
    rsi_max: f64,
    k_max: f64,
    vol_ratio_max: f64,
    max_move_pct: f64,
) -> StrategyConfig {
    StrategyConfig {
        name: name.into(),
        version: 1,
        min_history: 60,
        identity: IdentityRules::default(),
        indicators: IndicatorSettings::default(),
        gate: Vec::new(),
        signal: vec![
            Condition::PriceBand {
                min: Some(5.0),
                max: None,
            },
            Condition::TurnoverCeiling { max: 4.5 },
            Condition::Ma60Headroom { min_pct: 10.0 },
            Condition::DailyMoveCap {
                max_pct: max_move_pct,
            },
            Condition::Oversold { rsi_max, k_max },
            Condition::Stabilization,
            Condition::VolumeRatioBand {
                min: 0.2,
                max: vol_ratio_max,
            },
        ],
        horizons: crate::ledger::DEFAULT_HORIZONS.to_vec(),
        ledger_window: LedgerWindow::ExcludeLatest,
        classification: ClassificationConfig::default(),
        rank_by: RankKey::VolumeRatioThenRsi,
    }
}

impl fmt::Display for StrategyPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_");
        Self::all()
            .iter()
            .copied()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::all().iter().map(|p| p.name()).collect();
                format!("unknown preset '{s}' (known: {})", known.join(", "))
            })
    }
}
