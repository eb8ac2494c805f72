//! BacktestLedger: replays a predicate over a security's history and measures
//! what happened after each historical signal.
//!
//! The ledger is a pure function of (bars, frame, predicate, horizons, window).
//! No trades are simulated; each hit records fractional forward returns only.

use std::ops::RangeInclusive;
use std::time::Instant;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Bar;
use crate::indicators::IndicatorFrame;
use crate::signal::SignalPredicate;

/// Forward-return horizons used when a strategy does not set its own.
pub const DEFAULT_HORIZONS: [usize; 4] = [7, 14, 20, 60];

/// Deadline polling interval during a replay.
const DEADLINE_STRIDE: usize = 256;

/// Which history indices are replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerWindow {
    /// Everything except the latest bar; late hits may miss long horizons.
    #[default]
    ExcludeLatest,
    /// Only indices where every horizon is observable.
    FullHorizon,
}

/// One historical occurrence of the signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalHit {
    pub index: usize,
    pub date: NaiveDate,
    pub close: f64,
    /// Aligned with the ledger's horizons.
    pub forward_returns: Vec<Option<f64>>,
}

/// Outcome statistics at one horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonStats {
    pub horizon: usize,
    pub samples: usize,
    pub wins: usize,
    /// `None` when no hit has an observable return at this horizon.
    pub win_rate: Option<f64>,
    pub avg_return: Option<f64>,
}

impl HorizonStats {
    fn from_returns(horizon: usize, returns: impl Iterator<Item = f64>) -> Self {
        let (mut samples, mut wins, mut sum) = (0usize, 0usize, 0.0);
        for r in returns {
            samples += 1;
            sum += r;
            if r > 0.0 {
                wins += 1;
            }
        }
        let (win_rate, avg_return) = if samples == 0 {
            (None, None)
        } else {
            (
                Some(wins as f64 / samples as f64),
                Some(sum / samples as f64),
            )
        };
        Self {
            horizon,
            samples,
            wins,
            win_rate,
            avg_return,
        }
    }
}

/// All historical hits for one security plus per-horizon aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    horizons: Vec<usize>,
    hits: Vec<SignalHit>,
    stats: Vec<HorizonStats>,
}

impl Ledger {
    fn from_hits(horizons: &[usize], hits: Vec<SignalHit>) -> Self {
        let stats = horizons
            .iter()
            .enumerate()
            .map(|(k, &h)| {
                HorizonStats::from_returns(
                    h,
                    hits.iter().filter_map(|hit| hit.forward_returns[k]),
                )
            })
            .collect();
        Self {
            horizons: horizons.to_vec(),
            hits,
            stats,
        }
    }

    pub fn hit_count(&self) -> usize {
        self.hits.len()
    }

    pub fn hits(&self) -> &[SignalHit] {
        &self.hits
    }

    pub fn horizons(&self) -> &[usize] {
        &self.horizons
    }

    pub fn stats(&self) -> &[HorizonStats] {
        &self.stats
    }

    pub fn stats_for(&self, horizon: usize) -> Option<&HorizonStats> {
        self.stats.iter().find(|s| s.horizon == horizon)
    }
}

/// A replay ran past its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("ledger replay exceeded its deadline after {scanned} of {total} indices")]
pub struct LedgerTimeout {
    pub scanned: usize,
    pub total: usize,
}

/// Fractional return from `index` to `index + horizon`.
///
/// Undefined past the end of the series or from a non-positive entry close.
pub fn forward_return(bars: &[Bar], index: usize, horizon: usize) -> Option<f64> {
    let entry = bars.get(index)?.close;
    let exit = bars.get(index.checked_add(horizon)?)?.close;
    if !(entry.is_finite() && entry > 0.0 && exit.is_finite()) {
        return None;
    }
    Some((exit - entry) / entry)
}

/// Indices replayed for a series of length `n`; `None` when nothing qualifies.
pub fn scan_range(
    n: usize,
    warmup: usize,
    window: LedgerWindow,
    max_horizon: usize,
) -> Option<RangeInclusive<usize>> {
    let end = match window {
        LedgerWindow::ExcludeLatest => n.checked_sub(2)?,
        LedgerWindow::FullHorizon => n.checked_sub(1)?.checked_sub(max_horizon)?,
    };
    (warmup <= end).then_some(warmup..=end)
}

/// Replay without a deadline.
pub fn replay(
    bars: &[Bar],
    frame: &IndicatorFrame,
    predicate: &dyn SignalPredicate,
    horizons: &[usize],
    window: LedgerWindow,
) -> Ledger {
    match replay_until(bars, frame, predicate, horizons, window, None) {
        Ok(ledger) => ledger,
        Err(_) => unreachable!("replay without deadline cannot time out"),
    }
}

/// Replay, checking `deadline` every few hundred indices.
pub fn replay_until(
    bars: &[Bar],
    frame: &IndicatorFrame,
    predicate: &dyn SignalPredicate,
    horizons: &[usize],
    window: LedgerWindow,
    deadline: Option<Instant>,
) -> Result<Ledger, LedgerTimeout> {
    let max_horizon = horizons.iter().copied().max().unwrap_or(0);
    let Some(range) = scan_range(bars.len(), predicate.warmup_bars(), window, max_horizon)
    else {
        return Ok(Ledger::from_hits(horizons, Vec::new()));
    };

    let total = range.end() - range.start() + 1;
    let mut hits = Vec::new();
    for (scanned, i) in range.enumerate() {
        if scanned % DEADLINE_STRIDE == 0 && deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(LedgerTimeout { scanned, total });
        }
        if !predicate.evaluate(bars, i, frame) {
            continue;
        }
        hits.push(SignalHit {
            index: i,
            date: bars[i].date,
            close: bars[i].close,
            forward_returns: horizons
                .iter()
                .map(|&h| forward_return(bars, i, h))
                .collect(),
        });
    }
    Ok(Ledger::from_hits(horizons, hits))
}
