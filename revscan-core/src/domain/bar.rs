//! Bar: one trading day for one security.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Daily OHLCV bar plus the exchange-reported turnover and percent change.
///
/// Bars are immutable once loaded. A security's history is a `Vec<Bar>` ordered
/// by date ascending; the index into that vector is the only addressing scheme
/// used by indicators, predicates and the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Turnover rate in percent of float. `None` when the source has no turnover column.
    pub turnover_rate: Option<f64>,
    /// Close-to-close change in percent.
    pub pct_change: f64,
}

impl Bar {
    /// Returns true if any price or volume field is non-finite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite())
    }

    /// Basic OHLC sanity: high bounds the body, low bounds the body, positive prices.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.close > 0.0
            && self.volume >= 0.0
    }
}

/// Structural problems with a bar series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("bar series is empty")]
    Empty,

    #[error("dates not strictly increasing at index {index}: {prev} followed by {date}")]
    OutOfOrder {
        index: usize,
        prev: NaiveDate,
        date: NaiveDate,
    },

    #[error("void bar at index {index} ({date}): non-finite price or volume")]
    Void { index: usize, date: NaiveDate },
}

/// Check the series invariants: non-empty, strictly increasing dates, no void bars.
pub fn validate_series(bars: &[Bar]) -> Result<(), BarError> {
    let first = bars.first().ok_or(BarError::Empty)?;
    if first.is_void() {
        return Err(BarError::Void {
            index: 0,
            date: first.date,
        });
    }
    for (index, pair) in bars.windows(2).enumerate() {
        let (prev, bar) = (&pair[0], &pair[1]);
        if bar.date <= prev.date {
            return Err(BarError::OutOfOrder {
                index: index + 1,
                prev: prev.date,
                date: bar.date,
            });
        }
        if bar.is_void() {
            return Err(BarError::Void {
                index: index + 1,
                date: bar.date,
            });
        }
    }
    Ok(())
}
