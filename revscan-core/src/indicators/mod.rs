//! Indicator engine.
//!
//! Indicators are pure functions: bar history in, one value per bar out. A value
//! is `None` ("undefined") until its window is fully populated, and whenever the
//! underlying ratio is degenerate (zero denominator, zero range). Undefined never
//! turns into a numeric placeholder, so downstream threshold checks against it
//! always fail.
//!
//! # Look-ahead contamination guard
//! No indicator value at bar t may depend on data from bar t+1 or later. Every
//! indicator must pass the truncated-vs-full series test in `tests/lookahead_test.rs`.

pub mod frame;
pub mod kdj;
pub mod rsi;
pub mod sma;
pub mod volume_ratio;

pub use frame::{IndicatorFrame, IndicatorSettings};
pub use kdj::{ewm_mean, rsv, KdjK};
pub use rsi::Rsi;
pub use sma::{rolling_mean, BarField, Sma};
pub use volume_ratio::VolumeRatio;

use crate::domain::Bar;

/// One indicator value per bar; `None` means undefined.
pub type Series = Vec<Option<f64>>;

/// Trait for indicators.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ma_60", "rsi_6").
    fn name(&self) -> &str;

    /// Index of the first bar that can carry a defined value.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    ///
    /// Returns a `Series` of the same length as `bars`.
    fn compute(&self, bars: &[Bar]) -> Series;
}

/// Value at `index`, flattening out-of-range and undefined into `None`.
pub fn value_at(series: &[Option<f64>], index: usize) -> Option<f64> {
    series.get(index).copied().flatten()
}

/// Create synthetic bars from close prices for testing.
///
/// open = prev close (or close for the first bar), high = max(open,close) + 1.0,
/// low = min(open,close) - 1.0, volume = 1000, turnover = 1.0.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
                turnover_rate: Some(1.0),
                pct_change: if i == 0 {
                    0.0
                } else {
                    (close - open) / open * 100.0
                },
            }
        })
        .collect()
}

/// Assert a defined value approximately equals `expected`.
#[cfg(test)]
pub fn assert_approx(actual: Option<f64>, expected: f64, epsilon: f64) {
    let actual = actual.unwrap_or_else(|| panic!("expected {expected}, got undefined"));
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
