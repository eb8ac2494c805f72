//! Simple Moving Average (SMA) over a selectable bar field.
//!
//! Rolling mean over a trailing window ending at (and including) the current bar.
//! Lookback: period - 1 (first defined value at index period-1). A window
//! containing any undefined input is undefined.

use crate::domain::Bar;

use super::{Indicator, Series};

/// Which bar field a rolling statistic reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarField {
    Close,
    Volume,
    Turnover,
}

impl BarField {
    /// Field value for one bar; non-finite and absent values are undefined.
    pub fn value(self, bar: &Bar) -> Option<f64> {
        let v = match self {
            Self::Close => Some(bar.close),
            Self::Volume => Some(bar.volume),
            Self::Turnover => bar.turnover_rate,
        };
        v.filter(|x| x.is_finite())
    }

    fn label(self) -> &'static str {
        match self {
            Self::Close => "ma",
            Self::Volume => "vol_ma",
            Self::Turnover => "avg_turnover",
        }
    }

    /// Extract the whole field as a series.
    pub fn series(self, bars: &[Bar]) -> Series {
        bars.iter().map(|b| self.value(b)).collect()
    }
}

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    field: BarField,
    name: String,
}

impl Sma {
    pub fn new(period: usize, field: BarField) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            field,
            name: format!("{}_{period}", field.label()),
        }
    }

    /// Close-price moving average.
    pub fn close(period: usize) -> Self {
        Self::new(period, BarField::Close)
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Series {
        rolling_mean(&self.field.series(bars), self.period)
    }
}

/// Trailing mean of `values` over `period` entries.
///
/// Each window is summed from scratch, so long histories carry no running-sum drift.
pub fn rolling_mean(values: &[Option<f64>], period: usize) -> Series {
    let n = values.len();
    let mut result = vec![None; n];

    if period == 0 || n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &values[(i + 1 - period)..=i];
        let mut sum = 0.0;
        let mut complete = true;
        for v in window {
            match v {
                Some(x) => sum += x,
                None => {
                    complete = false;
                    break;
                }
            }
        }
        if complete {
            result[i] = Some(sum / period as f64);
        }
    }

    result
}
