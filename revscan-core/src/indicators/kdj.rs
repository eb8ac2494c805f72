//! KDJ stochastic oscillator, K line.
//!
//! RSV[t] = (close[t] - lowest_low(period)) / (highest_high(period) - lowest_low(period)) * 100
//! K = bias-adjusted exponentially weighted mean of RSV, alpha = 1 / (1 + com).
//! With the classic (9,3,3) parameters com = 2, so alpha = 1/3.
//! Lookback: period - 1. A zero high-low range leaves RSV undefined for that bar.

use crate::domain::Bar;

use super::{Indicator, Series};

#[derive(Debug, Clone)]
pub struct KdjK {
    period: usize,
    com: f64,
    name: String,
}

impl KdjK {
    pub fn new(period: usize, com: f64) -> Self {
        assert!(period >= 1, "KDJ period must be >= 1");
        assert!(com >= 0.0, "KDJ center of mass must be >= 0");
        Self {
            period,
            com,
            name: format!("kdj_k_{period}"),
        }
    }

    pub fn default_params() -> Self {
        Self::new(9, 2.0)
    }
}

impl Indicator for KdjK {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Series {
        ewm_mean(&rsv(bars, self.period), self.com)
    }
}

/// Raw stochastic value over a trailing `period`-bar high/low window.
pub fn rsv(bars: &[Bar], period: usize) -> Series {
    let n = bars.len();
    let mut result = vec![None; n];

    if period == 0 || n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &bars[(i + 1 - period)..=i];
        let mut lowest = f64::INFINITY;
        let mut highest = f64::NEG_INFINITY;
        for bar in window {
            lowest = lowest.min(bar.low);
            highest = highest.max(bar.high);
        }
        let range = highest - lowest;
        let close = bars[i].close;
        if range > 0.0 && range.is_finite() && close.is_finite() {
            result[i] = Some((close - lowest) / range * 100.0);
        }
    }

    result
}

/// Bias-adjusted exponentially weighted mean with center of mass `com`.
///
/// K[t] = sum_j w^j x[t-j] / sum_j w^j with w = 1 - alpha, summed over defined
/// inputs only. Computed recursively on numerator and denominator. Undefined
/// until the first defined input; an undefined input later carries K forward.
pub fn ewm_mean(values: &[Option<f64>], com: f64) -> Series {
    let alpha = 1.0 / (1.0 + com);
    let decay = 1.0 - alpha;

    let mut result = Vec::with_capacity(values.len());
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    let mut current = None;

    for v in values {
        if let Some(x) = v {
            numerator = x + decay * numerator;
            denominator = 1.0 + decay * denominator;
            current = Some(numerator / denominator);
        }
        result.push(current);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn rsv_known_value() {
        // make_bars: high = max(open,close)+1, low = min(open,close)-1
        // closes 10, 12, 11 → highs 11, 13, 13; lows 9, 9, 10
        // window(3) at index 2: lowest 9, highest 13 → (11-9)/4*100 = 50
        let bars = make_bars(&[10.0, 12.0, 11.0]);
        let result = rsv(&bars, 3);
        assert!(result[0].is_none());
        assert!(result[1].is_none());
        assert_approx(result[2], 50.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rsv_zero_range_is_undefined() {
        let mut bars = make_bars(&[10.0; 5]);
        for bar in &mut bars {
            bar.high = 10.0;
            bar.low = 10.0;
        }
        assert!(rsv(&bars, 3).iter().all(|v| v.is_none()));
    }

    #[test]
    fn ewm_adjusted_matches_closed_form() {
        // alpha = 1/3, w = 2/3
        let values = vec![None, Some(30.0), Some(60.0), Some(90.0)];
        let result = ewm_mean(&values, 2.0);
        assert!(result[0].is_none());
        assert_approx(result[1], 30.0, DEFAULT_EPSILON);
        let w: f64 = 2.0 / 3.0;
        assert_approx(result[2], (60.0 + w * 30.0) / (1.0 + w), DEFAULT_EPSILON);
        assert_approx(
            result[3],
            (90.0 + w * 60.0 + w * w * 30.0) / (1.0 + w + w * w),
            DEFAULT_EPSILON,
        );
    }

    #[test]
    fn ewm_carries_over_gap() {
        let values = vec![Some(40.0), None, Some(40.0)];
        let result = ewm_mean(&values, 2.0);
        assert_approx(result[1], 40.0, DEFAULT_EPSILON);
        assert_approx(result[2], 40.0, DEFAULT_EPSILON);
    }

    #[test]
    fn kdj_k_stays_in_range() {
        let bars = make_bars(&[10.0, 11.0, 9.5, 12.0, 8.0, 13.0, 7.0, 14.0, 10.0, 9.0, 11.0]);
        let result = KdjK::default_params().compute(&bars);
        for (i, v) in result.iter().enumerate() {
            if i < 8 {
                assert!(v.is_none(), "expected undefined at {i}");
            } else {
                let v = v.unwrap();
                assert!((0.0..=100.0).contains(&v), "K out of range at {i}: {v}");
            }
        }
    }

    #[test]
    fn kdj_lookback() {
        assert_eq!(KdjK::default_params().lookback(), 8);
        assert_eq!(KdjK::default_params().name(), "kdj_k_9");
    }
}
