//! Relative Strength Index (RSI), simple-average form.
//!
//! gain = mean of positive close-to-close deltas over the trailing `period` deltas,
//! loss = mean magnitude of negative deltas over the same window,
//! RSI = 100 - 100 / (1 + gain / loss).
//! The first bar has no predecessor; its delta counts as zero, so the first
//! full window ends at index period - 1.
//! Edge case: loss == 0 → undefined (no ratio), including a flat series.

use crate::domain::Bar;

use super::sma::rolling_mean;
use super::{Indicator, Series};

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Series {
        let n = bars.len();
        let mut gains: Series = vec![None; n];
        let mut losses: Series = vec![None; n];
        if bars.first().is_some_and(|b| b.close.is_finite()) {
            gains[0] = Some(0.0);
            losses[0] = Some(0.0);
        }

        for i in 1..n {
            let (prev, curr) = (bars[i - 1].close, bars[i].close);
            if !prev.is_finite() || !curr.is_finite() {
                continue;
            }
            let delta = curr - prev;
            gains[i] = Some(delta.max(0.0));
            losses[i] = Some((-delta).max(0.0));
        }

        let avg_gain = rolling_mean(&gains, self.period);
        let avg_loss = rolling_mean(&losses, self.period);

        avg_gain
            .iter()
            .zip(&avg_loss)
            .map(|(g, l)| match (g, l) {
                (Some(g), Some(l)) => compute_rsi(*g, *l),
                _ => None,
            })
            .collect()
    }
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if avg_loss == 0.0 {
        return None;
    }
    Some(100.0 - 100.0 / (1.0 + avg_gain / avg_loss))
}
