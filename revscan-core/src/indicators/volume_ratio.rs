//! Volume ratio: today's volume against the mean of the preceding bars.
//!
//! ratio[t] = volume[t] / mean(volume[t-period..t-1])
//! The reference window is lagged one bar, so it never includes today.
//! Lookback: period. Zero reference volume → undefined.

use crate::domain::Bar;

use super::sma::{rolling_mean, BarField};
use super::{Indicator, Series};

#[derive(Debug, Clone)]
pub struct VolumeRatio {
    period: usize,
    name: String,
}

impl VolumeRatio {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "volume ratio period must be >= 1");
        Self {
            period,
            name: format!("vol_ratio_{period}"),
        }
    }
}

impl Indicator for VolumeRatio {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Series {
        let volumes = BarField::Volume.series(bars);
        let reference = rolling_mean(&volumes, self.period);

        let mut result = vec![None; bars.len()];
        for i in 1..bars.len() {
            if let (Some(today), Some(base)) = (volumes[i], reference[i - 1]) {
                if base > 0.0 {
                    result[i] = Some(today / base);
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    fn with_volumes(volumes: &[f64]) -> Vec<Bar> {
        let mut bars = make_bars(&vec![10.0; volumes.len()]);
        for (bar, v) in bars.iter_mut().zip(volumes) {
            bar.volume = *v;
        }
        bars
    }

    #[test]
    fn ratio_excludes_today() {
        let bars = with_volumes(&[100.0, 200.0, 300.0, 400.0, 500.0, 900.0]);
        let result = VolumeRatio::new(5).compute(&bars);
        for v in result.iter().take(5) {
            assert!(v.is_none());
        }
        // reference = mean(100..=500) = 300
        assert_approx(result[5], 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn zero_reference_is_undefined() {
        let bars = with_volumes(&[0.0, 0.0, 0.0, 0.0]);
        let result = VolumeRatio::new(2).compute(&bars);
        assert!(result.iter().all(|v| v.is_none()));
    }

    #[test]
    fn lookback_matches_first_defined() {
        let bars = with_volumes(&[10.0; 8]);
        let ratio = VolumeRatio::new(5);
        let result = ratio.compute(&bars);
        assert_eq!(result.iter().position(|v| v.is_some()), Some(ratio.lookback()));
        assert_approx(result[7], 1.0, DEFAULT_EPSILON);
    }
}
