//! IndicatorFrame: every indicator the predicate grammar reads, aligned 1:1 with bars.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;

use super::{value_at, BarField, Indicator, KdjK, Rsi, Series, Sma, VolumeRatio};

pub const RSI_PERIOD: usize = 6;
pub const KDJ_PERIOD: usize = 9;
pub const KDJ_COM: f64 = 2.0;
pub const MA_FAST: usize = 5;
pub const MA_SLOW: usize = 60;
pub const TURNOVER_WINDOW: usize = 30;
pub const VOL_RATIO_WINDOW: usize = 5;

/// Tunable indicator parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSettings {
    /// Period of the volume moving average used by the activity and shrink checks.
    #[serde(default = "default_vol_ma_period")]
    pub vol_ma_period: usize,
}

fn default_vol_ma_period() -> usize {
    20
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            vol_ma_period: default_vol_ma_period(),
        }
    }
}

/// Precomputed indicator columns for one security.
///
/// Built once per security, then queried by bar index during today's check and
/// the history replay.
#[derive(Debug, Clone, Default)]
pub struct IndicatorFrame {
    pub rsi6: Series,
    pub kdj_k: Series,
    pub ma5: Series,
    pub ma60: Series,
    pub avg_turnover_30: Series,
    pub vol_ma: Series,
    pub vol_ratio: Series,
}

impl IndicatorFrame {
    pub fn compute(bars: &[Bar], settings: &IndicatorSettings) -> Self {
        Self {
            rsi6: Rsi::new(RSI_PERIOD).compute(bars),
            kdj_k: KdjK::new(KDJ_PERIOD, KDJ_COM).compute(bars),
            ma5: Sma::close(MA_FAST).compute(bars),
            ma60: Sma::close(MA_SLOW).compute(bars),
            avg_turnover_30: Sma::new(TURNOVER_WINDOW, BarField::Turnover).compute(bars),
            vol_ma: Sma::new(settings.vol_ma_period.max(1), BarField::Volume).compute(bars),
            vol_ratio: VolumeRatio::new(VOL_RATIO_WINDOW).compute(bars),
        }
    }

    pub fn len(&self) -> usize {
        self.rsi6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rsi6.is_empty()
    }

    pub fn rsi6(&self, i: usize) -> Option<f64> {
        value_at(&self.rsi6, i)
    }

    pub fn kdj_k(&self, i: usize) -> Option<f64> {
        value_at(&self.kdj_k, i)
    }

    pub fn ma5(&self, i: usize) -> Option<f64> {
        value_at(&self.ma5, i)
    }

    pub fn ma60(&self, i: usize) -> Option<f64> {
        value_at(&self.ma60, i)
    }

    pub fn avg_turnover_30(&self, i: usize) -> Option<f64> {
        value_at(&self.avg_turnover_30, i)
    }

    pub fn vol_ma(&self, i: usize) -> Option<f64> {
        value_at(&self.vol_ma, i)
    }

    pub fn vol_ratio(&self, i: usize) -> Option<f64> {
        value_at(&self.vol_ratio, i)
    }
}
