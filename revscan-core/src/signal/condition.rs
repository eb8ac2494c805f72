//! Sub-condition grammar for rule predicates.
//!
//! Each `Condition` is one member of the "shrink-then-reverse" family. A strategy
//! picks a subset and sets thresholds; the conjunction is a `RulePredicate`.
//!
//! Every check reads only bars `..=i`. Any undefined indicator, missing prior bar
//! or non-finite price makes the owning condition false.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::indicators::frame::{
    IndicatorFrame, IndicatorSettings, KDJ_PERIOD, MA_FAST, MA_SLOW, RSI_PERIOD, TURNOVER_WINDOW,
    VOL_RATIO_WINDOW,
};

/// One sub-condition with its thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// close within [min, max]; either bound may be omitted.
    PriceBand {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// 30-bar average turnover at or below `max`.
    TurnoverCeiling { max: f64 },
    /// Distance from close up to MA60, in percent of close, at least `min_pct`.
    Ma60Headroom { min_pct: f64 },
    /// Today's percent change at or below `max_pct`.
    DailyMoveCap { max_pct: f64 },
    /// RSI6 <= rsi_max and KDJ K <= k_max.
    Oversold { rsi_max: f64, k_max: f64 },
    /// close >= MA5, or MA5 not falling versus yesterday.
    Stabilization,
    /// Volume ratio within [min, max].
    VolumeRatioBand { min: f64, max: f64 },
    /// Some bar in the `lookback` bars before today traded above its own volume MA × multiplier.
    PriorActivity { lookback: usize, multiplier: f64 },
    /// Each of the `bars` bars before today traded below today's volume MA × multiplier.
    ShrinkToExtreme { bars: usize, multiplier: f64 },
    /// Bullish candle closing above yesterday's high.
    ReversalBreakout,
    /// Volume above yesterday's.
    VolumePickup,
}

impl Condition {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PriceBand { .. } => "price_band",
            Self::TurnoverCeiling { .. } => "turnover_ceiling",
            Self::Ma60Headroom { .. } => "ma60_headroom",
            Self::DailyMoveCap { .. } => "daily_move_cap",
            Self::Oversold { .. } => "oversold",
            Self::Stabilization => "stabilization",
            Self::VolumeRatioBand { .. } => "volume_ratio_band",
            Self::PriorActivity { .. } => "prior_activity",
            Self::ShrinkToExtreme { .. } => "shrink_to_extreme",
            Self::ReversalBreakout => "reversal_breakout",
            Self::VolumePickup => "volume_pickup",
        }
    }

    /// First bar index at which every indicator this condition reads is defined.
    pub fn warmup_bars(&self, settings: &IndicatorSettings) -> usize {
        let vol_ma_first = settings.vol_ma_period.max(1) - 1;
        match self {
            Self::PriceBand { .. } | Self::DailyMoveCap { .. } => 0,
            Self::TurnoverCeiling { .. } => TURNOVER_WINDOW - 1,
            Self::Ma60Headroom { .. } => MA_SLOW - 1,
            Self::Oversold { .. } => (RSI_PERIOD - 1).max(KDJ_PERIOD - 1),
            Self::Stabilization => MA_FAST,
            Self::VolumeRatioBand { .. } => VOL_RATIO_WINDOW,
            Self::PriorActivity { lookback, .. } => (vol_ma_first + 1).max(*lookback),
            Self::ShrinkToExtreme { bars, .. } => vol_ma_first.max(*bars),
            Self::ReversalBreakout | Self::VolumePickup => 1,
        }
    }

    /// Evaluate at bar `i`. Callers guarantee `i < bars.len()` and an aligned frame.
    pub fn holds(&self, bars: &[Bar], i: usize, frame: &IndicatorFrame) -> bool {
        let bar = &bars[i];
        match self {
            Self::PriceBand { min, max } => {
                bar.close.is_finite()
                    && min.map_or(true, |m| bar.close >= m)
                    && max.map_or(true, |m| bar.close <= m)
            }
            Self::TurnoverCeiling { max } => at_most(frame.avg_turnover_30(i), *max),
            Self::Ma60Headroom { min_pct } => {
                at_least(ma60_headroom_pct(bar.close, frame.ma60(i)), *min_pct)
            }
            Self::DailyMoveCap { max_pct } => at_most(Some(bar.pct_change), *max_pct),
            Self::Oversold { rsi_max, k_max } => {
                at_most(frame.rsi6(i), *rsi_max) && at_most(frame.kdj_k(i), *k_max)
            }
            Self::Stabilization => {
                let above_ma5 = frame.ma5(i).is_some_and(|ma| bar.close >= ma);
                let turning_up = i >= 1
                    && matches!(
                        (frame.ma5(i), frame.ma5(i - 1)),
                        (Some(today), Some(yesterday)) if today >= yesterday
                    );
                above_ma5 || turning_up
            }
            Self::VolumeRatioBand { min, max } => frame
                .vol_ratio(i)
                .is_some_and(|r| r >= *min && r <= *max),
            Self::PriorActivity {
                lookback,
                multiplier,
            } => {
                if *lookback == 0 || i < *lookback {
                    return false;
                }
                ((i - lookback)..i).any(|j| {
                    frame
                        .vol_ma(j)
                        .is_some_and(|ma| bars[j].volume > ma * multiplier)
                })
            }
            Self::ShrinkToExtreme { bars: n, multiplier } => {
                if *n == 0 || i < *n {
                    return false;
                }
                let Some(ma) = frame.vol_ma(i) else {
                    return false;
                };
                let ceiling = ma * multiplier;
                ((i - n)..i).all(|j| bars[j].volume < ceiling)
            }
            Self::ReversalBreakout => {
                i >= 1 && bar.close > bars[i - 1].high && bar.close > bar.open
            }
            Self::VolumePickup => i >= 1 && bar.volume > bars[i - 1].volume,
        }
    }
}

/// (ma60 - close) / close × 100; undefined for a missing MA or non-positive close.
pub fn ma60_headroom_pct(close: f64, ma60: Option<f64>) -> Option<f64> {
    let ma60 = ma60?;
    if close > 0.0 && close.is_finite() {
        Some((ma60 - close) / close * 100.0)
    } else {
        None
    }
}

fn at_most(value: Option<f64>, limit: f64) -> bool {
    value.is_some_and(|v| v <= limit)
}

fn at_least(value: Option<f64>, floor: f64) -> bool {
    value.is_some_and(|v| v >= floor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn frame_for(bars: &[Bar]) -> IndicatorFrame {
        IndicatorFrame::compute(bars, &IndicatorSettings::default())
    }

    #[test]
    fn undefined_inputs_fail_every_threshold() {
        let bars = make_bars(&[10.0; 3]);
        let frame = frame_for(&bars);
        let undefined_readers = [
            Condition::TurnoverCeiling { max: 1e9 },
            Condition::Ma60Headroom { min_pct: -1e9 },
            Condition::Oversold {
                rsi_max: 1e9,
                k_max: 1e9,
            },
            Condition::VolumeRatioBand {
                min: -1e9,
                max: 1e9,
            },
            Condition::PriorActivity {
                lookback: 2,
                multiplier: 0.0,
            },
            Condition::ShrinkToExtreme {
                bars: 2,
                multiplier: 1e9,
            },
        ];
        for cond in &undefined_readers {
            assert!(!cond.holds(&bars, 2, &frame), "{} passed on undefined", cond.name());
        }
    }

    #[test]
    fn price_band_bounds() {
        let bars = make_bars(&[4.0, 5.0, 20.0, 21.0]);
        let frame = frame_for(&bars);
        let band = Condition::PriceBand {
            min: Some(5.0),
            max: Some(20.0),
        };
        let hits: Vec<bool> = (0..4).map(|i| band.holds(&bars, i, &frame)).collect();
        assert_eq!(hits, vec![false, true, true, false]);

        let floor_only = Condition::PriceBand {
            min: Some(5.0),
            max: None,
        };
        assert!(floor_only.holds(&bars, 3, &frame));
    }

    #[test]
    fn reversal_breakout_needs_prior_bar() {
        let mut bars = make_bars(&[10.0, 10.0]);
        bars[1].open = 10.0;
        bars[1].close = 12.0;
        bars[1].high = 12.5;
        let frame = frame_for(&bars);
        assert!(!Condition::ReversalBreakout.holds(&bars, 0, &frame));
        // close 12 > prior high 11 and > open 10
        assert!(Condition::ReversalBreakout.holds(&bars, 1, &frame));

        bars[1].open = 12.5;
        assert!(!Condition::ReversalBreakout.holds(&bars, 1, &frame));
    }

    #[test]
    fn volume_pickup_compares_yesterday() {
        let mut bars = make_bars(&[10.0, 10.0, 10.0]);
        bars[1].volume = 900.0;
        bars[2].volume = 950.0;
        let frame = frame_for(&bars);
        assert!(!Condition::VolumePickup.holds(&bars, 0, &frame));
        assert!(!Condition::VolumePickup.holds(&bars, 1, &frame));
        assert!(Condition::VolumePickup.holds(&bars, 2, &frame));
    }

    #[test]
    fn stabilization_either_branch() {
        // Falling series: close below MA5 and MA5 falling
        let falling: Vec<f64> = (0..8).map(|i| 20.0 - i as f64).collect();
        let bars = make_bars(&falling);
        let frame = frame_for(&bars);
        assert!(!Condition::Stabilization.holds(&bars, 7, &frame));

        // Last close jumps above MA5
        let mut bounce = falling.clone();
        bounce[7] = 30.0;
        let bars = make_bars(&bounce);
        let frame = frame_for(&bars);
        assert!(Condition::Stabilization.holds(&bars, 7, &frame));
    }

    #[test]
    fn headroom_percent() {
        assert_eq!(ma60_headroom_pct(10.0, Some(12.0)), Some(20.0));
        assert_eq!(ma60_headroom_pct(0.0, Some(12.0)), None);
        assert_eq!(ma60_headroom_pct(10.0, None), None);
    }

    #[test]
    fn warmup_per_condition() {
        let s = IndicatorSettings::default();
        assert_eq!(Condition::Ma60Headroom { min_pct: 10.0 }.warmup_bars(&s), 59);
        assert_eq!(
            Condition::Oversold {
                rsi_max: 35.0,
                k_max: 45.0
            }
            .warmup_bars(&s),
            8
        );
        assert_eq!(
            Condition::PriorActivity {
                lookback: 5,
                multiplier: 1.5
            }
            .warmup_bars(&s),
            20
        );
        assert_eq!(
            Condition::ShrinkToExtreme {
                bars: 2,
                multiplier: 0.7
            }
            .warmup_bars(&s),
            19
        );
    }

    #[test]
    fn prior_activity_fires_once_one_volume_mean_exists() {
        let mut bars = make_bars(&[10.0; 21]);
        // vol_ma20 first defined at 19: (19 × 1000 + 5000) / 20 = 1200
        bars[19].volume = 5000.0;
        let frame = frame_for(&bars);
        let activity = Condition::PriorActivity {
            lookback: 5,
            multiplier: 1.5,
        };
        assert_eq!(activity.warmup_bars(&IndicatorSettings::default()), 20);
        assert!(!activity.holds(&bars, 19, &frame));
        assert!(activity.holds(&bars, 20, &frame));
    }

    #[test]
    fn toml_tagged_roundtrip() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            signal: Vec<Condition>,
        }
        let src = r#"
            [[signal]]
            type = "price_band"
            min = 5.0

            [[signal]]
            type = "oversold"
            rsi_max = 35.0
            k_max = 45.0

            [[signal]]
            type = "stabilization"
        "#;
        let parsed: Wrapper = toml::from_str(src).unwrap();
        assert_eq!(
            parsed.signal,
            vec![
                Condition::PriceBand {
                    min: Some(5.0),
                    max: None
                },
                Condition::Oversold {
                    rsi_max: 35.0,
                    k_max: 45.0
                },
                Condition::Stabilization,
            ]
        );
    }
}
