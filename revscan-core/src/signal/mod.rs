//! Signal predicates: point-in-time boolean rules over bars and indicators.
//!
//! A predicate sees only bar history and the precomputed indicator frame. It is
//! evaluated at a single index and must only read `bars[..=index]`.

pub mod condition;
pub mod preset;
pub mod rule;

use crate::domain::Bar;
use crate::indicators::IndicatorFrame;

pub use condition::Condition;
pub use preset::StrategyPreset;
pub use rule::RulePredicate;

/// Trait for signal predicates.
///
/// # Architecture invariant
/// `evaluate` never panics and never reads past `bar_index`. Undefined inputs
/// evaluate to `false`.
pub trait SignalPredicate: Send + Sync {
    /// Human-readable name (e.g., "volume_reversal").
    fn name(&self) -> &str;

    /// Rule version, bumped when thresholds or conditions change.
    fn version(&self) -> u32;

    /// First bar index at which the predicate can be evaluated.
    fn warmup_bars(&self) -> usize;

    /// Evaluate the predicate at `bar_index`.
    fn evaluate(&self, bars: &[Bar], bar_index: usize, frame: &IndicatorFrame) -> bool;
}
