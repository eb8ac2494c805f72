//! RulePredicate: a named, versioned conjunction of conditions.

use crate::domain::Bar;
use crate::indicators::{IndicatorFrame, IndicatorSettings};

use super::{Condition, SignalPredicate};

#[derive(Debug, Clone)]
pub struct RulePredicate {
    name: String,
    version: u32,
    conditions: Vec<Condition>,
    warmup: usize,
}

impl RulePredicate {
    pub fn new(
        name: impl Into<String>,
        version: u32,
        conditions: Vec<Condition>,
        settings: &IndicatorSettings,
    ) -> Self {
        let warmup = conditions
            .iter()
            .map(|c| c.warmup_bars(settings))
            .max()
            .unwrap_or(0);
        Self {
            name: name.into(),
            version,
            conditions,
            warmup,
        }
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// First condition that fails at `bar_index`, or `None` when the rule holds.
    ///
    /// An index outside the evaluable range reports the first condition.
    pub fn first_failure(
        &self,
        bars: &[Bar],
        bar_index: usize,
        frame: &IndicatorFrame,
    ) -> Option<&Condition> {
        if !self.in_range(bars, bar_index, frame) {
            return self.conditions.first();
        }
        self.conditions
            .iter()
            .find(|c| !c.holds(bars, bar_index, frame))
    }

    fn in_range(&self, bars: &[Bar], bar_index: usize, frame: &IndicatorFrame) -> bool {
        bar_index < bars.len() && frame.len() == bars.len() && bar_index >= self.warmup
    }
}

impl SignalPredicate for RulePredicate {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn warmup_bars(&self) -> usize {
        self.warmup
    }

    fn evaluate(&self, bars: &[Bar], bar_index: usize, frame: &IndicatorFrame) -> bool {
        self.in_range(bars, bar_index, frame)
            && self
                .conditions
                .iter()
                .all(|c| c.holds(bars, bar_index, frame))
    }
}
