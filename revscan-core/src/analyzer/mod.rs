//! SecurityAnalyzer: the per-security pipeline.
//!
//! identity → history length → series validation → indicators → today's gate
//! → today's predicate → ledger replay → classification.
//!
//! Every path returns an [`Outcome`]; nothing here panics on bad input.

pub mod classify;
pub mod result;

use std::time::{Duration, Instant};

use crate::domain::{validate_series, Bar};
use crate::indicators::IndicatorFrame;
use crate::ledger::replay_until;
use crate::signal::{RulePredicate, SignalPredicate};
use crate::strategy::{StrategyConfig, StrategyError};

pub use classify::{Advice, ClassificationConfig, Strength};
pub use result::{Exclusion, ExclusionKind, IndicatorSnapshot, Outcome, ScanResult};

/// Runs one strategy against one security at a time. Cheap to share across threads.
#[derive(Debug, Clone)]
pub struct SecurityAnalyzer {
    config: StrategyConfig,
    predicate: RulePredicate,
    gate: RulePredicate,
    time_budget: Option<Duration>,
}

impl SecurityAnalyzer {
    pub fn new(config: StrategyConfig) -> Result<Self, StrategyError> {
        config.validate()?;
        Ok(Self {
            predicate: config.predicate(),
            gate: config.gate_predicate(),
            config,
            time_budget: None,
        })
    }

    /// Give up on a security after `budget`, returning `Exclusion::Timeout`.
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn check_identity(&self, code: &str, name: &str) -> Result<(), Exclusion> {
        self.config
            .identity
            .check(code, name)
            .map_err(Exclusion::Identity)
    }

    pub fn analyze(&self, code: &str, name: &str, bars: &[Bar]) -> Outcome {
        let deadline = self.time_budget.map(|b| Instant::now() + b);

        self.check_identity(code, name)?;
        if bars.len() < self.config.min_history {
            return Err(Exclusion::InsufficientHistory {
                have: bars.len(),
                need: self.config.min_history,
            });
        }
        validate_series(bars).map_err(|e| Exclusion::Data(e.to_string()))?;

        let frame = IndicatorFrame::compute(bars, &self.config.indicators);
        self.check_deadline(deadline)?;

        let today = bars.len() - 1;
        if let Some(failed) = self.gate.first_failure(bars, today, &frame) {
            return Err(Exclusion::Filtered {
                condition: failed.name().to_string(),
            });
        }
        if !self.predicate.evaluate(bars, today, &frame) {
            return Err(Exclusion::NoSignal);
        }

        let ledger = replay_until(
            bars,
            &frame,
            &self.predicate,
            &self.config.horizons,
            self.config.ledger_window,
            deadline,
        )
        .map_err(|_| self.timeout())?;
        self.check_deadline(deadline)?;

        let (strength, advice) = self.config.classification.classify(&ledger);
        Ok(ScanResult {
            code: code.to_string(),
            name: name.to_string(),
            strategy: self.config.name.clone(),
            date: bars[today].date,
            close: bars[today].close,
            snapshot: IndicatorSnapshot::at(bars, &frame, today),
            hit_count: ledger.hit_count(),
            horizons: ledger.stats().to_vec(),
            strength,
            advice,
        })
    }

    fn check_deadline(&self, deadline: Option<Instant>) -> Result<(), Exclusion> {
        match deadline {
            Some(d) if Instant::now() >= d => Err(self.timeout()),
            _ => Ok(()),
        }
    }

    fn timeout(&self) -> Exclusion {
        Exclusion::Timeout {
            budget_ms: self
                .time_budget
                .map_or(0, |b| u64::try_from(b.as_millis()).unwrap_or(u64::MAX)),
        }
    }
}
