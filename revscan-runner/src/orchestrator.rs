//! ScanOrchestrator: fans the analyzer out over a universe.
//!
//! Each security is an independent task on a private rayon pool: load bars,
//! look up the name, analyze, return an `Outcome`. The parallel collect is the
//! only join point. A panicking task is caught and counted as a data error so
//! one bad file never takes the run down.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use revscan_core::analyzer::{Exclusion, ExclusionKind, Outcome, ScanResult, SecurityAnalyzer};
use revscan_core::strategy::{RankKey, StrategyConfig, StrategyError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data_loader::{BarSource, LoadError};
use crate::names::NameTable;
use crate::ranking;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid strategy: {0}")]
    Strategy(#[from] StrategyError),

    #[error("list universe: {0}")]
    Source(#[from] LoadError),

    #[error("build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("worker count must be >= 1")]
    NoWorkers,
}

/// Outcome counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeTally {
    pub results: usize,
    pub excluded: BTreeMap<ExclusionKind, usize>,
}

impl OutcomeTally {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Ok(_) => self.results += 1,
            Err(exclusion) => *self.excluded.entry(exclusion.kind()).or_default() += 1,
        }
    }

    pub fn count(&self, kind: ExclusionKind) -> usize {
        self.excluded.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_excluded(&self) -> usize {
        self.excluded.values().sum()
    }

    pub fn total(&self) -> usize {
        self.results + self.total_excluded()
    }
}

/// Everything a scan produced.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub strategy: StrategyConfig,
    /// Ranked best first, truncated to `top_n`.
    pub results: Vec<ScanResult>,
    pub tally: OutcomeTally,
    pub elapsed: Duration,
}

pub struct ScanOrchestrator {
    analyzer: SecurityAnalyzer,
    workers: usize,
    top_n: Option<usize>,
    rank_by: RankKey,
}

impl ScanOrchestrator {
    pub fn new(strategy: StrategyConfig, workers: usize) -> Result<Self, ScanError> {
        if workers == 0 {
            return Err(ScanError::NoWorkers);
        }
        let rank_by = strategy.rank_by;
        Ok(Self {
            analyzer: SecurityAnalyzer::new(strategy)?,
            workers,
            top_n: None,
            rank_by,
        })
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.analyzer = self.analyzer.with_time_budget(budget);
        self
    }

    pub fn with_top_n(mut self, top_n: Option<usize>) -> Self {
        self.top_n = top_n;
        self
    }

    /// Override the strategy's own ranking.
    pub fn with_rank(mut self, rank_by: RankKey) -> Self {
        self.rank_by = rank_by;
        self
    }

    pub fn strategy(&self) -> &StrategyConfig {
        self.analyzer.config()
    }

    pub fn run<S: BarSource + ?Sized>(
        &self,
        source: &S,
        names: &NameTable,
    ) -> Result<ScanReport, ScanError> {
        let started = Instant::now();
        let codes = source.codes()?;
        tracing::info!(
            strategy = %self.strategy().name,
            universe = codes.len(),
            workers = self.workers,
            "scan started"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()?;
        let outcomes: Vec<Outcome> = pool.install(|| {
            codes
                .par_iter()
                .map(|code| self.scan_one(source, names, code))
                .collect()
        });

        let mut tally = OutcomeTally::default();
        let mut results = Vec::new();
        for outcome in outcomes {
            tally.record(&outcome);
            if let Ok(result) = outcome {
                results.push(result);
            }
        }

        ranking::rank(&mut results, self.rank_by);
        if let Some(n) = self.top_n {
            results.truncate(n);
        }

        let elapsed = started.elapsed();
        tracing::info!(
            results = tally.results,
            excluded = tally.total_excluded(),
            elapsed_ms = elapsed.as_millis() as u64,
            "scan finished"
        );
        Ok(ScanReport {
            strategy: self.strategy().clone(),
            results,
            tally,
            elapsed,
        })
    }

    fn scan_one<S: BarSource + ?Sized>(
        &self,
        source: &S,
        names: &NameTable,
        code: &str,
    ) -> Outcome {
        let name = names.lookup(code);
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.analyzer.check_identity(code, name)?;
            let bars = source
                .load(code)
                .map_err(|e| Exclusion::Data(e.to_string()))?;
            self.analyzer.analyze(code, name, &bars)
        }))
        .unwrap_or_else(|_| Err(Exclusion::Data("analysis panicked".into())));

        match &outcome {
            Ok(_) => tracing::debug!(code, name, "signal"),
            Err(Exclusion::Data(reason)) => tracing::warn!(code, %reason, "data error"),
            Err(exclusion) => tracing::debug!(code, %exclusion, "excluded"),
        }
        outcome
    }
}
