//! RevScan Core: bars, indicators, signal predicates, backtest ledger, per-security analysis.
//!
//! This crate contains the screening engine:
//! - Domain types (bars and series validation)
//! - Indicator engine producing an aligned `IndicatorFrame`
//! - Condition grammar and `SignalPredicate` rules, with named presets
//! - Historical ledger of forward returns after each past signal
//! - `SecurityAnalyzer` turning one security's bars into an `Outcome`
//!
//! Nothing here touches the filesystem or spawns threads; see `revscan-runner`.

pub mod analyzer;
pub mod domain;
pub mod indicators;
pub mod ledger;
pub mod signal;
pub mod strategy;
