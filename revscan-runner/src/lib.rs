//! RevScan Runner: scan orchestration over a universe of securities.
//!
//! This crate builds on `revscan-core` to provide:
//! - CSV bar loading (one file per security) and the code → name table
//! - Scan configuration files with preset or inline strategies
//! - The parallel `ScanOrchestrator` with outcome tallies
//! - Result ranking, CSV reports and JSON run manifests
//! - Seeded synthetic universes for smoke runs

pub mod config;
pub mod data_loader;
pub mod export;
pub mod names;
pub mod orchestrator;
pub mod ranking;
pub mod synthetic;

pub use config::{ConfigError, ScanConfig, StrategySpec};
pub use data_loader::{
    load_bar_file, read_bars, BarSource, CsvDirectory, InMemorySource, LoadError,
};
pub use export::{format_summary, report_path, save_report, RunManifest};
pub use names::{NameTable, UNKNOWN_NAME};
pub use orchestrator::{OutcomeTally, ScanError, ScanOrchestrator, ScanReport};
pub use synthetic::{generate_universe, write_synthetic_universe, SyntheticSpec};
