//! RevScan CLI: scan, preset and synthetic-data commands.
//!
//! Commands:
//! - `scan` runs a strategy over a directory of bar files and writes a report
//! - `presets` lists the built-in strategies, or prints one as TOML
//! - `synth` writes a seeded synthetic universe for smoke runs

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use revscan_core::signal::StrategyPreset;
use revscan_core::strategy::RankKey;
use revscan_runner::{
    format_summary, save_report, write_synthetic_universe, CsvDirectory, NameTable, ScanConfig,
    ScanOrchestrator, StrategySpec, SyntheticSpec,
};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Rows printed to the console after a scan.
const SUMMARY_ROWS: usize = 20;

#[derive(Parser)]
#[command(
    name = "revscan",
    version,
    about = "RevScan: shrink-then-reverse screener for daily A-share bars"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a universe with a strategy and write a ranked report.
    Scan {
        /// Path to a TOML scan config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Built-in strategy; overrides the config's strategy.
        #[arg(long)]
        preset: Option<StrategyPreset>,

        /// Directory of `<code>.csv` bar files.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// CSV mapping codes to names.
        #[arg(long)]
        names: Option<PathBuf>,

        /// Report directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Worker threads.
        #[arg(long)]
        workers: Option<usize>,

        /// Upper bound on worker threads.
        #[arg(long)]
        max_workers: Option<usize>,

        /// Keep only the best N results.
        #[arg(long)]
        top: Option<usize>,

        /// Per-security time budget in milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Ranking: volume_ratio_then_rsi, win_rate or win_rate:<horizon>.
        #[arg(long)]
        rank: Option<RankKey>,

        /// Print results without writing report files.
        #[arg(long, default_value_t = false)]
        no_write: bool,
    },
    /// List built-in strategies.
    Presets {
        /// Print one preset as a strategy TOML table.
        #[arg(long)]
        show: Option<StrategyPreset>,
    },
    /// Write a synthetic universe of bar files plus names.csv.
    Synth {
        /// Output directory.
        #[arg(long, default_value = "synthetic_data")]
        out: PathBuf,

        /// Number of securities.
        #[arg(long, default_value_t = 50)]
        count: usize,

        /// Bars per security.
        #[arg(long, default_value_t = 250)]
        bars: usize,
    },
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init()
        .map_err(|err| anyhow!("failed to initialize tracing: {err}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    match cli.command {
        Commands::Scan {
            config,
            preset,
            data_dir,
            names,
            output_dir,
            workers,
            max_workers,
            top,
            timeout_ms,
            rank,
            no_write,
        } => {
            let mut scan = match config {
                Some(path) => ScanConfig::load(&path)
                    .with_context(|| format!("failed to load {}", path.display()))?,
                None => ScanConfig::default(),
            };
            if let Some(preset) = preset {
                scan.strategy = StrategySpec::Preset { preset };
            }
            scan.data_dir = data_dir.unwrap_or(scan.data_dir);
            scan.names = names.or(scan.names);
            scan.output_dir = output_dir.unwrap_or(scan.output_dir);
            scan.workers = workers.or(scan.workers);
            scan.max_workers = max_workers.or(scan.max_workers);
            scan.top_n = top.or(scan.top_n);
            scan.timeout_ms = timeout_ms.or(scan.timeout_ms);
            if no_write {
                scan.write_report = false;
            }
            run_scan(&scan, rank)
        }
        Commands::Presets { show } => run_presets(show),
        Commands::Synth { out, count, bars } => run_synth(&out, count, bars),
    }
}

fn load_names(path: Option<&Path>) -> Result<NameTable> {
    let Some(path) = path else {
        return Ok(NameTable::new());
    };
    if !path.exists() {
        tracing::warn!(path = %path.display(), "names file not found; names will be unknown");
        return Ok(NameTable::new());
    }
    let names = NameTable::load(path)
        .with_context(|| format!("failed to load names from {}", path.display()))?;
    tracing::info!(path = %path.display(), entries = names.len(), "names loaded");
    Ok(names)
}

fn run_scan(scan: &ScanConfig, rank: Option<RankKey>) -> Result<()> {
    if !scan.data_dir.is_dir() {
        bail!("data directory {} does not exist", scan.data_dir.display());
    }
    let strategy = scan.strategy.resolve().context("invalid strategy")?;
    let workers = scan.resolve_workers()?;
    let offset = scan.utc_offset()?;
    let names = load_names(scan.names.as_deref())?;

    let mut orchestrator = ScanOrchestrator::new(strategy, workers)?.with_top_n(scan.top_n);
    if let Some(ms) = scan.timeout_ms {
        orchestrator = orchestrator.with_time_budget(Duration::from_millis(ms));
    }
    if let Some(rank) = rank {
        orchestrator = orchestrator.with_rank(rank);
    }

    let source = CsvDirectory::new(&scan.data_dir);
    let report = orchestrator.run(&source, &names)?;
    print!("{}", format_summary(&report, SUMMARY_ROWS));

    if !scan.write_report {
        return Ok(());
    }
    let now = Utc::now().with_timezone(&offset);
    match save_report(&report, &scan.output_dir, &now)? {
        Some(path) => println!("\nReport saved to: {}", path.display()),
        None => println!("\nNo qualifying securities; no report written."),
    }
    Ok(())
}

fn run_presets(show: Option<StrategyPreset>) -> Result<()> {
    if let Some(preset) = show {
        print!("{}", preset.to_config().to_toml()?);
        return Ok(());
    }
    for preset in StrategyPreset::all() {
        println!("{:<18} {}", preset.name(), preset.description());
    }
    Ok(())
}

fn run_synth(out: &Path, count: usize, bars: usize) -> Result<()> {
    let spec = SyntheticSpec {
        count,
        bars,
        ..SyntheticSpec::default()
    };
    let written = write_synthetic_universe(out, &spec)?;
    println!("Wrote {written} synthetic securities to {}", out.display());
    println!(
        "Scan them with: revscan scan --data-dir {0} --names {0}/names.csv",
        out.display()
    );
    Ok(())
}
