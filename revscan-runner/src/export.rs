//! Report export: the result CSV with its run manifest, plus the console summary.
//!
//! Reports land in `<output_dir>/<YYYY>/<MM>/<strategy>_<YYYYmmdd_HHMMSS>.csv`
//! with a `.json` manifest beside them. Percentages use `n/a` for "no data".
//! The CSV carries a UTF-8 BOM so spreadsheet tools pick up the encoding.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use revscan_core::analyzer::ScanResult;
use revscan_core::strategy::StrategyConfig;
use serde::{Deserialize, Serialize};

use crate::orchestrator::{OutcomeTally, ScanReport};

/// Bumped when the manifest layout changes.
pub const SCHEMA_VERSION: u32 = 1;

const NO_DATA: &str = "n/a";
const UTF8_BOM: &str = "\u{feff}";

/// Everything needed to reproduce and audit a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    pub generated_at: String,
    pub strategy: StrategyConfig,
    pub fingerprint: String,
    pub tally: OutcomeTally,
    pub reported: usize,
    pub elapsed_ms: u64,
    pub report_file: String,
}

// ─── Paths ──────────────────────────────────────────────────────────

/// CSV path for a run, partitioned by year and month of `at`.
pub fn report_path(output_dir: &Path, strategy: &str, at: &DateTime<FixedOffset>) -> PathBuf {
    output_dir
        .join(at.format("%Y").to_string())
        .join(at.format("%m").to_string())
        .join(format!("{strategy}_{}.csv", at.format("%Y%m%d_%H%M%S")))
}

// ─── CSV ────────────────────────────────────────────────────────────

fn opt(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| NO_DATA.to_string(), |v| format!("{v:.decimals$}"))
}

fn pct(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| NO_DATA.to_string(), |v| format!("{:.decimals$}%", v * 100.0))
}

/// Serialize results to CSV, one `win_rate`/`avg_return` column pair per horizon.
pub fn export_results_csv(results: &[ScanResult], horizons: &[usize]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header: Vec<String> = [
        "code",
        "name",
        "date",
        "close",
        "vol_ratio",
        "rsi6",
        "kdj_k",
        "headroom_pct",
        "pct_change",
        "hits",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    for h in horizons {
        header.push(format!("win_rate_{h}d"));
        header.push(format!("avg_return_{h}d"));
    }
    header.push("strength".into());
    header.push("advice".into());
    wtr.write_record(&header)?;

    for r in results {
        let s = &r.snapshot;
        let mut row = vec![
            r.code.clone(),
            r.name.clone(),
            r.date.format("%Y-%m-%d").to_string(),
            format!("{:.2}", r.close),
            opt(s.vol_ratio, 2),
            opt(s.rsi6, 1),
            opt(s.kdj_k, 1),
            opt(s.headroom_pct, 1),
            format!("{:.2}", s.pct_change),
            r.hit_count.to_string(),
        ];
        for &h in horizons {
            let stats = r.stats_for(h);
            row.push(pct(stats.and_then(|st| st.win_rate), 1));
            row.push(pct(stats.and_then(|st| st.avg_return), 2));
        }
        row.push(r.strength.to_string());
        row.push(r.advice.to_string());
        wtr.write_record(&row)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifacts ──────────────────────────────────────────────────────

/// Write the CSV report and its manifest. Returns `None` when there is nothing to report.
pub fn save_report(
    report: &ScanReport,
    output_dir: &Path,
    at: &DateTime<FixedOffset>,
) -> Result<Option<PathBuf>> {
    if report.results.is_empty() {
        return Ok(None);
    }

    let csv_path = report_path(output_dir, &report.strategy.name, at);
    if let Some(dir) = csv_path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create report dir: {}", dir.display()))?;
    }

    let csv = export_results_csv(&report.results, &report.strategy.horizons)?;
    std::fs::write(&csv_path, format!("{UTF8_BOM}{csv}"))
        .with_context(|| format!("failed to write {}", csv_path.display()))?;

    let manifest = RunManifest {
        schema_version: SCHEMA_VERSION,
        generated_at: at.to_rfc3339(),
        strategy: report.strategy.clone(),
        fingerprint: report.strategy.fingerprint(),
        tally: report.tally.clone(),
        reported: report.results.len(),
        elapsed_ms: u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
        report_file: csv_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    let manifest_path = csv_path.with_extension("json");
    let json = serde_json::to_string_pretty(&manifest).context("failed to serialize manifest")?;
    std::fs::write(&manifest_path, json)
        .with_context(|| format!("failed to write {}", manifest_path.display()))?;

    Ok(Some(csv_path))
}

/// Load a manifest written by [`save_report`].
pub fn load_manifest(path: &Path) -> Result<RunManifest> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("failed to parse {}", path.display()))
}

// ─── Console summary ────────────────────────────────────────────────

/// Plain-text table of the first `limit` results plus outcome counts.
pub fn format_summary(report: &ScanReport, limit: usize) -> String {
    let horizon = report.strategy.classification.horizon;
    let mut out = String::with_capacity(1024);

    out.push_str(&format!(
        "{}: {} of {} securities qualified in {:.1}s\n",
        report.strategy.name,
        report.tally.results,
        report.tally.total(),
        report.elapsed.as_secs_f64()
    ));
    for (kind, n) in &report.tally.excluded {
        out.push_str(&format!("  {kind}: {n}\n"));
    }
    if report.results.is_empty() {
        return out;
    }

    out.push_str(&format!(
        "\n{:<8} {:<12} {:>8} {:>6} {:>6} {:>5} {:>9} {:<9} {}\n",
        "code",
        "name",
        "close",
        "volr",
        "rsi6",
        "hits",
        format!("win{horizon}d"),
        "strength",
        "advice"
    ));
    for r in report.results.iter().take(limit) {
        out.push_str(&format!(
            "{:<8} {:<12} {:>8.2} {:>6} {:>6} {:>5} {:>9} {:<9} {}\n",
            r.code,
            r.name,
            r.close,
            opt(r.snapshot.vol_ratio, 2),
            opt(r.snapshot.rsi6, 1),
            r.hit_count,
            pct(r.win_rate(horizon), 1),
            r.strength,
            r.advice
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use revscan_core::analyzer::{Advice, IndicatorSnapshot, Strength};
    use revscan_core::ledger::HorizonStats;
    use revscan_core::signal::StrategyPreset;
    use std::time::Duration;

    fn sample_result() -> ScanResult {
        ScanResult {
            code: "600001".into(),
            name: "Alpha".into(),
            strategy: "volume_reversal".into(),
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            close: 12.346,
            snapshot: IndicatorSnapshot {
                vol_ratio: Some(0.456),
                rsi6: Some(27.04),
                kdj_k: None,
                ma5: Some(12.0),
                ma60: Some(14.0),
                headroom_pct: Some(13.4),
                pct_change: 4.1,
                avg_turnover_30: Some(1.2),
            },
            hit_count: 4,
            horizons: vec![
                HorizonStats {
                    horizon: 7,
                    samples: 4,
                    wins: 3,
                    win_rate: Some(0.75),
                    avg_return: Some(0.0312),
                },
                HorizonStats {
                    horizon: 60,
                    samples: 0,
                    wins: 0,
                    win_rate: None,
                    avg_return: None,
                },
            ],
            strength: Strength::Moderate,
            advice: Advice::Aggressive,
        }
    }

    fn at() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 3, 15, 5, 9)
            .unwrap()
    }

    #[test]
    fn csv_columns_and_no_data_marker() {
        let csv = export_results_csv(&[sample_result()], &[7, 60]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "code,name,date,close,vol_ratio,rsi6,kdj_k,headroom_pct,pct_change,hits,\
             win_rate_7d,avg_return_7d,win_rate_60d,avg_return_60d,strength,advice"
        );
        assert_eq!(
            lines.next().unwrap(),
            "600001,Alpha,2024-06-03,12.35,0.46,27.0,n/a,13.4,4.10,4,75.0%,3.12%,n/a,n/a,\
             moderate,aggressive"
        );
    }

    #[test]
    fn report_path_partitions_by_month() {
        let path = report_path(Path::new("results"), "volume_reversal", &at());
        assert_eq!(
            path,
            PathBuf::from("results/2024/06/volume_reversal_20240603_150509.csv")
        );
    }

    fn report(results: Vec<ScanResult>) -> ScanReport {
        let tally = OutcomeTally {
            results: results.len(),
            ..OutcomeTally::default()
        };
        ScanReport {
            strategy: StrategyPreset::VolumeReversal.to_config(),
            results,
            tally,
            elapsed: Duration::from_millis(1500),
        }
    }

    #[test]
    fn empty_report_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let saved = save_report(&report(vec![]), dir.path(), &at()).unwrap();
        assert!(saved.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn save_writes_csv_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let report = report(vec![sample_result()]);
        let csv_path = save_report(&report, dir.path(), &at()).unwrap().unwrap();

        let csv = std::fs::read_to_string(&csv_path).unwrap();
        assert!(csv.starts_with(UTF8_BOM));
        assert_eq!(csv.lines().count(), 2);

        let manifest = load_manifest(&csv_path.with_extension("json")).unwrap();
        assert_eq!(manifest.schema_version, SCHEMA_VERSION);
        assert_eq!(manifest.fingerprint, report.strategy.fingerprint());
        assert_eq!(manifest.reported, 1);
        assert_eq!(manifest.elapsed_ms, 1500);
        assert_eq!(manifest.report_file, "volume_reversal_20240603_150509.csv");
        assert_eq!(manifest.generated_at, "2024-06-03T15:05:09+08:00");
    }

    #[test]
    fn summary_lists_results() {
        let summary = format_summary(&report(vec![sample_result()]), 10);
        assert!(summary.starts_with("volume_reversal: 1 of 1 securities qualified"));
        assert!(summary.contains("600001"));
        assert!(summary.contains("aggressive"));
    }
}
