//! End-to-end scans over small on-disk universes.

use std::fmt::Write as _;
use std::path::Path;

use chrono::{FixedOffset, NaiveDate, TimeZone};
use revscan_core::analyzer::ExclusionKind;
use revscan_core::domain::Bar;
use revscan_core::signal::StrategyPreset;
use revscan_runner::{save_report, CsvDirectory, NameTable, ScanOrchestrator, UNKNOWN_NAME};

/// Flat tape at 10.0 ending in burst → two-bar trough → breakout.
fn reversal_tape(n: usize) -> Vec<Bar> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let mut bars: Vec<Bar> = (0..n)
        .map(|i| Bar {
            date: start + chrono::Duration::days(i as i64),
            open: 10.0,
            high: 10.1,
            low: 9.9,
            close: 10.0,
            volume: 1000.0,
            turnover_rate: Some(1.0),
            pct_change: 0.0,
        })
        .collect();
    let t = n - 1;
    bars[t - 4].volume = 5000.0;
    bars[t - 2].volume = 300.0;
    bars[t - 1].volume = 300.0;
    bars[t].close = 10.5;
    bars[t].high = 10.6;
    bars[t].pct_change = 5.0;
    bars
}

fn flat_tape(n: usize) -> Vec<Bar> {
    let mut bars = reversal_tape(n);
    let t = n - 1;
    bars[t].close = 10.0;
    bars[t].high = 10.1;
    bars[t].pct_change = 0.0;
    bars
}

fn write_english(path: &Path, bars: &[Bar]) {
    let mut out = String::from("date,open,high,low,close,volume,pct_change,turnover_rate\n");
    for b in bars {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{}",
            b.date.format("%Y-%m-%d"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume,
            b.pct_change,
            b.turnover_rate.unwrap_or_default()
        )
        .unwrap();
    }
    std::fs::write(path, out).unwrap();
}

fn write_chinese(path: &Path, bars: &[Bar]) {
    let mut out = String::from("日期,开盘,收盘,最高,最低,成交量,涨跌幅,换手率\n");
    for b in bars {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{}",
            b.date.format("%Y%m%d"),
            b.open,
            b.close,
            b.high,
            b.low,
            b.volume,
            b.pct_change,
            b.turnover_rate.unwrap_or_default()
        )
        .unwrap();
    }
    std::fs::write(path, out).unwrap();
}

fn names() -> NameTable {
    let mut names = NameTable::new();
    names.insert("600001", "Alpha Bank");
    names.insert("600002", "Beta Foods");
    names.insert("600003", "ST Gamma");
    names
}

#[test]
fn three_securities_one_result() {
    let dir = tempfile::tempdir().unwrap();
    write_chinese(&dir.path().join("600001.csv"), &reversal_tape(120));
    write_english(&dir.path().join("600002.csv"), &flat_tape(120));
    write_english(&dir.path().join("600003.csv"), &reversal_tape(120));

    let orchestrator =
        ScanOrchestrator::new(StrategyPreset::VolumeReversal.to_config(), 2).unwrap();
    let report = orchestrator
        .run(&CsvDirectory::new(dir.path()), &names())
        .unwrap();

    assert_eq!(report.results.len(), 1);
    let hit = &report.results[0];
    assert_eq!(hit.code, "600001");
    assert_eq!(hit.name, "Alpha Bank");
    assert_eq!(hit.close, 10.5);

    assert_eq!(report.tally.results, 1);
    assert_eq!(report.tally.count(ExclusionKind::NoSignal), 1);
    assert_eq!(report.tally.count(ExclusionKind::Identity), 1);
    assert_eq!(report.tally.total(), 3);
}

#[test]
fn unknown_names_and_bad_files() {
    let dir = tempfile::tempdir().unwrap();
    write_english(&dir.path().join("600010.csv"), &reversal_tape(120));
    write_english(&dir.path().join("600011.csv"), &reversal_tape(50));
    std::fs::write(dir.path().join("600012.csv"), "date,open\n2024-01-02,abc\n").unwrap();
    std::fs::write(dir.path().join("README.txt"), "not bars").unwrap();

    let orchestrator =
        ScanOrchestrator::new(StrategyPreset::VolumeReversal.to_config(), 1).unwrap();
    let report = orchestrator
        .run(&CsvDirectory::new(dir.path()), &NameTable::new())
        .unwrap();

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].name, UNKNOWN_NAME);
    assert_eq!(report.tally.count(ExclusionKind::InsufficientHistory), 1);
    assert_eq!(report.tally.count(ExclusionKind::Data), 1);
    assert_eq!(report.tally.total(), 3);
}

#[test]
fn unsorted_file_is_a_data_exclusion() {
    let dir = tempfile::tempdir().unwrap();
    let mut bars = reversal_tape(120);
    bars.swap(10, 11);
    write_english(&dir.path().join("600020.csv"), &bars);

    let orchestrator =
        ScanOrchestrator::new(StrategyPreset::VolumeReversal.to_config(), 1).unwrap();
    let report = orchestrator
        .run(&CsvDirectory::new(dir.path()), &NameTable::new())
        .unwrap();
    assert_eq!(report.tally.count(ExclusionKind::Data), 1);
}

#[test]
fn scan_then_save_report() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_english(&data.path().join("600001.csv"), &reversal_tape(120));

    let orchestrator =
        ScanOrchestrator::new(StrategyPreset::VolumeReversal.to_config(), 1).unwrap();
    let report = orchestrator
        .run(&CsvDirectory::new(data.path()), &names())
        .unwrap();

    let at = FixedOffset::east_opt(8 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 11, 8, 9, 30, 0)
        .unwrap();
    let path = save_report(&report, out.path(), &at).unwrap().unwrap();
    assert!(path.starts_with(out.path().join("2024").join("11")));
    assert!(path.with_extension("json").exists());

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("600001,Alpha Bank"));
    assert!(text.contains("win_rate_20d"));
}
