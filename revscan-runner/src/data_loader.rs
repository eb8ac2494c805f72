//! Bar loading for the runner.
//!
//! One CSV file per security, `<code>.csv`, with a header row. Column names are
//! accepted in English or with the Chinese headers exported by common A-share
//! data tools. Percent change is derived from closes when the column is absent.
//!
//! Loading never sorts or repairs a series; structural problems surface later as
//! `Exclusion::Data` from the analyzer's validation step.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use revscan_core::domain::{Bar, Code};
use serde::Deserialize;
use thiserror::Error;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed bar CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: unrecognised date '{value}'")]
    BadDate { row: usize, value: String },

    #[error("no bars for '{0}'")]
    NotFound(String),
}

/// One CSV row as written by the exporter tools.
#[derive(Debug, Deserialize)]
struct BarRecord {
    #[serde(alias = "日期", alias = "trade_date")]
    date: String,
    #[serde(alias = "开盘")]
    open: f64,
    #[serde(alias = "最高")]
    high: f64,
    #[serde(alias = "最低")]
    low: f64,
    #[serde(alias = "收盘")]
    close: f64,
    #[serde(alias = "成交量", alias = "vol")]
    volume: f64,
    #[serde(default, alias = "涨跌幅", alias = "pct_chg")]
    pct_change: Option<f64>,
    #[serde(default, alias = "换手率", alias = "turnover")]
    turnover_rate: Option<f64>,
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y%m%d", "%Y/%m/%d"];

/// Parse `YYYY-MM-DD`, `YYYYMMDD` or `YYYY/MM/DD`; a trailing time part is ignored.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let day = value.split_whitespace().next()?;
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(day, fmt).ok())
}

/// Read bars from any CSV source, in file order.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars: Vec<Bar> = Vec::new();

    for (row, record) in rdr.deserialize::<BarRecord>().enumerate() {
        let record = record?;
        let date = parse_date(&record.date).ok_or_else(|| LoadError::BadDate {
            row: row + 1,
            value: record.date.clone(),
        })?;
        let pct_change = record.pct_change.unwrap_or_else(|| match bars.last() {
            Some(prev) if prev.close > 0.0 => (record.close / prev.close - 1.0) * 100.0,
            _ => 0.0,
        });
        bars.push(Bar {
            date,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
            turnover_rate: record.turnover_rate,
            pct_change,
        });
    }

    Ok(bars)
}

/// Read one security's bar file.
pub fn load_bar_file(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bars = read_bars(file)?;

    let odd = bars.iter().filter(|b| !b.is_sane()).count();
    if odd > 0 {
        tracing::debug!(path = %path.display(), odd, "bars with inconsistent OHLC");
    }
    Ok(bars)
}

/// Where the orchestrator gets bars from. Shared by reference across workers.
pub trait BarSource: Sync {
    /// Every security code available, in a stable order.
    fn codes(&self) -> Result<Vec<Code>, LoadError>;

    /// Full bar history for one code.
    fn load(&self, code: &str) -> Result<Vec<Bar>, LoadError>;
}

/// A directory of `<code>.csv` files. Files whose stem is not all digits
/// (a names table, notes) are not securities and are skipped.
#[derive(Debug, Clone)]
pub struct CsvDirectory {
    dir: PathBuf,
}

impl CsvDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, code: &str) -> PathBuf {
        self.dir.join(format!("{code}.csv"))
    }
}

impl BarSource for CsvDirectory {
    fn codes(&self) -> Result<Vec<Code>, LoadError> {
        let io_err = |source| LoadError::Io {
            path: self.dir.clone(),
            source,
        };
        let mut codes = Vec::new();
        for entry in std::fs::read_dir(&self.dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            let is_csv = path.extension().is_some_and(|ext| ext == "csv");
            if !is_csv {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) if !stem.is_empty() && stem.bytes().all(|b| b.is_ascii_digit()) => {
                    codes.push(stem.to_string());
                }
                _ => tracing::debug!(path = %path.display(), "skipping non-security file"),
            }
        }
        codes.sort();
        Ok(codes)
    }

    fn load(&self, code: &str) -> Result<Vec<Bar>, LoadError> {
        let path = self.path_for(code);
        if !path.exists() {
            return Err(LoadError::NotFound(code.to_string()));
        }
        load_bar_file(&path)
    }
}

/// Bars held in memory; used by tests and the synthetic smoke run.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    bars: BTreeMap<Code, Vec<Bar>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: impl Into<Code>, bars: Vec<Bar>) {
        self.bars.insert(code.into(), bars);
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

impl FromIterator<(Code, Vec<Bar>)> for InMemorySource {
    fn from_iter<I: IntoIterator<Item = (Code, Vec<Bar>)>>(iter: I) -> Self {
        Self {
            bars: iter.into_iter().collect(),
        }
    }
}

impl BarSource for InMemorySource {
    fn codes(&self) -> Result<Vec<Code>, LoadError> {
        Ok(self.bars.keys().cloned().collect())
    }

    fn load(&self, code: &str) -> Result<Vec<Bar>, LoadError> {
        self.bars
            .get(code)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(code.to_string()))
    }
}
