//! Synthetic universes for smoke runs.
//!
//! Bars are a seeded random walk; the seed is the BLAKE3 hash of the code, so a
//! given code always produces the same tape. A fraction of securities get a
//! planted burst → trough → breakout tail so that scans find something.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use revscan_core::domain::{Bar, Code};

use crate::data_loader::InMemorySource;

/// Options for a generated universe.
#[derive(Debug, Clone)]
pub struct SyntheticSpec {
    pub count: usize,
    pub bars: usize,
    pub start: NaiveDate,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            count: 50,
            bars: 250,
            start: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap_or_default(),
        }
    }
}

/// Code for the i-th synthetic security ("600000", "600001", …).
pub fn synthetic_code(i: usize) -> Code {
    format!("{:06}", 600_000 + i)
}

fn rng_for(code: &str) -> StdRng {
    let seed: [u8; 32] = *blake3::hash(code.as_bytes()).as_bytes();
    StdRng::from_seed(seed)
}

/// Generate `n` weekday bars for `code`.
pub fn generate_bars(code: &str, n: usize, start: NaiveDate) -> Vec<Bar> {
    let mut rng = rng_for(code);
    let mut bars = Vec::with_capacity(n);
    let mut price: f64 = rng.gen_range(6.0..18.0);
    let mut date = start;

    while bars.len() < n {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            date += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = (price * (1.0 + daily_return)).max(1.0);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000.0..2_000_000.0);

        bars.push(Bar {
            date,
            open,
            high,
            low,
            close,
            volume,
            turnover_rate: Some(rng.gen_range(0.5..4.0)),
            pct_change: (close / open - 1.0) * 100.0,
        });

        price = close;
        date += chrono::Duration::days(1);
    }

    if rng.gen_bool(0.25) {
        plant_reversal(&mut bars);
    }
    bars
}

/// Burst four bars back, a two-bar volume trough, then a bullish breakout today.
fn plant_reversal(bars: &mut [Bar]) {
    let n = bars.len();
    if n < 25 {
        return;
    }
    let avg = bars[n - 25..n - 5].iter().map(|b| b.volume).sum::<f64>() / 20.0;
    bars[n - 5].volume = avg * 3.0;
    bars[n - 3].volume = avg * 0.3;
    bars[n - 2].volume = avg * 0.3;

    let prev = bars[n - 2].clone();
    let today = &mut bars[n - 1];
    today.open = prev.close;
    today.close = prev.high * 1.02;
    today.high = today.close * 1.005;
    today.low = today.open.min(today.close) * 0.995;
    today.pct_change = (today.close / prev.close - 1.0) * 100.0;
}

/// Build an in-memory universe.
pub fn generate_universe(spec: &SyntheticSpec) -> InMemorySource {
    (0..spec.count)
        .map(|i| {
            let code = synthetic_code(i);
            let bars = generate_bars(&code, spec.bars, spec.start);
            (code, bars)
        })
        .collect()
}

/// Write bar CSVs plus a `names.csv` under `dir`. Returns the number of files written.
pub fn write_synthetic_universe(dir: &Path, spec: &SyntheticSpec) -> Result<usize> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let mut names = csv::Writer::from_path(dir.join("names.csv"))
        .context("failed to create names.csv")?;
    names.write_record(["code", "name"])?;

    for i in 0..spec.count {
        let code = synthetic_code(i);
        let bars = generate_bars(&code, spec.bars, spec.start);
        let path = dir.join(format!("{code}.csv"));
        let mut wtr = csv::Writer::from_path(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        wtr.write_record([
            "date",
            "open",
            "high",
            "low",
            "close",
            "volume",
            "pct_change",
            "turnover_rate",
        ])?;
        for bar in &bars {
            wtr.write_record([
                bar.date.format("%Y-%m-%d").to_string(),
                format!("{:.3}", bar.open),
                format!("{:.3}", bar.high),
                format!("{:.3}", bar.low),
                format!("{:.3}", bar.close),
                format!("{:.0}", bar.volume),
                format!("{:.4}", bar.pct_change),
                bar.turnover_rate.map_or(String::new(), |t| format!("{t:.4}")),
            ])?;
        }
        wtr.flush()
            .with_context(|| format!("failed to flush {}", path.display()))?;
        let name = format!("Synthetic {i}");
        names.write_record([code.as_str(), name.as_str()])?;
    }

    names.flush().context("failed to flush names.csv")?;
    Ok(spec.count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use revscan_core::domain::validate_series;

    #[test]
    fn same_code_same_tape() {
        let start = SyntheticSpec::default().start;
        let a = generate_bars("600001", 80, start);
        assert_eq!(a, generate_bars("600001", 80, start));
        assert_ne!(a, generate_bars("600002", 80, start));
    }

    #[test]
    fn tapes_are_valid_weekday_series() {
        let start = SyntheticSpec::default().start;
        let bars = generate_bars("600003", 120, start);
        assert_eq!(bars.len(), 120);
        assert_eq!(validate_series(&bars), Ok(()));
        assert!(bars
            .iter()
            .all(|b| !matches!(b.date.weekday(), Weekday::Sat | Weekday::Sun)));
        assert!(bars.iter().all(|b| b.high >= b.low && b.close >= 1.0));
    }

    #[test]
    fn universe_codes_are_six_digits() {
        let universe = generate_universe(&SyntheticSpec {
            count: 3,
            bars: 30,
            ..SyntheticSpec::default()
        });
        assert_eq!(universe.len(), 3);
        assert_eq!(synthetic_code(7), "600007");
    }
}
