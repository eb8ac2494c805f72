//! Result ordering.
//!
//! Undefined metrics always sort after defined ones, whatever the direction.
//! Ties fall back to the security code so the order is total and reproducible.

use std::cmp::Ordering;

use revscan_core::analyzer::ScanResult;
use revscan_core::strategy::RankKey;

fn asc_none_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn desc_none_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        _ => asc_none_last(a, b),
    }
}

pub fn compare(a: &ScanResult, b: &ScanResult, key: RankKey) -> Ordering {
    let primary = match key {
        RankKey::VolumeRatioThenRsi => {
            asc_none_last(a.snapshot.vol_ratio, b.snapshot.vol_ratio)
                .then_with(|| asc_none_last(a.snapshot.rsi6, b.snapshot.rsi6))
        }
        RankKey::WinRate { horizon } => {
            let avg = |r: &ScanResult| r.stats_for(horizon).and_then(|s| s.avg_return);
            desc_none_last(a.win_rate(horizon), b.win_rate(horizon))
                .then_with(|| desc_none_last(avg(a), avg(b)))
                .then_with(|| b.hit_count.cmp(&a.hit_count))
        }
    };
    primary.then_with(|| a.code.cmp(&b.code))
}

/// Sort in place, best first.
pub fn rank(results: &mut [ScanResult], key: RankKey) {
    results.sort_by(|a, b| compare(a, b, key));
}
