//! Pure, stateless metric derivations. No I/O.

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::models::quote::{Series, SnapshotMap};

/// Percent change from `previous` to `current`. Signed; 0 when `previous` is 0.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous != 0.0 {
        (current - previous) / previous * 100.0
    } else {
        0.0
    }
}

/// Change over the whole series, first close to last close, in percent.
/// `None` for an empty series or a zero first close.
pub fn series_change(series: &Series) -> Option<f64> {
    let first = series.first()?.close;
    let last = series.last()?.close;
    if first == 0.0 {
        return None;
    }
    Some((last - first) / first * 100.0)
}

/// Rebase a series to percent performance relative to its first point.
///
/// Each close becomes `(close / first_close - 1) * 100`, so the first
/// element is always 0. Fails on an empty series or a zero first close.
pub fn normalize_series(series: &Series) -> Result<Vec<f64>, CoreError> {
    let base = series.first().ok_or(CoreError::EmptySeries)?.close;
    if base == 0.0 {
        return Err(CoreError::ValidationError(
            "Cannot normalize a series starting at 0".into(),
        ));
    }
    Ok(series
        .iter()
        .map(|p| (p.close / base - 1.0) * 100.0)
        .collect())
}

/// Format a dollar magnitude with a T/B/M suffix (`$2.85T`, `$640.10B`).
/// Values below one million are printed as a grouped integer (`$12,345`).
pub fn format_magnitude(value: f64) -> String {
    const SCALES: [(f64, &str); 3] = [(1e12, "T"), (1e9, "B"), (1e6, "M")];

    for (scale, suffix) in SCALES {
        if value >= scale {
            return format!("${:.2}{}", value / scale, suffix);
        }
    }
    format!("${}", group_thousands(value.round() as i64))
}

fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// One row of a performance comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceEntry {
    pub symbol: String,

    /// First-to-last close change over the requested period, in percent
    pub change_pct: f64,
}

/// Rank instruments by performance over their series, best first.
///
/// `symbols` fixes the input order, which breaks ties. Symbols that failed
/// to fetch, or whose series cannot produce a change, are left out.
pub fn rank_performance(symbols: &[String], snapshots: &SnapshotMap) -> Vec<PerformanceEntry> {
    let mut ranking: Vec<PerformanceEntry> = symbols
        .iter()
        .filter_map(|symbol| {
            let snapshot = snapshots.get(symbol)?.as_ref()?;
            Some(PerformanceEntry {
                symbol: symbol.clone(),
                change_pct: series_change(&snapshot.series)?,
            })
        })
        .collect();

    // sort_by is stable, so equal changes keep their input order
    ranking.sort_by(|a, b| b.change_pct.total_cmp(&a.change_pct));
    ranking
}
