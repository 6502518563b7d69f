use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::CoreError;

/// The requested historical window. Controls both the fetch range and the
/// sampling granularity (shorter periods are sampled more finely).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
}

/// A provider request window: how far back (`range`) and at which bar size
/// (`interval`), using the common chart-API codes ("5d", "15m", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleWindow {
    pub range: &'static str,
    pub interval: &'static str,
}

impl Period {
    pub const ALL: [Period; 8] = [
        Period::OneDay,
        Period::FiveDays,
        Period::OneMonth,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::OneYear,
        Period::TwoYears,
        Period::FiveYears,
    ];

    /// Short code, as used by chart APIs and persisted settings.
    pub fn code(&self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::FiveDays => "5d",
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
        }
    }

    /// Primary fetch window for this period.
    pub fn window(&self) -> SampleWindow {
        let interval = match self {
            Period::OneDay => "5m",
            Period::FiveDays => "15m",
            _ => "1d",
        };
        SampleWindow {
            range: self.code(),
            interval,
        }
    }

    /// Wider window used when the primary one comes back empty (market closed
    /// for the requested session). Only the shortest period has one.
    pub fn fallback_window(&self) -> Option<SampleWindow> {
        match self {
            Period::OneDay => Some(SampleWindow {
                range: "5d",
                interval: "5m",
            }),
            _ => None,
        }
    }

    pub fn is_intraday(&self) -> bool {
        matches!(self, Period::OneDay | Period::FiveDays)
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Period {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .iter()
            .copied()
            .find(|p| p.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::ValidationError(format!("Unknown period: {s}")))
    }
}

/// A single close price at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotePoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

/// Time-ascending sequence of quote points.
pub type Series = Vec<QuotePoint>;

/// Static reference fields reported by a provider. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceData {
    pub previous_close: Option<f64>,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub week52_high: Option<f64>,
    pub week52_low: Option<f64>,
}

impl ReferenceData {
    /// True when every field is present.
    pub fn is_complete(&self) -> bool {
        self.previous_close.is_some()
            && self.market_cap.is_some()
            && self.pe_ratio.is_some()
            && self.week52_high.is_some()
            && self.week52_low.is_some()
    }

    /// Fill fields missing here from `other`; present fields win.
    pub fn merge(self, other: ReferenceData) -> ReferenceData {
        ReferenceData {
            previous_close: self.previous_close.or(other.previous_close),
            market_cap: self.market_cap.or(other.market_cap),
            pe_ratio: self.pe_ratio.or(other.pe_ratio),
            week52_high: self.week52_high.or(other.week52_high),
            week52_low: self.week52_low.or(other.week52_low),
        }
    }
}

/// Derived, point-in-time metrics bundle for one instrument.
///
/// An empty `series` with `current_price == 0` is a valid "no data" state
/// (e.g. market closed), NOT a fetch failure. Failures are `None` entries in
/// a [`SnapshotMap`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub current_price: f64,
    pub previous_close: f64,
    pub market_cap: f64,
    pub pe_ratio: Option<f64>,
    pub week52_high: f64,
    pub week52_low: f64,
    pub series: Series,
}

impl Snapshot {
    /// Build a snapshot from a fetched series and its reference fields.
    ///
    /// - `current_price`: last close, else 0.
    /// - `previous_close`: reference field, else second-to-last close, else 0.
    pub fn from_parts(series: Series, reference: ReferenceData) -> Self {
        let current_price = series.last().map(|p| p.close).unwrap_or(0.0);
        let previous_close = reference
            .previous_close
            .or_else(|| {
                series
                    .len()
                    .checked_sub(2)
                    .map(|idx| series[idx].close)
            })
            .unwrap_or(0.0);

        Self {
            current_price,
            previous_close,
            market_cap: reference.market_cap.unwrap_or(0.0),
            pe_ratio: reference.pe_ratio,
            week52_high: reference.week52_high.unwrap_or(0.0),
            week52_low: reference.week52_low.unwrap_or(0.0),
            series,
        }
    }

    /// True when the fetch succeeded but yielded no data points.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Change versus the previous session's close, in percent.
    pub fn change_pct(&self) -> f64 {
        crate::services::metrics::percent_change(self.current_price, self.previous_close)
    }
}

/// Per-symbol fetch results for one batch. `None` marks a per-symbol failure.
pub type SnapshotMap = BTreeMap<String, Option<Snapshot>>;
