use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::quote::{QuotePoint, ReferenceData, SampleWindow, Series};
use super::traits::QuoteProvider;

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER: &str = "Alpha Vantage";

/// Alpha Vantage API provider for equity prices and fundamentals.
///
/// - **Free tier**: 25 requests/day (across ALL endpoints).
/// - **Requires**: API key (set via settings as "alphavantage").
/// - **Coverage**: 100k+ global equity symbols.
/// - **Strategy**: daily bars only; intraday windows are refused so the
///   fetcher moves on. Main value is the `OVERVIEW` fundamentals
///   (market cap, P/E, 52-week range) the chart API lacks.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
}

impl AlphaVantageProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key,
        }
    }

    /// Number of calendar days covered by a range code ("1mo", "5y", ...).
    pub fn range_days(range: &str) -> Option<i64> {
        let split = range.find(|c: char| !c.is_ascii_digit())?;
        let (n, unit) = range.split_at(split);
        let n: i64 = n.parse().ok()?;
        match unit {
            "d" => Some(n),
            "wk" => Some(n * 7),
            "mo" => Some(n * 31),
            "y" => Some(n * 366),
            _ => None,
        }
    }

    async fn query<T: for<'de> Deserialize<'de>>(
        &self,
        function: &str,
        symbol: &str,
        extra: &[(&str, &str)],
    ) -> Result<T, CoreError> {
        let symbol = symbol.to_uppercase();
        let mut params = vec![
            ("function", function),
            ("symbol", symbol.as_str()),
            ("apikey", self.api_key.as_str()),
        ];
        params.extend_from_slice(extra);

        self.client
            .get(BASE_URL)
            .query(&params)
            .send()
            .await?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to parse {function} response for {symbol}: {e}"),
            })
    }
}

// ── Alpha Vantage API response types ────────────────────────────────

#[derive(Deserialize)]
struct OverviewResponse {
    #[serde(rename = "MarketCapitalization")]
    market_cap: Option<String>,
    #[serde(rename = "PERatio")]
    pe_ratio: Option<String>,
    #[serde(rename = "52WeekHigh")]
    week52_high: Option<String>,
    #[serde(rename = "52WeekLow")]
    week52_low: Option<String>,
}

#[derive(Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
}

#[derive(Deserialize)]
struct GlobalQuote {
    #[serde(rename = "08. previous close")]
    previous_close: Option<String>,
}

#[derive(Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, DailyData>>,
}

#[derive(Deserialize)]
struct DailyData {
    #[serde(rename = "4. close")]
    close: String,
}

/// Alpha Vantage reports missing numbers as "None", "-" or "0".
fn parse_field(value: Option<String>) -> Option<f64> {
    value
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v != 0.0)
}

#[async_trait]
impl QuoteProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn fetch_series(&self, symbol: &str, window: &SampleWindow) -> Result<Series, CoreError> {
        if window.interval != "1d" {
            return Err(CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Interval {} not supported on the free tier", window.interval),
            });
        }
        let days = Self::range_days(window.range).ok_or_else(|| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Unsupported range: {}", window.range),
        })?;
        let output_size = if days > 100 { "full" } else { "compact" };

        let resp: TimeSeriesResponse = self
            .query("TIME_SERIES_DAILY", symbol, &[("outputsize", output_size)])
            .await?;
        let time_series = resp.time_series.ok_or_else(|| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("No time series data for {symbol}. API limit may be exceeded."),
        })?;

        let from = Utc::now().date_naive() - chrono::Duration::days(days);
        let mut points: Series = time_series
            .iter()
            .filter_map(|(date_str, data)| {
                let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()?;
                if date < from {
                    return None;
                }
                let close: f64 = data.close.parse().ok()?;
                Some(QuotePoint {
                    timestamp: date.and_hms_opt(0, 0, 0)?.and_utc(),
                    close,
                })
            })
            .collect();
        points.sort_by_key(|p| p.timestamp);

        Ok(points)
    }

    async fn fetch_reference(&self, symbol: &str) -> Result<ReferenceData, CoreError> {
        let overview: OverviewResponse = self.query("OVERVIEW", symbol, &[]).await?;
        let quote: GlobalQuoteResponse = self.query("GLOBAL_QUOTE", symbol, &[]).await?;

        Ok(ReferenceData {
            previous_close: parse_field(quote.global_quote.and_then(|q| q.previous_close)),
            market_cap: parse_field(overview.market_cap),
            pe_ratio: parse_field(overview.pe_ratio),
            week52_high: parse_field(overview.week52_high),
            week52_low: parse_field(overview.week52_low),
        })
    }
}
