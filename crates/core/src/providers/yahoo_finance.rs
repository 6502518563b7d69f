use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use yahoo_finance_api::{YMetaData, YQuoteSummary, YResponse, YahooConnector, YahooError};

use crate::errors::CoreError;
use crate::models::quote::{QuotePoint, ReferenceData, SampleWindow, Series};
use super::traits::QuoteProvider;

const PROVIDER: &str = "Yahoo Finance";

/// Yahoo Finance provider for equity prices and fundamentals.
///
/// - **Free**: No API key required.
/// - **No strict rate limits** (unofficial public API).
/// - **Coverage**: Global equities, ETFs, indices, mutual funds.
/// - **Data**: Intraday bars down to 1 minute, full daily history.
///
/// Series come from the chart endpoint. Reference data comes from the
/// `quoteSummary` endpoint (previous close, market cap, trailing P/E and the
/// 52-week range); when that call fails the chart metadata is used instead,
/// which carries everything except market cap and P/E.
pub struct YahooFinanceProvider {
    chart: YahooConnector,
    // quoteSummary needs a crumb that the connector fetches and caches on first use
    summary: Mutex<YahooConnector>,
}

impl YahooFinanceProvider {
    pub fn new() -> Result<Self, CoreError> {
        Ok(Self {
            chart: Self::connector()?,
            summary: Mutex::new(Self::connector()?),
        })
    }

    fn connector() -> Result<YahooConnector, CoreError> {
        YahooConnector::new().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to create connector: {e}"),
        })
    }

    async fn chart(
        &self,
        symbol: &str,
        interval: &str,
        range: &str,
    ) -> Result<YResponse, CoreError> {
        self.chart
            .get_quote_range(symbol, interval, range)
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to fetch {range}/{interval} history for {symbol}: {e}"),
            })
    }

    /// Extract the close series from a chart response.
    ///
    /// A chart without timestamps (market closed, no trades in the window)
    /// is an empty series, not an error.
    pub fn series_from_response(symbol: &str, response: &YResponse) -> Result<Series, CoreError> {
        let quotes = match response.quotes() {
            Ok(quotes) => quotes,
            Err(YahooError::NoQuotes) => return Ok(Vec::new()),
            Err(e) => {
                return Err(CoreError::Api {
                    provider: PROVIDER.into(),
                    message: format!("Failed to parse quotes for {symbol}: {e}"),
                })
            }
        };

        let mut points: Series = quotes
            .iter()
            .filter(|q| q.close.is_finite() && q.close > 0.0)
            .filter_map(|q| {
                Some(QuotePoint {
                    timestamp: Self::timestamp_to_datetime(q.timestamp)?,
                    close: q.close,
                })
            })
            .collect();
        points.sort_by_key(|p| p.timestamp);

        Ok(points)
    }

    /// Map the `summaryDetail` module of a quote summary.
    pub fn reference_from_summary(summary: &YQuoteSummary) -> ReferenceData {
        let detail = summary
            .quote_summary
            .as_ref()
            .and_then(|s| s.result.as_ref())
            .and_then(|results| results.first())
            .and_then(|data| data.summary_detail.as_ref());
        let Some(detail) = detail else {
            return ReferenceData::default();
        };

        ReferenceData {
            previous_close: positive(
                detail.previous_close.or(detail.regular_market_previous_close),
            ),
            market_cap: positive(detail.market_cap.map(|cap| cap as f64)),
            // Yahoo reports "Infinity" for a P/E without earnings
            pe_ratio: detail.trailing_pe.filter(|pe| pe.is_finite()),
            week52_high: positive(detail.fifty_two_week_high),
            week52_low: positive(detail.fifty_two_week_low),
        }
    }

    /// Reference fields carried by chart metadata. No market cap or P/E.
    pub fn reference_from_metadata(meta: &YMetaData) -> ReferenceData {
        ReferenceData {
            previous_close: positive(meta.previous_close.or(meta.chart_previous_close)),
            market_cap: None,
            pe_ratio: None,
            week52_high: positive(meta.fifty_two_week_high),
            week52_low: positive(meta.fifty_two_week_low),
        }
    }

    async fn summary_reference(&self, symbol: &str) -> Result<ReferenceData, CoreError> {
        let summary = self
            .summary
            .lock()
            .await
            .get_ticker_info(symbol)
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to fetch quote summary for {symbol}: {e}"),
            })?;
        Ok(Self::reference_from_summary(&summary))
    }

    async fn metadata_reference(&self, symbol: &str) -> Result<ReferenceData, CoreError> {
        // range=1d so that previousClose is the prior session's close
        let response = self.chart(symbol, "1d", "1d").await?;
        let meta = response.metadata().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to read chart metadata for {symbol}: {e}"),
        })?;
        Ok(Self::reference_from_metadata(&meta))
    }

    /// Convert a unix timestamp (seconds) to a UTC datetime.
    fn timestamp_to_datetime(ts: i64) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(ts, 0)
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

#[async_trait]
impl QuoteProvider for YahooFinanceProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn fetch_series(
        &self,
        symbol: &str,
        window: &SampleWindow,
    ) -> Result<Series, CoreError> {
        let response = self.chart(symbol, window.interval, window.range).await?;
        Self::series_from_response(symbol, &response)
    }

    async fn fetch_reference(&self, symbol: &str) -> Result<ReferenceData, CoreError> {
        match self.summary_reference(symbol).await {
            Ok(reference) => Ok(reference),
            Err(e) => {
                log::warn!("{e}; falling back to chart metadata");
                self.metadata_reference(symbol).await
            }
        }
    }
}
