use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::quote::{ReferenceData, SampleWindow, Series};

/// Trait abstraction for all market data providers.
///
/// Each external source (Yahoo Finance, Alpha Vantage) implements this
/// trait. Any provider satisfying it is substitutable; the rest of the
/// engine never talks to an API directly.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Fetch the close-price series for `symbol` over `window`.
    /// Returns points sorted by timestamp, oldest first. An empty series is
    /// a valid answer (no trading in the window), not an error.
    async fn fetch_series(
        &self,
        symbol: &str,
        window: &SampleWindow,
    ) -> Result<Series, CoreError>;

    /// Fetch static reference fields (previous close, market cap, ...).
    async fn fetch_reference(&self, symbol: &str) -> Result<ReferenceData, CoreError>;
}
