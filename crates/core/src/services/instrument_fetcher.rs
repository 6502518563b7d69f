use futures::future::join_all;
use std::future::Future;
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::quote::{Period, ReferenceData, SampleWindow, Series, Snapshot, SnapshotMap};
use crate::models::settings::EngineSettings;
use crate::providers::registry::ProviderRegistry;

/// Fetches one instrument's series and reference fields, isolating failures.
///
/// - Every provider call is bounded by `timeout` and retried `retries` times.
/// - Providers are tried in registry order; the first success wins for the
///   series, while reference fields are merged across providers until complete.
/// - Any error for a symbol turns into `None` for that symbol only.
pub struct InstrumentFetcher {
    registry: ProviderRegistry,
    timeout: Duration,
    retries: u32,
}

impl InstrumentFetcher {
    pub fn new(registry: ProviderRegistry, timeout: Duration, retries: u32) -> Self {
        Self {
            registry,
            timeout,
            retries,
        }
    }

    pub fn from_settings(registry: ProviderRegistry, settings: &EngineSettings) -> Self {
        Self::new(registry, settings.fetch_timeout(), settings.fetch_retries)
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Fetch a snapshot for `symbol`, or `None` if it could not be retrieved.
    pub async fn fetch(&self, symbol: &str, period: Period) -> Option<Snapshot> {
        match self.try_fetch(symbol, period).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                log::warn!("{symbol} unavailable for {period}: {e}");
                None
            }
        }
    }

    /// Like [`fetch`](Self::fetch) but surfaces the error.
    pub async fn try_fetch(&self, symbol: &str, period: Period) -> Result<Snapshot, CoreError> {
        if self.registry.is_empty() {
            return Err(CoreError::NoProvider);
        }
        let series = self.fetch_series(symbol, period).await?;
        let reference = self.fetch_reference(symbol).await?;
        Ok(Snapshot::from_parts(series, reference))
    }

    /// Fetch every symbol concurrently. One entry per input symbol.
    pub async fn fetch_all(&self, symbols: &[String], period: Period) -> SnapshotMap {
        let fetches = symbols.iter().map(|symbol| async move {
            (symbol.clone(), self.fetch(symbol, period).await)
        });
        join_all(fetches).await.into_iter().collect()
    }

    /// Series for the period's primary window. When that is empty and the
    /// period has a wider fallback, use it and keep only the last session.
    async fn fetch_series(&self, symbol: &str, period: Period) -> Result<Series, CoreError> {
        let series = self.series_from_providers(symbol, &period.window()).await?;
        if !series.is_empty() {
            return Ok(series);
        }

        match period.fallback_window() {
            Some(wider) => {
                log::debug!("{symbol}: no {period} data, widening to {}", wider.range);
                let wide = self.series_from_providers(symbol, &wider).await?;
                Ok(last_session(wide))
            }
            None => Ok(series),
        }
    }

    async fn series_from_providers(
        &self,
        symbol: &str,
        window: &SampleWindow,
    ) -> Result<Series, CoreError> {
        let mut last_error = None;
        for provider in self.registry.providers() {
            let result = self
                .with_retry(symbol, provider.name(), || provider.fetch_series(symbol, window))
                .await;
            match result {
                Ok(series) => return Ok(series),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or(CoreError::NoProvider))
    }

    async fn fetch_reference(&self, symbol: &str) -> Result<ReferenceData, CoreError> {
        let mut merged: Option<ReferenceData> = None;
        let mut last_error = None;

        for provider in self.registry.providers() {
            if merged.as_ref().is_some_and(ReferenceData::is_complete) {
                break;
            }
            let result = self
                .with_retry(symbol, provider.name(), || provider.fetch_reference(symbol))
                .await;
            match result {
                Ok(reference) => {
                    merged = Some(match merged {
                        Some(existing) => existing.merge(reference),
                        None => reference,
                    });
                }
                Err(e) => last_error = Some(e),
            }
        }

        merged.ok_or_else(|| last_error.unwrap_or(CoreError::NoProvider))
    }

    /// Run `op` with a timeout, retrying up to `self.retries` extra times.
    async fn with_retry<T, F, Fut>(
        &self,
        symbol: &str,
        provider: &str,
        op: F,
    ) -> Result<T, CoreError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut attempt = 0;
        loop {
            let error = match tokio::time::timeout(self.timeout, op()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => e,
                Err(_) => CoreError::Timeout {
                    symbol: symbol.to_string(),
                    secs: self.timeout.as_secs(),
                },
            };
            if attempt >= self.retries {
                return Err(error);
            }
            attempt += 1;
            log::warn!("{provider} failed for {symbol} (attempt {attempt}), retrying: {error}");
        }
    }
}

impl std::fmt::Debug for InstrumentFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentFetcher")
            .field("registry", &self.registry)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .finish()
    }
}

/// Keep only the points that share the last point's (UTC) calendar date.
pub fn last_session(series: Series) -> Series {
    let Some(last_date) = series.last().map(|p| p.timestamp.date_naive()) else {
        return series;
    };
    series
        .into_iter()
        .filter(|p| p.timestamp.date_naive() == last_date)
        .collect()
}
