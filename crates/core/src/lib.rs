pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use models::{
    alert::{AlertKind, TriggeredAlert},
    instrument::Instrument,
    portfolio::PortfolioValuation,
    quote::{Period, SnapshotMap},
    session::SessionContext,
    settings::EngineSettings,
};
use providers::registry::ProviderRegistry;
use services::{
    alert_service::AlertEngine,
    instrument_fetcher::InstrumentFetcher,
    metrics::{self, PerformanceEntry},
    portfolio_service::PortfolioLedger,
    quote_store::QuoteStore,
};
use storage::json_store::JsonStore;

use errors::CoreError;

/// Everything one refresh pass produced, ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshReport {
    pub period: Period,
    pub refreshed_at: DateTime<Utc>,

    /// Per-symbol snapshots; `None` means "unavailable" for that symbol
    pub snapshots: SnapshotMap,

    /// Triggered alerts not silenced in this session
    pub alerts: Vec<TriggeredAlert>,

    /// Portfolio valuation at the snapshot prices
    pub valuation: PortfolioValuation,

    /// Instruments ranked by performance over the period, best first
    pub ranking: Vec<PerformanceEntry>,

    /// Symbols whose fetch failed
    pub unavailable: Vec<String>,
}

/// Main entry point for the market monitoring engine.
/// Holds the instrument set, the quote cache, the alert rules and the ledger.
#[must_use]
pub struct MarketMonitor {
    instruments: Vec<Instrument>,
    settings: EngineSettings,
    fetcher: InstrumentFetcher,
    quote_store: QuoteStore,
    alerts: AlertEngine,
    portfolio: PortfolioLedger,
}

impl std::fmt::Debug for MarketMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketMonitor")
            .field("instruments", &self.symbols())
            .field("fetcher", &self.fetcher)
            .field("quote_store", &self.quote_store)
            .field("alerts", &self.alerts)
            .field("portfolio", &self.portfolio)
            .finish()
    }
}

impl MarketMonitor {
    /// Open the engine with the default providers and instrument set.
    /// Persisted alerts and lots are loaded from the paths in `settings`.
    pub fn open(settings: EngineSettings) -> Result<Self, CoreError> {
        let registry = ProviderRegistry::new_with_defaults(&settings.api_keys);
        Self::with_registry(settings, registry, Instrument::magnificent_seven())
    }

    /// Open the engine with an explicit provider registry and instrument set.
    pub fn with_registry(
        settings: EngineSettings,
        registry: ProviderRegistry,
        instruments: Vec<Instrument>,
    ) -> Result<Self, CoreError> {
        let alerts = AlertEngine::open(JsonStore::new(settings.alerts_file.clone()))?;
        let portfolio = PortfolioLedger::open(JsonStore::new(settings.portfolio_file.clone()))?;

        Ok(Self {
            instruments,
            fetcher: InstrumentFetcher::from_settings(registry, &settings),
            quote_store: QuoteStore::new(settings.cache_ttl()),
            alerts,
            portfolio,
            settings,
        })
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn instrument(&self, symbol: &str) -> Option<&Instrument> {
        let symbol = symbol.to_uppercase();
        self.instruments.iter().find(|i| i.symbol == symbol)
    }

    pub fn symbols(&self) -> Vec<String> {
        self.instruments.iter().map(|i| i.symbol.clone()).collect()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn alerts(&self) -> &AlertEngine {
        &self.alerts
    }

    pub fn alerts_mut(&mut self) -> &mut AlertEngine {
        &mut self.alerts
    }

    pub fn portfolio(&self) -> &PortfolioLedger {
        &self.portfolio
    }

    pub fn portfolio_mut(&mut self) -> &mut PortfolioLedger {
        &mut self.portfolio
    }

    pub fn quote_store(&self) -> &QuoteStore {
        &self.quote_store
    }

    // ── Market Data ─────────────────────────────────────────────────

    /// Snapshots for `symbols` over `period`, served from cache when fresh.
    pub async fn snapshots(&mut self, symbols: &[String], period: Period) -> SnapshotMap {
        self.quote_store
            .get_or_fetch(&self.fetcher, symbols, period)
            .await
    }

    /// Drop all cached quotes (manual refresh).
    pub fn invalidate_quotes(&mut self) {
        self.quote_store.invalidate_all();
    }

    // ── Refresh Pipeline ────────────────────────────────────────────

    /// One evaluation pass over every instrument:
    /// fetch (cached) → derive → evaluate alerts → value portfolio.
    pub async fn refresh(&mut self, session: &SessionContext, period: Period) -> RefreshReport {
        let symbols = self.symbols();
        let snapshots = self.snapshots(&symbols, period).await;

        let ranking = metrics::rank_performance(&symbols, &snapshots);
        let alerts = self.alerts.active_alerts(&snapshots, session);
        let valuation = self.portfolio.value(&snapshots);
        let unavailable: Vec<String> = snapshots
            .iter()
            .filter(|(_, snapshot)| snapshot.is_none())
            .map(|(symbol, _)| symbol.clone())
            .collect();

        log::debug!(
            "Refresh {period}: {} symbols, {} unavailable, {} active alerts",
            snapshots.len(),
            unavailable.len(),
            alerts.len()
        );

        RefreshReport {
            period,
            refreshed_at: Utc::now(),
            snapshots,
            alerts,
            valuation,
            ranking,
            unavailable,
        }
    }

    /// Invalidate the cache, then refresh. Always hits the network.
    pub async fn force_refresh(
        &mut self,
        session: &SessionContext,
        period: Period,
    ) -> RefreshReport {
        self.invalidate_quotes();
        self.refresh(session, period).await
    }

    /// Timed refresh loop. Every tick of `refresh_interval` force-refreshes
    /// and hands the report, with the session, to `on_report`.
    ///
    /// `session.auto_refresh` is checked before every tick, so the callback
    /// stops the loop by switching it off. Silences added by the callback
    /// apply from the next report on. With `max_cycles` set the loop also
    /// ends after that many reports.
    pub async fn run_auto_refresh<F>(
        &mut self,
        session: &mut SessionContext,
        period: Period,
        max_cycles: Option<usize>,
        mut on_report: F,
    ) where
        F: FnMut(RefreshReport, &mut SessionContext),
    {
        // tokio intervals must be non-zero
        let every = self.settings.refresh_interval().max(Duration::from_secs(1));
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let mut cycles = 0usize;
        while session.auto_refresh && max_cycles.map_or(true, |max| cycles < max) {
            ticker.tick().await;
            let report = self.force_refresh(session, period).await;
            on_report(report, session);
            cycles += 1;
        }
    }

    // ── User Edits ──────────────────────────────────────────────────

    pub fn set_threshold(
        &mut self,
        symbol: &str,
        kind: AlertKind,
        value: f64,
    ) -> Result<(), CoreError> {
        self.alerts.set_threshold(symbol, kind, value)
    }

    pub fn clear_alerts_for(&mut self, symbol: &str) -> Result<bool, CoreError> {
        self.alerts.clear_symbol(symbol)
    }

    /// Dismiss the given alerts for the rest of the session.
    pub fn silence_alerts(&self, session: &mut SessionContext, alerts: &[TriggeredAlert]) {
        self.alerts.silence_all(session, alerts);
    }

    pub fn add_lot(
        &mut self,
        symbol: &str,
        shares: f64,
        buy_price: f64,
        buy_date: NaiveDate,
    ) -> Result<(), CoreError> {
        self.portfolio.add_lot(symbol, shares, buy_price, buy_date)
    }

    pub fn clear_portfolio(&mut self) -> Result<(), CoreError> {
        self.portfolio.clear()
    }
}
