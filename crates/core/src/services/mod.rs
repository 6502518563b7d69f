pub mod alert_service;
pub mod instrument_fetcher;
pub mod metrics;
pub mod portfolio_service;
pub mod quote_store;
