use std::collections::HashMap;
use std::sync::Arc;

use super::alphavantage::AlphaVantageProvider;
use super::traits::QuoteProvider;
use super::yahoo_finance::YahooFinanceProvider;

/// Ordered registry of quote providers.
///
/// The first registered provider is the primary; the rest are fallbacks
/// tried in registration order when an earlier one fails.
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn QuoteProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Create a registry with all default providers pre-configured.
    pub fn new_with_defaults(api_keys: &HashMap<String, String>) -> Self {
        let mut registry = Self::new();

        // Yahoo Finance: no API key needed (primary)
        match YahooFinanceProvider::new() {
            Ok(yahoo) => registry.register(Arc::new(yahoo)),
            Err(e) => log::warn!("Yahoo Finance provider unavailable: {e}"),
        }

        // Alpha Vantage: requires API key (fallback, also has market cap / P/E)
        if let Some(key) = api_keys.get("alphavantage") {
            registry.register(Arc::new(AlphaVantageProvider::new(key.clone())));
        }

        registry
    }

    /// Register a new provider at the lowest priority.
    pub fn register(&mut self, provider: Arc<dyn QuoteProvider>) {
        self.providers.push(provider);
    }

    /// All providers, ordered by registration priority.
    pub fn providers(&self) -> &[Arc<dyn QuoteProvider>] {
        &self.providers
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}
