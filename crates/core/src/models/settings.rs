use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::CoreError;

/// Engine configuration. Every field has a default, so a partial JSON file
/// (or none at all) is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// How long a cached batch stays valid, in seconds.
    pub cache_ttl_secs: u64,

    /// Auto-refresh interval, in seconds.
    pub refresh_interval_secs: u64,

    /// Upper bound for a single provider call, in seconds.
    pub fetch_timeout_secs: u64,

    /// Extra attempts per symbol before it is reported unavailable.
    pub fetch_retries: u32,

    /// Where alert rules are persisted.
    pub alerts_file: PathBuf,

    /// Where portfolio lots are persisted.
    pub portfolio_file: PathBuf,

    /// Optional API keys for providers that require them.
    /// Keys: provider name (e.g., "alphavantage").
    pub api_keys: HashMap<String, String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            refresh_interval_secs: 300,
            fetch_timeout_secs: 10,
            fetch_retries: 1,
            alerts_file: PathBuf::from("alerts.json"),
            portfolio_file: PathBuf::from("portfolio.json"),
            api_keys: HashMap::new(),
        }
    }
}

impl EngineSettings {
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json)
            .map_err(|e| CoreError::Deserialization(format!("Invalid settings: {e}")))
    }

    /// Load settings from disk. A missing file yields the defaults.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
