use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;

use crate::models::quote::{Period, SnapshotMap};
use crate::services::instrument_fetcher::InstrumentFetcher;

/// Cache key: (sorted, de-duplicated symbols, period).
pub type CacheKey = (Vec<String>, Period);

/// One cached batch.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub snapshots: SnapshotMap,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Valid for reads iff `now - fetched_at < ttl`.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now.signed_duration_since(self.fetched_at) < ttl,
            // out of chrono's range: effectively never expires
            Err(_) => true,
        }
    }
}

/// Time-bounded cache of whole fetch batches.
///
/// Cache strategy:
/// - Key is the exact symbol set plus period. A different set is a miss even
///   when symbols overlap; batches are never merged.
/// - A fresh entry is returned unchanged with no network call.
/// - A miss re-fetches the full batch and replaces the entry, so one call
///   never mixes old and new data.
/// - Per-symbol failures are cached as `None` alongside the successes.
/// - Every miss also drops expired batches, so keys that are never asked
///   for again do not accumulate.
pub struct QuoteStore {
    entries: HashMap<CacheKey, CacheEntry>,
    ttl: Duration,
}

impl QuoteStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn key(symbols: &[String], period: Period) -> CacheKey {
        let mut sorted: Vec<String> = symbols.iter().map(|s| s.to_uppercase()).collect();
        sorted.sort();
        sorted.dedup();
        (sorted, period)
    }

    /// Return the cached batch for `(symbols, period)` or fetch and cache it.
    pub async fn get_or_fetch(
        &mut self,
        fetcher: &InstrumentFetcher,
        symbols: &[String],
        period: Period,
    ) -> SnapshotMap {
        let key = Self::key(symbols, period);
        let now = Utc::now();

        if let Some(entry) = self.entries.get(&key) {
            if entry.is_fresh(now, self.ttl) {
                log::debug!("Quote cache hit for {} symbols ({period})", key.0.len());
                return entry.snapshots.clone();
            }
        }

        log::debug!("Quote cache miss for {} symbols ({period}), fetching", key.0.len());
        let snapshots = fetcher.fetch_all(&key.0, period).await;
        let pruned = self.prune_expired();
        if pruned > 0 {
            log::debug!("Pruned {pruned} expired quote batches");
        }
        self.entries.insert(
            key,
            CacheEntry {
                snapshots: snapshots.clone(),
                fetched_at: Utc::now(),
            },
        );
        snapshots
    }

    /// Look up a fresh entry without fetching.
    pub fn get(&self, symbols: &[String], period: Period) -> Option<&SnapshotMap> {
        self.entries
            .get(&Self::key(symbols, period))
            .filter(|entry| entry.is_fresh(Utc::now(), self.ttl))
            .map(|entry| &entry.snapshots)
    }

    /// Drop every entry. The next `get_or_fetch` always goes to the network.
    pub fn invalidate_all(&mut self) {
        log::debug!("Invalidating {} cached quote batches", self.entries.len());
        self.entries.clear();
    }

    /// Drop entries that are no longer fresh. Returns how many were removed.
    pub fn prune_expired(&mut self) -> usize {
        let now = Utc::now();
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now, ttl));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for QuoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuoteStore")
            .field("entries", &self.entries.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}
