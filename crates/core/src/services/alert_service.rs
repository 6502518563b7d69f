use crate::errors::CoreError;
use crate::models::alert::{AlertKind, AlertRule, AlertRules, TriggerId, TriggeredAlert};
use crate::models::quote::{Snapshot, SnapshotMap};
use crate::models::session::SessionContext;
use crate::services::metrics::percent_change;
use crate::storage::json_store::JsonStore;

/// Owns the per-symbol threshold rules and evaluates them against snapshots.
///
/// Every mutation is written through to the store before it becomes visible;
/// a failed write leaves the in-memory rules untouched.
///
/// Evaluation is stateless: a condition that holds triggers on every pass.
/// Suppressing repeats is the job of the session's silence set.
pub struct AlertEngine {
    rules: AlertRules,
    store: JsonStore<AlertRules>,
}

impl AlertEngine {
    /// Load rules from `store` (an absent file means no rules).
    pub fn open(store: JsonStore<AlertRules>) -> Result<Self, CoreError> {
        let rules = normalize_rules(store.load()?)?;
        log::debug!("Loaded alert rules for {} symbols", rules.len());
        Ok(Self { rules, store })
    }

    pub fn rules(&self) -> &AlertRules {
        &self.rules
    }

    pub fn rule(&self, symbol: &str) -> Option<&AlertRule> {
        self.rules.get(&symbol.to_uppercase())
    }

    /// Upsert one threshold. Other kinds on the same symbol are left as they are.
    pub fn set_threshold(
        &mut self,
        symbol: &str,
        kind: AlertKind,
        value: f64,
    ) -> Result<(), CoreError> {
        validate_threshold(symbol, kind, value)?;
        let symbol = symbol.to_uppercase();

        let mut updated = self.rules.clone();
        updated.entry(symbol.clone()).or_default().set(kind, value);
        self.commit(updated)?;

        log::info!("Alert set: {symbol} {kind} = {value}");
        Ok(())
    }

    /// Remove a single threshold kind. Returns the removed value, if any.
    pub fn remove_threshold(
        &mut self,
        symbol: &str,
        kind: AlertKind,
    ) -> Result<Option<f64>, CoreError> {
        let symbol = symbol.to_uppercase();
        let Some(rule) = self.rules.get(&symbol) else {
            return Ok(None);
        };
        if rule.get(kind).is_none() {
            return Ok(None);
        }

        let mut updated = self.rules.clone();
        let mut removed = None;
        if let Some(rule) = updated.get_mut(&symbol) {
            removed = rule.unset(kind);
            if rule.is_empty() {
                updated.remove(&symbol);
            }
        }
        self.commit(updated)?;
        Ok(removed)
    }

    /// Remove every rule kind for `symbol`. Returns whether anything was removed.
    pub fn clear_symbol(&mut self, symbol: &str) -> Result<bool, CoreError> {
        let symbol = symbol.to_uppercase();
        if !self.rules.contains_key(&symbol) {
            return Ok(false);
        }
        let mut updated = self.rules.clone();
        updated.remove(&symbol);
        self.commit(updated)?;

        log::info!("Alerts cleared for {symbol}");
        Ok(true)
    }

    /// Check every configured rule against `snapshots`.
    ///
    /// Symbols whose fetch failed (`None` snapshot) are skipped. A snapshot
    /// with an empty series is still checked at a current price of 0, so a
    /// `lower` rule fires for it. Output follows rule order: symbols
    /// ascending, kinds in [`AlertKind::ALL`] order.
    pub fn evaluate(&self, snapshots: &SnapshotMap) -> Vec<TriggeredAlert> {
        let mut triggered = Vec::new();

        for (symbol, rule) in &self.rules {
            let Some(snapshot) = snapshots.get(symbol).and_then(Option::as_ref) else {
                continue;
            };

            for (kind, threshold) in rule.thresholds() {
                if let Some(alert) = check(symbol, kind, threshold, snapshot) {
                    triggered.push(alert);
                }
            }
        }

        triggered
    }

    /// Triggered alerts minus those silenced in this session.
    pub fn active_alerts(
        &self,
        snapshots: &SnapshotMap,
        session: &SessionContext,
    ) -> Vec<TriggeredAlert> {
        session.filter_active(self.evaluate(snapshots))
    }

    /// Acknowledge identities for the rest of the session.
    pub fn silence<I>(&self, session: &mut SessionContext, ids: I)
    where
        I: IntoIterator<Item = TriggerId>,
    {
        session.silence(ids);
    }

    /// Acknowledge every alert in `alerts` (the usual "dismiss all" action).
    pub fn silence_all(&self, session: &mut SessionContext, alerts: &[TriggeredAlert]) {
        session.silence(alerts.iter().map(TriggeredAlert::id));
    }

    /// Serialize the rule set in the persisted schema.
    pub fn export_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(&self.rules)
            .map_err(|e| CoreError::Serialization(format!("Failed to export alerts: {e}")))
    }

    /// Replace the whole rule set from JSON.
    ///
    /// The payload is parsed and validated in full before anything changes;
    /// on any error the current rules stay in place.
    pub fn import_json(&mut self, json: &str) -> Result<usize, CoreError> {
        let parsed: AlertRules = serde_json::from_str(json)
            .map_err(|e| CoreError::InvalidImport(format!("Malformed alert rules: {e}")))?;
        let rules = normalize_rules(parsed)
            .map_err(|e| CoreError::InvalidImport(e.to_string()))?;

        let count = rules.len();
        self.commit(rules)?;
        log::info!("Imported alert rules for {count} symbols");
        Ok(count)
    }

    fn commit(&mut self, rules: AlertRules) -> Result<(), CoreError> {
        self.store.save(&rules)?;
        self.rules = rules;
        Ok(())
    }
}

impl std::fmt::Debug for AlertEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertEngine")
            .field("symbols", &self.rules.len())
            .field("store", &self.store)
            .finish()
    }
}

fn check(
    symbol: &str,
    kind: AlertKind,
    threshold: f64,
    snapshot: &Snapshot,
) -> Option<TriggeredAlert> {
    let price = snapshot.current_price;
    let change = percent_change(price, snapshot.previous_close);

    let hit = match kind {
        AlertKind::Upper => price >= threshold,
        AlertKind::Lower => price <= threshold,
        AlertKind::ChangePercent => change.abs() >= threshold,
        AlertKind::ChangeUp => change >= threshold,
        AlertKind::ChangeDown => change <= -threshold,
    };

    hit.then(|| TriggeredAlert {
        symbol: symbol.to_string(),
        kind,
        current_price: price,
        change: kind.is_change().then_some(change),
        threshold,
    })
}

fn validate_threshold(symbol: &str, kind: AlertKind, value: f64) -> Result<(), CoreError> {
    if symbol.trim().is_empty() {
        return Err(CoreError::ValidationError("Alert symbol must not be empty".into()));
    }
    if !value.is_finite() || value < 0.0 {
        return Err(CoreError::ValidationError(format!(
            "Invalid {kind} threshold for {symbol}: {value} (must be finite and non-negative)"
        )));
    }
    Ok(())
}

/// Uppercase symbols, drop empty rules and validate every threshold.
///
/// Two keys that name the same symbol once normalized (`"aapl"` and
/// `"AAPL"`) are an error.
fn normalize_rules(rules: AlertRules) -> Result<AlertRules, CoreError> {
    let mut normalized = AlertRules::new();
    for (symbol, rule) in rules {
        for (kind, value) in rule.thresholds() {
            validate_threshold(&symbol, kind, value)?;
        }
        if rule.is_empty() {
            continue;
        }
        let key = symbol.trim().to_uppercase();
        if normalized.contains_key(&key) {
            return Err(CoreError::ValidationError(format!(
                "Duplicate alert rules for {key}"
            )));
        }
        normalized.insert(key, rule);
    }
    Ok(normalized)
}
