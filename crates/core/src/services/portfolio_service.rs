use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::errors::CoreError;
use crate::models::portfolio::{Allocation, Ledger, Lot, PortfolioValuation, PositionView};
use crate::models::quote::SnapshotMap;
use crate::storage::json_store::JsonStore;

/// Owns the per-symbol lot lists and values them against current prices.
///
/// The whole ledger is written through to the store on every mutation;
/// rejected input never reaches the store.
pub struct PortfolioLedger {
    lots: Ledger,
    store: JsonStore<Ledger>,
}

impl PortfolioLedger {
    /// Load the ledger from `store` (an absent file means an empty ledger).
    pub fn open(store: JsonStore<Ledger>) -> Result<Self, CoreError> {
        let lots = normalize_ledger(store.load()?)?;
        log::debug!("Loaded {} lots", lots.values().map(Vec::len).sum::<usize>());
        Ok(Self { lots, store })
    }

    pub fn lots(&self) -> &Ledger {
        &self.lots
    }

    pub fn lots_for(&self, symbol: &str) -> &[Lot] {
        self.lots
            .get(&symbol.to_uppercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.lots.values().all(Vec::is_empty)
    }

    /// Append a purchase lot for `symbol`.
    ///
    /// Rules:
    /// - `shares` and `buy_price` must be finite and non-negative
    /// - symbol must not be empty
    pub fn add_lot(
        &mut self,
        symbol: &str,
        shares: f64,
        buy_price: f64,
        buy_date: NaiveDate,
    ) -> Result<(), CoreError> {
        let lot = Lot::new(shares, buy_price, buy_date);
        validate_lot(symbol, &lot)?;
        let symbol = symbol.trim().to_uppercase();

        let mut updated = self.lots.clone();
        updated.entry(symbol.clone()).or_default().push(lot);
        self.commit(updated)?;

        log::info!("Lot added: {shares} {symbol} @ {buy_price} on {buy_date}");
        Ok(())
    }

    /// Empty the whole ledger and persist the empty state. No undo.
    pub fn clear(&mut self) -> Result<(), CoreError> {
        self.commit(Ledger::new())?;
        log::info!("Portfolio cleared");
        Ok(())
    }

    /// Value every lot whose symbol has a usable (positive) current price.
    ///
    /// Unpriced lots are omitted, not zeroed, so totals reflect only priced
    /// positions. Positions follow ledger order: symbols ascending, lots in
    /// insertion order.
    pub fn value(&self, snapshots: &SnapshotMap) -> PortfolioValuation {
        let mut valuation = PortfolioValuation::default();

        for (symbol, lots) in &self.lots {
            if lots.is_empty() {
                continue;
            }
            let price = snapshots
                .get(symbol)
                .and_then(Option::as_ref)
                .map(|s| s.current_price)
                .filter(|p| *p > 0.0);
            let Some(current_price) = price else {
                valuation.unpriced.push(symbol.clone());
                continue;
            };

            for lot in lots {
                let invested = lot.invested();
                let value = lot.shares * current_price;
                let gain = value - invested;
                valuation.positions.push(PositionView {
                    symbol: symbol.clone(),
                    shares: lot.shares,
                    buy_price: lot.buy_price,
                    buy_date: lot.buy_date,
                    current_price,
                    invested,
                    value,
                    gain,
                    gain_pct: ratio_pct(gain, invested),
                });
            }
        }

        valuation.total_invested = valuation.positions.iter().map(|p| p.invested).sum();
        valuation.total_value = valuation.positions.iter().map(|p| p.value).sum();
        valuation.total_gain = valuation.positions.iter().map(|p| p.gain).sum();
        valuation.total_gain_pct = ratio_pct(valuation.total_gain, valuation.total_invested);
        valuation
    }

    /// Per-symbol share of current value, largest first.
    pub fn allocation(&self, snapshots: &SnapshotMap) -> Vec<Allocation> {
        let valuation = self.value(snapshots);

        let mut by_symbol: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
        for position in &valuation.positions {
            let entry = by_symbol.entry(position.symbol.as_str()).or_insert((0.0, 0.0));
            entry.0 += position.shares;
            entry.1 += position.value;
        }

        let mut allocation: Vec<Allocation> = by_symbol
            .into_iter()
            .map(|(symbol, (shares, value))| Allocation {
                symbol: symbol.to_string(),
                shares,
                value,
                allocation_pct: ratio_pct(value, valuation.total_value),
            })
            .collect();
        allocation.sort_by(|a, b| b.value.total_cmp(&a.value));
        allocation
    }

    /// Serialize the ledger in the persisted schema.
    pub fn export_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(&self.lots)
            .map_err(|e| CoreError::Serialization(format!("Failed to export portfolio: {e}")))
    }

    /// Replace the whole ledger from JSON. Validated in full first; on any
    /// error the current ledger stays in place.
    pub fn import_json(&mut self, json: &str) -> Result<usize, CoreError> {
        let parsed: Ledger = serde_json::from_str(json)
            .map_err(|e| CoreError::InvalidImport(format!("Malformed portfolio: {e}")))?;
        let lots = normalize_ledger(parsed).map_err(|e| CoreError::InvalidImport(e.to_string()))?;

        let count: usize = lots.values().map(Vec::len).sum();
        self.commit(lots)?;
        log::info!("Imported {count} lots");
        Ok(count)
    }

    fn commit(&mut self, lots: Ledger) -> Result<(), CoreError> {
        self.store.save(&lots)?;
        self.lots = lots;
        Ok(())
    }
}

impl std::fmt::Debug for PortfolioLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortfolioLedger")
            .field("symbols", &self.lots.len())
            .field("store", &self.store)
            .finish()
    }
}

fn ratio_pct(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

fn validate_lot(symbol: &str, lot: &Lot) -> Result<(), CoreError> {
    if symbol.trim().is_empty() {
        return Err(CoreError::ValidationError("Lot symbol must not be empty".into()));
    }
    if !lot.shares.is_finite() || lot.shares < 0.0 {
        return Err(CoreError::ValidationError(format!(
            "Invalid share count for {symbol}: {} (must be finite and non-negative)",
            lot.shares
        )));
    }
    if !lot.buy_price.is_finite() || lot.buy_price < 0.0 {
        return Err(CoreError::ValidationError(format!(
            "Invalid buy price for {symbol}: {} (must be finite and non-negative)",
            lot.buy_price
        )));
    }
    Ok(())
}

/// Uppercase symbols, merge duplicates and validate every lot.
fn normalize_ledger(ledger: Ledger) -> Result<Ledger, CoreError> {
    let mut normalized = Ledger::new();
    for (symbol, lots) in ledger {
        for lot in &lots {
            validate_lot(&symbol, lot)?;
        }
        normalized
            .entry(symbol.trim().to_uppercase())
            .or_default()
            .extend(lots);
    }
    Ok(normalized)
}
