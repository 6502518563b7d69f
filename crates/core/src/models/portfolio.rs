use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One discrete purchase. The owning symbol is the ledger key.
///
/// Persisted as `{"shares": 10.0, "buy_price": 100.0, "buy_date": "YYYY-MM-DD"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Lot {
    pub shares: f64,
    pub buy_price: f64,
    pub buy_date: NaiveDate,
}

impl Lot {
    pub fn new(shares: f64, buy_price: f64, buy_date: NaiveDate) -> Self {
        Self {
            shares,
            buy_price,
            buy_date,
        }
    }

    pub fn invested(&self) -> f64 {
        self.shares * self.buy_price
    }
}

/// Symbol → append-only list of lots. This is the persisted ledger schema.
pub type Ledger = BTreeMap<String, Vec<Lot>>;

/// Valuation of a single lot at the current price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionView {
    pub symbol: String,
    pub shares: f64,
    pub buy_price: f64,
    pub buy_date: NaiveDate,
    pub current_price: f64,

    /// shares × buy_price
    pub invested: f64,

    /// shares × current_price
    pub value: f64,

    /// value − invested
    pub gain: f64,

    /// gain / invested × 100, or 0 when nothing was invested
    pub gain_pct: f64,
}

/// Aggregated valuation over every priced lot.
///
/// Lots whose symbol has no usable price are omitted from both `positions`
/// and the totals; their symbols are listed in `unpriced`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioValuation {
    pub positions: Vec<PositionView>,
    pub total_invested: f64,
    pub total_value: f64,
    pub total_gain: f64,
    pub total_gain_pct: f64,
    pub unpriced: Vec<String>,
}

/// Share of the portfolio's current value held in one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub symbol: String,
    pub shares: f64,
    pub value: f64,

    /// value / total_value × 100
    pub allocation_pct: f64,
}
