use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The kind of threshold a rule checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Price at or above the threshold
    Upper,
    /// Price at or below the threshold
    Lower,
    /// Absolute change vs previous close at or above the threshold (symmetric, legacy)
    ChangePercent,
    /// Change vs previous close at or above `+threshold` percent
    ChangeUp,
    /// Change vs previous close at or below `-threshold` percent
    ChangeDown,
}

impl AlertKind {
    /// Evaluation order within one symbol's rule.
    pub const ALL: [AlertKind; 5] = [
        AlertKind::Upper,
        AlertKind::Lower,
        AlertKind::ChangePercent,
        AlertKind::ChangeUp,
        AlertKind::ChangeDown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Upper => "upper",
            AlertKind::Lower => "lower",
            AlertKind::ChangePercent => "change_percent",
            AlertKind::ChangeUp => "change_up",
            AlertKind::ChangeDown => "change_down",
        }
    }

    /// Whether this kind compares a percent change rather than a price.
    pub fn is_change(&self) -> bool {
        !matches!(self, AlertKind::Upper | AlertKind::Lower)
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All configured thresholds for one symbol. At most one value per kind;
/// setting a kind overwrites only that kind.
///
/// Persisted as `{"upper": 150.0, "change_down": 3.0}`; unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_up: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_down: Option<f64>,
}

impl AlertRule {
    pub fn get(&self, kind: AlertKind) -> Option<f64> {
        match kind {
            AlertKind::Upper => self.upper,
            AlertKind::Lower => self.lower,
            AlertKind::ChangePercent => self.change_percent,
            AlertKind::ChangeUp => self.change_up,
            AlertKind::ChangeDown => self.change_down,
        }
    }

    fn slot_mut(&mut self, kind: AlertKind) -> &mut Option<f64> {
        match kind {
            AlertKind::Upper => &mut self.upper,
            AlertKind::Lower => &mut self.lower,
            AlertKind::ChangePercent => &mut self.change_percent,
            AlertKind::ChangeUp => &mut self.change_up,
            AlertKind::ChangeDown => &mut self.change_down,
        }
    }

    pub fn set(&mut self, kind: AlertKind, value: f64) {
        *self.slot_mut(kind) = Some(value);
    }

    /// Returns the removed value, if any.
    pub fn unset(&mut self, kind: AlertKind) -> Option<f64> {
        self.slot_mut(kind).take()
    }

    /// Configured `(kind, threshold)` pairs in evaluation order.
    pub fn thresholds(&self) -> impl Iterator<Item = (AlertKind, f64)> + '_ {
        AlertKind::ALL
            .into_iter()
            .filter_map(move |kind| self.get(kind).map(|v| (kind, v)))
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds().next().is_none()
    }
}

/// Symbol → rule. This is the persisted alert schema.
pub type AlertRules = BTreeMap<String, AlertRule>;

/// Deduplication identity of a triggered alert: `(symbol, kind, threshold)`.
///
/// Editing a threshold yields a new identity, so a silenced alert comes back
/// once its rule changes. Threshold equality is bitwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerId {
    pub symbol: String,
    pub kind: AlertKind,
    pub threshold: f64,
}

impl PartialEq for TriggerId {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
            && self.kind == other.kind
            && self.threshold.to_bits() == other.threshold.to_bits()
    }
}

impl Eq for TriggerId {}

impl std::hash::Hash for TriggerId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.symbol.hash(state);
        self.kind.hash(state);
        self.threshold.to_bits().hash(state);
    }
}

impl TriggerId {
    pub fn new(symbol: impl Into<String>, kind: AlertKind, threshold: f64) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            kind,
            threshold,
        }
    }
}

/// A rule whose condition held on the latest evaluation. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeredAlert {
    pub symbol: String,
    pub kind: AlertKind,
    pub current_price: f64,
    /// Percent change vs previous close; only set for change kinds
    pub change: Option<f64>,
    pub threshold: f64,
}

impl TriggeredAlert {
    pub fn id(&self) -> TriggerId {
        TriggerId::new(self.symbol.clone(), self.kind, self.threshold)
    }

    /// One-line notification text.
    pub fn message(&self) -> String {
        let change = self.change.unwrap_or(0.0);
        match self.kind {
            AlertKind::Upper => format!(
                "▲ {}: rose above ${:.2} (current: ${:.2})",
                self.symbol, self.threshold, self.current_price
            ),
            AlertKind::Lower => format!(
                "▼ {}: fell below ${:.2} (current: ${:.2})",
                self.symbol, self.threshold, self.current_price
            ),
            AlertKind::ChangeUp => format!(
                "▲ {}: up {:+.2}% (threshold: +{:.1}%)",
                self.symbol, change, self.threshold
            ),
            AlertKind::ChangeDown => format!(
                "▼ {}: down {:+.2}% (threshold: -{:.1}%)",
                self.symbol, change, self.threshold
            ),
            AlertKind::ChangePercent => format!(
                "{}: changed {:+.2}% (threshold: ±{:.1}%)",
                self.symbol, change, self.threshold
            ),
        }
    }
}
