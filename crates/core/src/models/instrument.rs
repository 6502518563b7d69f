use serde::{Deserialize, Serialize};

/// An immutable reference record for a monitored instrument.
///
/// **Equality and hashing** are based solely on `symbol`, NOT on
/// `display_name` or `color`, so lookups are independent of presentation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    /// Ticker symbol, uppercased (e.g., "AAPL", "MSFT")
    pub symbol: String,

    /// Human-readable name (e.g., "Apple")
    pub display_name: String,

    /// Chart color as a hex string (e.g., "#A3A8B8")
    pub color: String,
}

impl PartialEq for Instrument {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
    }
}

impl Eq for Instrument {}

impl std::hash::Hash for Instrument {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.symbol.hash(state);
    }
}

impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.symbol, self.display_name)
    }
}

impl Instrument {
    pub fn new(
        symbol: impl Into<String>,
        display_name: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            display_name: display_name.into(),
            color: color.into(),
        }
    }

    /// The reference deployment's instrument set: the seven large-cap
    /// NASDAQ technology names, each with a distinct chart color.
    pub fn magnificent_seven() -> Vec<Instrument> {
        vec![
            Self::new("GOOGL", "Alphabet (Google)", "#5C9CE5"),
            Self::new("AMZN", "Amazon", "#FF9F43"),
            Self::new("AAPL", "Apple", "#A3A8B8"),
            Self::new("META", "Meta (Facebook)", "#0A84FF"),
            Self::new("MSFT", "Microsoft", "#00D2D3"),
            Self::new("NVDA", "NVIDIA", "#78C850"),
            Self::new("TSLA", "Tesla", "#E84545"),
        ]
    }
}
