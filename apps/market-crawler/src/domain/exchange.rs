//! Exchange Metadata Types
//!
//! Snapshot of one exchange's streaming endpoint and trading pairs, loaded
//! once when a crawl starts and shared read-only by all of its connections.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Market type of a trading pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MarketType {
    /// Spot market.
    #[default]
    Spot,
    /// Dated futures.
    Futures,
    /// Perpetual swaps.
    Swap,
    /// Options.
    #[serde(rename = "Option")]
    Options,
}

impl MarketType {
    /// Get the market type name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Spot => "Spot",
            Self::Futures => "Futures",
            Self::Swap => "Swap",
            Self::Options => "Option",
        }
    }
}

/// A trading pair as known to one exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairInfo {
    /// Exchange-agnostic pair identifier, e.g. `BTC_USDT`.
    pub normalized_pair: String,
    /// The exchange's own spelling, e.g. `BTCUSDT`.
    pub raw_pair: String,
    /// Market type.
    #[serde(default)]
    pub market_type: MarketType,
}

impl PairInfo {
    /// Create a new pair.
    #[must_use]
    pub fn new(
        normalized_pair: impl Into<String>,
        raw_pair: impl Into<String>,
        market_type: MarketType,
    ) -> Self {
        Self {
            normalized_pair: normalized_pair.into(),
            raw_pair: raw_pair.into(),
            market_type,
        }
    }
}

/// Wire document served by metadata providers.
///
/// ```json
/// {
///   "name": "Binance",
///   "websocket_endpoint": "wss://stream.binance.com:9443",
///   "pairs": {
///     "BTC_USDT": {"normalized_pair": "BTC_USDT", "raw_pair": "BTCUSDT", "market_type": "Spot"}
///   }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
struct ExchangeInfoDocument {
    name: String,
    websocket_endpoint: String,
    #[serde(default)]
    pairs: BTreeMap<String, PairInfo>,
}

/// Immutable metadata snapshot for one exchange.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "ExchangeInfoDocument")]
pub struct ExchangeInfo {
    name: String,
    websocket_endpoint: String,
    pairs: BTreeMap<String, PairInfo>,
    by_raw: HashMap<String, String>,
    by_raw_upper: HashMap<String, String>,
}

impl ExchangeInfo {
    /// Build a snapshot from its pairs.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        websocket_endpoint: impl Into<String>,
        pairs: impl IntoIterator<Item = PairInfo>,
    ) -> Self {
        let pairs = pairs
            .into_iter()
            .map(|p| (p.normalized_pair.clone(), p))
            .collect::<BTreeMap<_, _>>();
        Self::from_pairs(name.into(), websocket_endpoint.into(), pairs)
    }

    fn from_pairs(
        name: String,
        websocket_endpoint: String,
        pairs: BTreeMap<String, PairInfo>,
    ) -> Self {
        let by_raw = pairs
            .values()
            .map(|p| (p.raw_pair.clone(), p.normalized_pair.clone()))
            .collect();
        let by_raw_upper = pairs
            .values()
            .map(|p| (p.raw_pair.to_uppercase(), p.normalized_pair.clone()))
            .collect();

        Self {
            name,
            websocket_endpoint: websocket_endpoint.trim_end_matches('/').to_string(),
            pairs,
            by_raw,
            by_raw_upper,
        }
    }

    /// Exchange name as reported by the metadata provider.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Streaming endpoint, without a trailing slash.
    #[must_use]
    pub fn websocket_endpoint(&self) -> &str {
        &self.websocket_endpoint
    }

    /// Look up a pair by its normalized identifier.
    #[must_use]
    pub fn pair(&self, normalized_pair: &str) -> Option<&PairInfo> {
        self.pairs.get(normalized_pair)
    }

    /// Resolve a raw exchange symbol to its pair.
    ///
    /// Exact spelling wins; otherwise the lookup is case-insensitive so
    /// lowercase wire symbols still resolve.
    #[must_use]
    pub fn resolve_raw(&self, raw_symbol: &str) -> Option<&PairInfo> {
        self.by_raw
            .get(raw_symbol)
            .or_else(|| self.by_raw_upper.get(&raw_symbol.to_uppercase()))
            .and_then(|normalized| self.pairs.get(normalized))
    }

    /// All normalized pair identifiers, in sorted order.
    pub fn pair_names(&self) -> impl Iterator<Item = &str> {
        self.pairs.keys().map(String::as_str)
    }

    /// Number of known pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the snapshot has no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl From<ExchangeInfoDocument> for ExchangeInfo {
    fn from(doc: ExchangeInfoDocument) -> Self {
        Self::from_pairs(doc.name, doc.websocket_endpoint, doc.pairs)
    }
}
