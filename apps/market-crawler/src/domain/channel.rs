//! Channel Types
//!
//! Abstract feed categories, independent of any exchange's wire naming.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Abstract market data feed category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ChannelType {
    /// Executed trades.
    Trade,
    /// Incremental (or full) order book updates.
    OrderBookUpdate,
    /// Best bid and offer.
    #[serde(rename = "BBO")]
    Bbo,
}

impl ChannelType {
    /// Get all channel types.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Trade, Self::OrderBookUpdate, Self::Bbo]
    }

    /// Get the canonical name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trade => "Trade",
            Self::OrderBookUpdate => "OrderBookUpdate",
            Self::Bbo => "BBO",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a channel type name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown channel type: {0}")]
pub struct ParseChannelTypeError(pub String);

impl FromStr for ChannelType {
    type Err = ParseChannelTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trade" => Ok(Self::Trade),
            "orderbookupdate" | "orderbook" => Ok(Self::OrderBookUpdate),
            "bbo" => Ok(Self::Bbo),
            _ => Err(ParseChannelTypeError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Trade", ChannelType::Trade)]
    #[test_case("trade", ChannelType::Trade)]
    #[test_case("OrderBookUpdate", ChannelType::OrderBookUpdate)]
    #[test_case("orderbook", ChannelType::OrderBookUpdate)]
    #[test_case("BBO", ChannelType::Bbo)]
    #[test_case(" bbo ", ChannelType::Bbo)]
    fn parses_channel_names(input: &str, expected: ChannelType) {
        assert_eq!(input.parse::<ChannelType>().unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_name() {
        let err = "Kline".parse::<ChannelType>().unwrap_err();
        assert_eq!(err.to_string(), "unknown channel type: Kline");
    }

    #[test]
    fn display_matches_parse() {
        for channel in ChannelType::all() {
            assert_eq!(channel.to_string().parse::<ChannelType>().unwrap(), *channel);
        }
    }

    #[test]
    fn bbo_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&ChannelType::Bbo).unwrap(), "\"BBO\"");
    }
}
