//! Canonical Market Data Messages
//!
//! The unified schema every exchange payload is normalized into. Numeric
//! fields are `Decimal` parsed from the exchange's decimal strings, so no
//! binary floating point rounding is introduced anywhere along the way.

use rust_decimal::Decimal;
use serde::Serialize;

use super::channel::ChannelType;
use super::exchange::{MarketType, PairInfo};

/// One price level of an order book.
///
/// `cost` is always `price * quantity` of the stored values; the fields are
/// private so that relation cannot be broken after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    price: Decimal,
    quantity: Decimal,
    cost: Decimal,
}

impl OrderItem {
    /// Create a level, computing its cost.
    ///
    /// Returns `None` if `price * quantity` overflows `Decimal`.
    #[must_use]
    pub fn new(price: Decimal, quantity: Decimal) -> Option<Self> {
        let cost = price.checked_mul(quantity)?;
        Some(Self {
            price,
            quantity,
            cost,
        })
    }

    /// Level price.
    #[must_use]
    pub const fn price(&self) -> Decimal {
        self.price
    }

    /// Level quantity.
    #[must_use]
    pub const fn quantity(&self) -> Decimal {
        self.quantity
    }

    /// `price * quantity`.
    #[must_use]
    pub const fn cost(&self) -> Decimal {
        self.cost
    }
}

/// Fields shared by every canonical message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MsgMeta {
    /// Exchange name.
    pub exchange: String,
    /// Market type of the pair.
    pub market_type: MarketType,
    /// Raw wire topic the frame arrived on.
    pub channel: String,
    /// Abstract channel category.
    pub channel_type: ChannelType,
    /// Normalized pair.
    pub pair: String,
    /// Exchange spelling of the pair.
    pub raw_pair: String,
    /// Milliseconds since the Unix epoch; exchange time when supplied,
    /// ingestion time otherwise.
    pub timestamp: i64,
    /// Raw payload, kept for audit.
    pub raw: String,
}

impl MsgMeta {
    /// Build the shared fields for a resolved pair.
    #[must_use]
    pub fn new(
        exchange: &str,
        channel: &str,
        channel_type: ChannelType,
        pair: &PairInfo,
        timestamp: i64,
        raw: impl Into<String>,
    ) -> Self {
        Self {
            exchange: exchange.to_string(),
            market_type: pair.market_type,
            channel: channel.to_string(),
            channel_type,
            pair: pair.normalized_pair.clone(),
            raw_pair: pair.raw_pair.clone(),
            timestamp,
            raw: raw.into(),
        }
    }
}

/// A single executed trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeMsg {
    /// Shared fields.
    #[serde(flatten)]
    pub meta: MsgMeta,
    /// Execution price.
    pub price: Decimal,
    /// Executed quantity.
    pub quantity: Decimal,
    /// `true` when the buyer was the aggressor (taker).
    pub side: bool,
    /// Exchange trade identifier, empty when the exchange has none.
    pub trade_id: String,
}

/// Order book update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderBookMsg {
    /// Shared fields.
    #[serde(flatten)]
    pub meta: MsgMeta,
    /// Ask levels in wire order.
    pub asks: Vec<OrderItem>,
    /// Bid levels in wire order.
    pub bids: Vec<OrderItem>,
    /// `true` for a full snapshot, `false` for an incremental update.
    pub full: bool,
}

/// Best bid and offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BboMsg {
    /// Shared fields.
    #[serde(flatten)]
    pub meta: MsgMeta,
    /// Best bid price.
    pub bid_price: Decimal,
    /// Quantity at the best bid.
    pub bid_quantity: Decimal,
    /// Best ask price.
    pub ask_price: Decimal,
    /// Quantity at the best ask.
    pub ask_quantity: Decimal,
}

/// Canonical message handed to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Msg {
    /// Trade.
    Trade(TradeMsg),
    /// Order book update.
    OrderBook(OrderBookMsg),
    /// Best bid and offer.
    Bbo(BboMsg),
}

impl Msg {
    /// Shared fields of any variant.
    #[must_use]
    pub const fn meta(&self) -> &MsgMeta {
        match self {
            Self::Trade(m) => &m.meta,
            Self::OrderBook(m) => &m.meta,
            Self::Bbo(m) => &m.meta,
        }
    }

    /// Channel category of this message.
    #[must_use]
    pub const fn channel_type(&self) -> ChannelType {
        self.meta().channel_type
    }

    /// Normalized pair.
    #[must_use]
    pub fn pair(&self) -> &str {
        &self.meta().pair
    }

    /// Message timestamp in milliseconds.
    #[must_use]
    pub const fn timestamp(&self) -> i64 {
        self.meta().timestamp
    }
}
