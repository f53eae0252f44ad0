//! Binance Spot Adapter
//!
//! # Stream URL
//!
//! Combined streams: `{endpoint}/stream?streams=btcusdt@trade/ethbtc@depth`.
//! The subscription is carried by the URL; no handshake frame is sent.
//! One connection carries at most 1024 streams and is closed by Binance
//! after 24 hours.
//!
//! # Topics
//!
//! | Channel           | Topic                  |
//! |-------------------|------------------------|
//! | `Trade`           | `{symbol}@trade`       |
//! | `OrderBookUpdate` | `{symbol}@depth`       |
//! | `BBO`             | `{symbol}@bookTicker`  |
//!
//! The topic tail after `@` selects the channel type.
//!
//! # Envelope
//!
//! ```json
//! {"stream":"btcusdt@trade","data":{"e":"trade","E":123456,"s":"BTCUSDT",...}}
//! ```
//!
//! Prices and quantities are decimal strings.
//!
//! # Side
//!
//! Trades carry `m` (buyer is maker). `m == false` means the buyer was the
//! taker, i.e. a buyer-initiated trade, so `side = !m`.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use super::wire::{expect_event, order_item, resolve_symbol};
use crate::application::ports::{
    ConnectionPolicy, ExchangeAdapter, NormalizeError, RawFrame, ResolveError, Subscription,
    SubscriptionPlan, WireEvent, lookup_pair, require_market,
};
use crate::domain::{
    BboMsg, ChannelType, ExchangeInfo, MarketType, Msg, MsgMeta, OrderBookMsg, OrderItem, TradeMsg,
};

/// Exchange name.
pub const BINANCE: &str = "Binance";

const MAX_STREAMS_PER_CONNECTION: usize = 1024;

/// Binance drops connections after 24h; rotate a little earlier.
const MAX_SESSION_AGE: Duration = Duration::from_secs(23 * 60 * 60);

const SUPPORTED: &[ChannelType] = &[
    ChannelType::Trade,
    ChannelType::OrderBookUpdate,
    ChannelType::Bbo,
];

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct TradeEvent {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "t")]
    trade_id: u64,
    #[serde(rename = "p", with = "rust_decimal::serde::str")]
    price: Decimal,
    #[serde(rename = "q", with = "rust_decimal::serde::str")]
    quantity: Decimal,
    #[serde(rename = "T")]
    trade_time: i64,
    #[serde(rename = "m")]
    buyer_is_maker: bool,
}

#[derive(Debug, Deserialize)]
struct Level(
    #[serde(with = "rust_decimal::serde::str")] Decimal,
    #[serde(with = "rust_decimal::serde::str")] Decimal,
);

#[derive(Debug, Deserialize)]
struct DepthUpdateEvent {
    #[serde(rename = "E")]
    event_time: i64,
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "b")]
    bids: Vec<Level>,
    #[serde(rename = "a")]
    asks: Vec<Level>,
}

#[derive(Debug, Deserialize)]
struct BookTickerEvent {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "b", with = "rust_decimal::serde::str")]
    bid_price: Decimal,
    #[serde(rename = "B", with = "rust_decimal::serde::str")]
    bid_quantity: Decimal,
    #[serde(rename = "a", with = "rust_decimal::serde::str")]
    ask_price: Decimal,
    #[serde(rename = "A", with = "rust_decimal::serde::str")]
    ask_quantity: Decimal,
}

fn levels(levels: Vec<Level>) -> Result<Vec<OrderItem>, NormalizeError> {
    levels
        .into_iter()
        .map(|Level(price, quantity)| order_item(price, quantity))
        .collect()
}

// =============================================================================
// Adapter
// =============================================================================

/// Binance spot combined-stream adapter.
#[derive(Debug, Default, Clone, Copy)]
pub struct BinanceAdapter;

impl BinanceAdapter {
    fn parse_trade(frame: &RawFrame, info: &ExchangeInfo) -> Result<Msg, NormalizeError> {
        expect_event(&frame.payload, "e", "trade")?;
        let event: TradeEvent = serde_json::from_value(frame.payload.clone())?;
        let pair = resolve_symbol(info, &event.symbol)?;

        Ok(Msg::Trade(TradeMsg {
            meta: MsgMeta::new(
                BINANCE,
                &frame.topic,
                ChannelType::Trade,
                pair,
                event.trade_time,
                frame.raw.as_str(),
            ),
            price: event.price,
            quantity: event.quantity,
            side: !event.buyer_is_maker,
            trade_id: event.trade_id.to_string(),
        }))
    }

    fn parse_depth(frame: &RawFrame, info: &ExchangeInfo) -> Result<Msg, NormalizeError> {
        expect_event(&frame.payload, "e", "depthUpdate")?;
        let event: DepthUpdateEvent = serde_json::from_value(frame.payload.clone())?;
        let pair = resolve_symbol(info, &event.symbol)?;

        Ok(Msg::OrderBook(OrderBookMsg {
            meta: MsgMeta::new(
                BINANCE,
                &frame.topic,
                ChannelType::OrderBookUpdate,
                pair,
                event.event_time,
                frame.raw.as_str(),
            ),
            asks: levels(event.asks)?,
            bids: levels(event.bids)?,
            full: false,
        }))
    }

    fn parse_book_ticker(frame: &RawFrame, info: &ExchangeInfo) -> Result<Msg, NormalizeError> {
        // bookTicker has no event type field; the shape check is the
        // deserialization itself.
        let event: BookTickerEvent = serde_json::from_value(frame.payload.clone())?;
        let pair = resolve_symbol(info, &event.symbol)?;

        Ok(Msg::Bbo(BboMsg {
            meta: MsgMeta::new(
                BINANCE,
                &frame.topic,
                ChannelType::Bbo,
                pair,
                frame.received_at,
                frame.raw.as_str(),
            ),
            bid_price: event.bid_price,
            bid_quantity: event.bid_quantity,
            ask_price: event.ask_price,
            ask_quantity: event.ask_quantity,
        }))
    }
}

impl ExchangeAdapter for BinanceAdapter {
    fn name(&self) -> &'static str {
        BINANCE
    }

    fn supported_channels(&self) -> &'static [ChannelType] {
        SUPPORTED
    }

    fn connection_policy(&self) -> ConnectionPolicy {
        ConnectionPolicy::Multiplexed {
            max_topics_per_connection: MAX_STREAMS_PER_CONNECTION,
        }
    }

    fn resolve_channel(
        &self,
        channel_type: ChannelType,
        pair: &str,
        info: &ExchangeInfo,
    ) -> Result<String, ResolveError> {
        let pair = lookup_pair(BINANCE, pair, info)?;
        require_market(BINANCE, pair, MarketType::Spot)?;
        let symbol = pair.raw_pair.to_lowercase();
        let suffix = match channel_type {
            ChannelType::Trade => "trade",
            ChannelType::OrderBookUpdate => "depth",
            ChannelType::Bbo => "bookTicker",
        };
        Ok(format!("{symbol}@{suffix}"))
    }

    fn classify_topic(&self, topic: &str) -> Option<&'static [ChannelType]> {
        match topic.split('@').nth(1)? {
            "trade" => Some(&[ChannelType::Trade]),
            "depth" => Some(&[ChannelType::OrderBookUpdate]),
            "bookTicker" => Some(&[ChannelType::Bbo]),
            _ => None,
        }
    }

    fn subscription_plan(
        &self,
        endpoint: &str,
        subscriptions: &[Subscription],
    ) -> SubscriptionPlan {
        let streams = subscriptions
            .iter()
            .map(|s| s.topic.as_str())
            .collect::<Vec<_>>()
            .join("/");

        SubscriptionPlan {
            url: format!("{endpoint}/stream?streams={streams}"),
            handshakes: Vec::new(),
            await_ready: false,
        }
    }

    fn decode_text(&self, text: &str, received_at: i64) -> Result<WireEvent, NormalizeError> {
        let mut value: Value = serde_json::from_str(text)?;

        let stream = value.get("stream").and_then(Value::as_str).map(str::to_string);
        if let (Some(topic), Some(data)) = (stream, value.get_mut("data")) {
            return Ok(WireEvent::Data(RawFrame {
                topic,
                payload: data.take(),
                raw: text.to_string(),
                received_at,
            }));
        }

        // Replies to SUBSCRIBE/LIST_SUBSCRIPTIONS requests.
        if value.get("id").is_some() {
            return Ok(WireEvent::Ignore);
        }

        Err(NormalizeError::Envelope(format!(
            "expected combined stream frame, got: {}...",
            text.chars().take(50).collect::<String>()
        )))
    }

    fn parse_frame(
        &self,
        frame: &RawFrame,
        channel_types: &[ChannelType],
        info: &ExchangeInfo,
    ) -> Result<Vec<Msg>, NormalizeError> {
        let Some(&channel_type) = channel_types.first() else {
            return Ok(Vec::new());
        };

        let msg = match channel_type {
            ChannelType::Trade => Self::parse_trade(frame, info)?,
            ChannelType::OrderBookUpdate => Self::parse_depth(frame, info)?,
            ChannelType::Bbo => Self::parse_book_ticker(frame, info)?,
        };
        Ok(vec![msg])
    }

    fn max_session_age(&self) -> Option<Duration> {
        Some(MAX_SESSION_AGE)
    }
}
