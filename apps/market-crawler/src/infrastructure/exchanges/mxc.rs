//! MXC Spot Adapter
//!
//! MXC streams over Socket.IO and accepts one pair per connection. A single
//! subscription event, `sub.symbol`, covers both trades and order book
//! updates; the server answers with `rs.symbol` and then pushes
//! `push.symbol` events:
//!
//! ```json
//! 42["push.symbol",{"symbol":"BTC_USDT","data":{
//!     "deals":[{"t":1588888888000,"p":"9000.1","q":"0.2","T":1}],
//!     "asks":[{"p":"9001","q":"1.5","a":"13501.5"}],
//!     "bids":[]}}]
//! ```
//!
//! A push may carry deals, book levels or both, so one frame can produce
//! several trade messages and one order book message.
//!
//! # Side
//!
//! Deals carry `T`: `1` is a buy (buyer-initiated), `2` a sell.
//!
//! # Timestamps
//!
//! Deals carry their own time `t`. Book updates have none; ingestion time
//! is used.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};

use super::socketio::{self, Packet};
use super::wire::{order_item, resolve_symbol};
use crate::application::ports::{
    ConnectionPolicy, ExchangeAdapter, Keepalive, NormalizeError, RawFrame, ResolveError,
    Subscription, SubscriptionPlan, WireEvent, lookup_pair, require_market,
};
use crate::domain::{
    ChannelType, ExchangeInfo, MarketType, Msg, MsgMeta, OrderBookMsg, OrderItem, PairInfo,
    TradeMsg,
};

/// Exchange name.
pub const MXC: &str = "MXC";

const SUBSCRIBE_TOPIC: &str = "sub.symbol";
const PUSH_EVENT: &str = "push.symbol";

const SUPPORTED: &[ChannelType] = &[ChannelType::Trade, ChannelType::OrderBookUpdate];

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct SymbolPush {
    symbol: String,
    data: SymbolData,
}

#[derive(Debug, Default, Deserialize)]
struct SymbolData {
    #[serde(default)]
    deals: Option<Vec<Value>>,
    #[serde(default)]
    asks: Option<Vec<BookLevel>>,
    #[serde(default)]
    bids: Option<Vec<BookLevel>>,
}

#[derive(Debug, Deserialize)]
struct Deal {
    #[serde(rename = "t")]
    time: i64,
    #[serde(rename = "p", with = "rust_decimal::serde::str")]
    price: Decimal,
    #[serde(rename = "q", with = "rust_decimal::serde::str")]
    quantity: Decimal,
    #[serde(rename = "T")]
    trade_type: u8,
}

/// `a` (amount) is ignored; cost is recomputed from price and quantity.
#[derive(Debug, Deserialize)]
struct BookLevel {
    #[serde(rename = "p", with = "rust_decimal::serde::str")]
    price: Decimal,
    #[serde(rename = "q", with = "rust_decimal::serde::str")]
    quantity: Decimal,
}

fn is_buy(trade_type: u8) -> Result<bool, NormalizeError> {
    match trade_type {
        1 => Ok(true),
        2 => Ok(false),
        other => Err(NormalizeError::InvalidNumber {
            field: "T",
            value: other.to_string(),
        }),
    }
}

fn levels(levels: Option<Vec<BookLevel>>) -> Result<Vec<OrderItem>, NormalizeError> {
    levels
        .unwrap_or_default()
        .into_iter()
        .map(|level| order_item(level.price, level.quantity))
        .collect()
}

// =============================================================================
// Adapter
// =============================================================================

/// MXC Socket.IO adapter.
#[derive(Debug, Default, Clone, Copy)]
pub struct MxcAdapter;

impl MxcAdapter {
    fn parse_deals(
        deals: Vec<Value>,
        pair: &PairInfo,
        out: &mut Vec<Msg>,
    ) -> Result<(), NormalizeError> {
        for raw in deals {
            let deal: Deal = serde_json::from_value(raw.clone())?;
            out.push(Msg::Trade(TradeMsg {
                meta: MsgMeta::new(
                    MXC,
                    SUBSCRIBE_TOPIC,
                    ChannelType::Trade,
                    pair,
                    deal.time,
                    raw.to_string(),
                ),
                price: deal.price,
                quantity: deal.quantity,
                side: is_buy(deal.trade_type)?,
                // MXC publishes no trade id.
                trade_id: String::new(),
            }));
        }
        Ok(())
    }
}

impl ExchangeAdapter for MxcAdapter {
    fn name(&self) -> &'static str {
        MXC
    }

    fn supported_channels(&self) -> &'static [ChannelType] {
        SUPPORTED
    }

    fn connection_policy(&self) -> ConnectionPolicy {
        ConnectionPolicy::PerPair
    }

    fn resolve_channel(
        &self,
        channel_type: ChannelType,
        pair: &str,
        info: &ExchangeInfo,
    ) -> Result<String, ResolveError> {
        if !SUPPORTED.contains(&channel_type) {
            return Err(ResolveError::UnsupportedChannel {
                exchange: MXC.to_string(),
                channel: channel_type,
            });
        }
        let pair = lookup_pair(MXC, pair, info)?;
        require_market(MXC, pair, MarketType::Spot)?;
        Ok(SUBSCRIBE_TOPIC.to_string())
    }

    fn classify_topic(&self, topic: &str) -> Option<&'static [ChannelType]> {
        match topic {
            SUBSCRIBE_TOPIC | PUSH_EVENT => Some(SUPPORTED),
            _ => None,
        }
    }

    fn subscription_plan(
        &self,
        endpoint: &str,
        subscriptions: &[Subscription],
    ) -> SubscriptionPlan {
        let mut sent: Vec<(&str, &str)> = Vec::new();
        let mut handshakes = Vec::new();
        for sub in subscriptions {
            let key = (sub.topic.as_str(), sub.pair.raw_pair.as_str());
            if sent.contains(&key) {
                continue;
            }
            sent.push(key);
            handshakes.push(socketio::encode_event(
                &sub.topic,
                &json!({ "symbol": sub.pair.raw_pair }),
            ));
        }

        SubscriptionPlan {
            url: format!("{endpoint}/socket.io/?EIO=3&transport=websocket"),
            handshakes,
            await_ready: true,
        }
    }

    fn decode_text(&self, text: &str, received_at: i64) -> Result<WireEvent, NormalizeError> {
        Ok(match socketio::decode(text)? {
            Packet::Connect => WireEvent::Ready,
            Packet::Ping => WireEvent::Reply(socketio::PONG.to_string()),
            Packet::Close | Packet::Disconnect => WireEvent::Close,
            Packet::Event { name, .. } if name.starts_with("rs.") => WireEvent::Ignore,
            Packet::Event { name, args } => WireEvent::Data(RawFrame {
                topic: name,
                payload: args,
                raw: text.to_string(),
                received_at,
            }),
            Packet::Open(_) | Packet::Pong | Packet::Noop | Packet::Other(_) => WireEvent::Ignore,
        })
    }

    fn parse_frame(
        &self,
        frame: &RawFrame,
        channel_types: &[ChannelType],
        info: &ExchangeInfo,
    ) -> Result<Vec<Msg>, NormalizeError> {
        if frame.topic != PUSH_EVENT {
            return Err(NormalizeError::UnexpectedEvent {
                expected: PUSH_EVENT,
                actual: frame.topic.clone(),
            });
        }

        let push: SymbolPush = serde_json::from_value(frame.payload.clone())?;
        let pair = resolve_symbol(info, &push.symbol)?;
        let SymbolData { deals, asks, bids } = push.data;

        let mut out = Vec::new();

        if channel_types.contains(&ChannelType::Trade)
            && let Some(deals) = deals
        {
            Self::parse_deals(deals, pair, &mut out)?;
        }

        if channel_types.contains(&ChannelType::OrderBookUpdate)
            && (asks.is_some() || bids.is_some())
        {
            out.push(Msg::OrderBook(OrderBookMsg {
                meta: MsgMeta::new(
                    MXC,
                    SUBSCRIBE_TOPIC,
                    ChannelType::OrderBookUpdate,
                    pair,
                    frame.received_at,
                    frame.raw.as_str(),
                ),
                asks: levels(asks)?,
                bids: levels(bids)?,
                full: false,
            }));
        }

        Ok(out)
    }

    fn keepalive(&self) -> Keepalive {
        Keepalive::Text(socketio::PING)
    }
}
