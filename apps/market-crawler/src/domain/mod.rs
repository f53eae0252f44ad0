//! Domain Layer - Canonical market data and exchange metadata types.
//!
//! Pure data types with serialization support. Nothing here performs I/O.

/// Abstract channel categories.
pub mod channel;

/// Exchange metadata snapshot (endpoint, pairs).
pub mod exchange;

/// Canonical messages (trades, order book updates, BBO).
pub mod message;

pub use channel::{ChannelType, ParseChannelTypeError};
pub use exchange::{ExchangeInfo, MarketType, PairInfo};
pub use message::{BboMsg, Msg, MsgMeta, OrderBookMsg, OrderItem, TradeMsg};
