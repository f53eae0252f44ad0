//! Exchange adapter port.
//!
//! One implementation per exchange, selected from a static registry at crawl
//! start. The adapter owns everything exchange-specific: topic syntax,
//! subscription handshake, transport envelope and payload schema. The
//! connection manager and normalizer are written once against this trait.

use std::time::Duration;

use crate::domain::{ChannelType, ExchangeInfo, MarketType, Msg, PairInfo};

/// How an exchange lets subscriptions share connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPolicy {
    /// All topics share combined connections, up to a per-connection cap.
    Multiplexed {
        /// Maximum number of topics carried by one connection.
        max_topics_per_connection: usize,
    },
    /// One connection per pair.
    PerPair,
}

/// Keepalive frame sent on every heartbeat tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keepalive {
    /// WebSocket ping control frame.
    Ping,
    /// Application-level text frame.
    Text(&'static str),
}

/// A resolved subscription: one channel of one pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Channel category.
    pub channel_type: ChannelType,
    /// Pair being subscribed.
    pub pair: PairInfo,
    /// Wire topic for this channel and pair.
    pub topic: String,
}

/// What a connection does to establish its subscriptions.
///
/// The same plan is replayed verbatim after every reconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionPlan {
    /// URL to connect to.
    pub url: String,
    /// Text frames to send, in order, once the session is ready.
    pub handshakes: Vec<String>,
    /// Whether to wait for [`WireEvent::Ready`] before sending handshakes.
    pub await_ready: bool,
}

/// A data frame extracted from the transport envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    /// Wire topic (stream name or event name).
    pub topic: String,
    /// Payload inside the envelope.
    pub payload: serde_json::Value,
    /// Full text frame as received.
    pub raw: String,
    /// Ingestion time in milliseconds since the Unix epoch.
    pub received_at: i64,
}

/// Result of decoding one inbound text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum WireEvent {
    /// Market data to normalize.
    Data(RawFrame),
    /// Session is ready for subscription handshakes.
    Ready,
    /// Protocol-level reply that must be sent back.
    Reply(String),
    /// The server ended the session at protocol level.
    Close,
    /// Control traffic with nothing to do.
    Ignore,
}

/// Errors resolving a subscription at crawl start.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The exchange has no mapping for this channel type.
    #[error("channel type {channel} is not supported by {exchange}")]
    UnsupportedChannel {
        /// Exchange name.
        exchange: String,
        /// Requested channel type.
        channel: ChannelType,
    },

    /// The pair is not in the metadata snapshot.
    #[error("pair {pair} is not listed on {exchange}")]
    UnknownPair {
        /// Exchange name.
        exchange: String,
        /// Requested normalized pair.
        pair: String,
    },

    /// The exchange does not stream this market type.
    #[error("{exchange} does not stream {market_type} pair {pair}")]
    UnsupportedMarket {
        /// Exchange name.
        exchange: String,
        /// Normalized pair.
        pair: String,
        /// Market type of the pair.
        market_type: &'static str,
    },
}

/// Reasons a frame is dropped by normalization.
///
/// All of these are frame-local: the frame is discarded with a warning and
/// the connection keeps going.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// No channel type maps to this topic.
    #[error("unrecognized topic: {0}")]
    UnknownTopic(String),

    /// The payload's event discriminator does not match its topic.
    #[error("unexpected event type: expected {expected}, got {actual}")]
    UnexpectedEvent {
        /// Expected discriminator.
        expected: &'static str,
        /// Discriminator found in the payload.
        actual: String,
    },

    /// The payload does not have the expected shape.
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The transport envelope is not recognized.
    #[error("malformed envelope: {0}")]
    Envelope(String),

    /// A numeric field is not a usable decimal.
    #[error("invalid number in field {field}: {value}")]
    InvalidNumber {
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: String,
    },

    /// The raw symbol is absent from the metadata snapshot.
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),
}

impl NormalizeError {
    /// Short label for metrics.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::UnknownTopic(_) => "unknown_topic",
            Self::UnexpectedEvent { .. } => "unexpected_event",
            Self::Malformed(_) => "malformed",
            Self::Envelope(_) => "envelope",
            Self::InvalidNumber { .. } => "invalid_number",
            Self::UnknownSymbol(_) => "unknown_symbol",
        }
    }
}

/// Per-exchange protocol adapter.
pub trait ExchangeAdapter: Send + Sync + std::fmt::Debug {
    /// Exchange name used for the registry and in canonical messages.
    fn name(&self) -> &'static str;

    /// Channel types this exchange can stream.
    fn supported_channels(&self) -> &'static [ChannelType];

    /// Connection topology.
    fn connection_policy(&self) -> ConnectionPolicy;

    /// Map a channel type and normalized pair to the wire topic.
    ///
    /// # Errors
    ///
    /// Fails for unsupported channel types, unknown pairs and market types
    /// the exchange does not stream.
    fn resolve_channel(
        &self,
        channel_type: ChannelType,
        pair: &str,
        info: &ExchangeInfo,
    ) -> Result<String, ResolveError>;

    /// Map a wire topic back to the channel types it may carry.
    ///
    /// Returns more than one type when the exchange reuses one topic for
    /// several categories; payload shape then decides.
    fn classify_topic(&self, topic: &str) -> Option<&'static [ChannelType]>;

    /// Build the connection URL and handshakes for one connection.
    fn subscription_plan(&self, endpoint: &str, subscriptions: &[Subscription])
    -> SubscriptionPlan;

    /// Decode the transport envelope of one inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::Envelope`] or [`NormalizeError::Malformed`]
    /// when the frame cannot be decoded.
    fn decode_text(&self, text: &str, received_at: i64) -> Result<WireEvent, NormalizeError>;

    /// Build canonical messages from a data frame.
    ///
    /// `channel_types` is the non-empty set of requested categories the
    /// frame's topic can carry.
    ///
    /// # Errors
    ///
    /// Returns a [`NormalizeError`] when the frame must be dropped.
    fn parse_frame(
        &self,
        frame: &RawFrame,
        channel_types: &[ChannelType],
        info: &ExchangeInfo,
    ) -> Result<Vec<Msg>, NormalizeError>;

    /// Keepalive sent on heartbeat ticks.
    fn keepalive(&self) -> Keepalive {
        Keepalive::Ping
    }

    /// Maximum session age before a proactive reconnect.
    fn max_session_age(&self) -> Option<Duration> {
        None
    }
}

/// Look up `pair` in the snapshot or fail with [`ResolveError::UnknownPair`].
///
/// # Errors
///
/// Fails when the pair is not listed.
pub fn lookup_pair<'a>(
    exchange: &str,
    pair: &str,
    info: &'a ExchangeInfo,
) -> Result<&'a PairInfo, ResolveError> {
    info.pair(pair).ok_or_else(|| ResolveError::UnknownPair {
        exchange: exchange.to_string(),
        pair: pair.to_string(),
    })
}

/// Reject pairs whose market type is not `market_type`.
///
/// # Errors
///
/// Fails with [`ResolveError::UnsupportedMarket`].
pub fn require_market(
    exchange: &str,
    pair: &PairInfo,
    market_type: MarketType,
) -> Result<(), ResolveError> {
    if pair.market_type == market_type {
        Ok(())
    } else {
        Err(ResolveError::UnsupportedMarket {
            exchange: exchange.to_string(),
            pair: pair.normalized_pair.clone(),
            market_type: pair.market_type.as_str(),
        })
    }
}
