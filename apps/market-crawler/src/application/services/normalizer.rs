//! Message Normalizer
//!
//! Turns one decoded frame into zero or more canonical messages for a single
//! exchange. Pure apart from the read-only metadata lookup; drop logging is
//! left to the caller.

use std::sync::Arc;

use crate::application::ports::{ExchangeAdapter, NormalizeError, RawFrame};
use crate::domain::{ChannelType, ExchangeInfo, Msg};

/// Per-crawl normalizer bound to one exchange and its metadata snapshot.
#[derive(Debug, Clone)]
pub struct MessageNormalizer {
    adapter: Arc<dyn ExchangeAdapter>,
    info: Arc<ExchangeInfo>,
    channel_types: Vec<ChannelType>,
}

impl MessageNormalizer {
    /// Create a normalizer emitting only `channel_types`.
    #[must_use]
    pub fn new(
        adapter: Arc<dyn ExchangeAdapter>,
        info: Arc<ExchangeInfo>,
        channel_types: Vec<ChannelType>,
    ) -> Self {
        Self {
            adapter,
            info,
            channel_types,
        }
    }

    /// Exchange this normalizer serves.
    #[must_use]
    pub fn exchange(&self) -> &'static str {
        self.adapter.name()
    }

    /// Normalize one frame.
    ///
    /// A frame whose topic only carries categories that were not requested
    /// yields no messages.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::UnknownTopic`] for unclassifiable topics and
    /// whatever the adapter reports for payloads it cannot accept.
    pub fn normalize(&self, frame: &RawFrame) -> Result<Vec<Msg>, NormalizeError> {
        let candidates = self
            .adapter
            .classify_topic(&frame.topic)
            .ok_or_else(|| NormalizeError::UnknownTopic(frame.topic.clone()))?;

        let wanted: Vec<ChannelType> = candidates
            .iter()
            .copied()
            .filter(|c| self.channel_types.contains(c))
            .collect();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        self.adapter.parse_frame(frame, &wanted, &self.info)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::application::ports::{
        ConnectionPolicy, ResolveError, Subscription, SubscriptionPlan, WireEvent,
    };
    use crate::domain::{MarketType, MsgMeta, PairInfo, TradeMsg};

    /// Topic `t` carries trades, `b` carries both trades and books.
    #[derive(Debug)]
    struct StubAdapter;

    impl ExchangeAdapter for StubAdapter {
        fn name(&self) -> &'static str {
            "Stub"
        }

        fn supported_channels(&self) -> &'static [ChannelType] {
            &[ChannelType::Trade, ChannelType::OrderBookUpdate]
        }

        fn connection_policy(&self) -> ConnectionPolicy {
            ConnectionPolicy::PerPair
        }

        fn resolve_channel(
            &self,
            _: ChannelType,
            _: &str,
            _: &ExchangeInfo,
        ) -> Result<String, ResolveError> {
            Ok("t".to_string())
        }

        fn classify_topic(&self, topic: &str) -> Option<&'static [ChannelType]> {
            match topic {
                "t" => Some(&[ChannelType::Trade]),
                "b" => Some(&[ChannelType::Trade, ChannelType::OrderBookUpdate]),
                _ => None,
            }
        }

        fn subscription_plan(&self, _: &str, _: &[Subscription]) -> SubscriptionPlan {
            SubscriptionPlan {
                url: String::new(),
                handshakes: Vec::new(),
                await_ready: false,
            }
        }

        fn decode_text(&self, _: &str, _: i64) -> Result<WireEvent, NormalizeError> {
            Ok(WireEvent::Ignore)
        }

        fn parse_frame(
            &self,
            frame: &RawFrame,
            channel_types: &[ChannelType],
            info: &ExchangeInfo,
        ) -> Result<Vec<Msg>, NormalizeError> {
            let symbol = frame.payload["s"].as_str().unwrap_or_default();
            let pair = info
                .resolve_raw(symbol)
                .ok_or_else(|| NormalizeError::UnknownSymbol(symbol.to_string()))?;
            Ok(channel_types
                .iter()
                .map(|ct| {
                    Msg::Trade(TradeMsg {
                        meta: MsgMeta::new("Stub", &frame.topic, *ct, pair, 1, "{}"),
                        price: rust_decimal::Decimal::ONE,
                        quantity: rust_decimal::Decimal::ONE,
                        side: true,
                        trade_id: String::new(),
                    })
                })
                .collect())
        }
    }

    fn normalizer(channel_types: Vec<ChannelType>) -> MessageNormalizer {
        let info = ExchangeInfo::new(
            "Stub",
            "wss://stub",
            [PairInfo::new("BTC_USDT", "BTCUSDT", MarketType::Spot)],
        );
        MessageNormalizer::new(Arc::new(StubAdapter), Arc::new(info), channel_types)
    }

    fn frame(topic: &str, symbol: &str) -> RawFrame {
        RawFrame {
            topic: topic.to_string(),
            payload: json!({ "s": symbol }),
            raw: String::new(),
            received_at: 0,
        }
    }

    #[test]
    fn unknown_topic() {
        let err = normalizer(vec![ChannelType::Trade])
            .normalize(&frame("x", "BTCUSDT"))
            .unwrap_err();
        assert!(matches!(err, NormalizeError::UnknownTopic(ref t) if t == "x"));
    }

    #[test]
    fn passes_only_requested_types() {
        let msgs = normalizer(vec![ChannelType::OrderBookUpdate])
            .normalize(&frame("b", "BTCUSDT"))
            .unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].channel_type(), ChannelType::OrderBookUpdate);
    }

    #[test]
    fn unrequested_topic_yields_nothing() {
        let msgs = normalizer(vec![ChannelType::OrderBookUpdate])
            .normalize(&frame("t", "BTCUSDT"))
            .unwrap();
        assert!(msgs.is_empty());
    }

    #[test]
    fn unknown_symbol_propagates() {
        let err = normalizer(vec![ChannelType::Trade])
            .normalize(&frame("t", "DOGEUSDT"))
            .unwrap_err();
        assert_eq!(err.reason(), "unknown_symbol");
    }
}
