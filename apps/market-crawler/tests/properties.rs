//! Property tests over the exchange adapters.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeSet;

use market_crawler::application::ports::{ExchangeAdapter, RawFrame};
use market_crawler::infrastructure::exchanges::{BinanceAdapter, MxcAdapter};
use market_crawler::{ChannelType, ExchangeInfo, MarketType, Msg, PairInfo};
use proptest::prelude::*;
use rust_decimal::Decimal;
use serde_json::json;

fn pair_set() -> impl Strategy<Value = BTreeSet<(String, &'static str)>> {
    prop::collection::btree_set(
        ("[A-Z]{2,6}", prop::sample::select(vec!["USDT", "BTC", "ETH"])),
        1..20,
    )
}

fn decimal() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000_000_000, 0u32..=8).prop_map(|(mantissa, scale)| Decimal::new(mantissa, scale))
}

fn frame(topic: &str, payload: serde_json::Value) -> RawFrame {
    RawFrame {
        topic: topic.to_string(),
        raw: payload.to_string(),
        payload,
        received_at: 1,
    }
}

proptest! {
    #[test]
    fn binance_symbols_round_trip(pairs in pair_set()) {
        let info = ExchangeInfo::new(
            "Binance",
            "wss://stream.binance.com:9443",
            pairs.iter().map(|(base, quote)| {
                PairInfo::new(format!("{base}_{quote}"), format!("{base}{quote}"), MarketType::Spot)
            }),
        );

        for (base, quote) in &pairs {
            let normalized = format!("{base}_{quote}");
            let raw = format!("{base}{quote}");

            for &channel in BinanceAdapter.supported_channels() {
                let topic = BinanceAdapter.resolve_channel(channel, &normalized, &info).unwrap();
                let expected_prefix = format!("{}@", raw.to_lowercase());
                prop_assert!(topic.starts_with(&expected_prefix));
                prop_assert_eq!(BinanceAdapter.classify_topic(&topic), Some(&[channel][..]));
            }

            let topic = BinanceAdapter
                .resolve_channel(ChannelType::Trade, &normalized, &info)
                .unwrap();

            let payload = json!({
                "e": "trade", "E": 1, "s": raw, "t": 7, "p": "1.5", "q": "2", "T": 10, "m": true
            });
            let msgs = BinanceAdapter
                .parse_frame(&frame(&topic, payload), &[ChannelType::Trade], &info)
                .unwrap();

            prop_assert_eq!(msgs.len(), 1);
            prop_assert_eq!(msgs[0].pair(), normalized.as_str());
            prop_assert_eq!(&msgs[0].meta().raw_pair, &raw);
        }
    }

    #[test]
    fn mxc_symbols_round_trip(pairs in pair_set()) {
        let info = ExchangeInfo::new(
            "MXC",
            "wss://wbs.mxc.com",
            pairs.iter().map(|(base, quote)| {
                let name = format!("{base}_{quote}");
                PairInfo::new(name.clone(), name, MarketType::Spot)
            }),
        );

        for (base, quote) in &pairs {
            let normalized = format!("{base}_{quote}");
            for &channel in MxcAdapter.supported_channels() {
                let topic = MxcAdapter.resolve_channel(channel, &normalized, &info).unwrap();
                let carried = MxcAdapter.classify_topic(&topic).unwrap();
                prop_assert!(carried.contains(&channel));
            }

            let payload = json!({
                "symbol": normalized,
                "data": {"deals": [{"t": 5, "p": "3", "q": "4", "T": 1}]}
            });
            let msgs = MxcAdapter
                .parse_frame(&frame("push.symbol", payload), &[ChannelType::Trade], &info)
                .unwrap();

            prop_assert_eq!(msgs.len(), 1);
            prop_assert_eq!(msgs[0].pair(), normalized.as_str());
        }
    }

    #[test]
    fn binance_level_cost_is_exact(price in decimal(), quantity in decimal()) {
        let info = ExchangeInfo::new(
            "Binance",
            "wss://stream.binance.com:9443",
            [PairInfo::new("BTC_USDT", "BTCUSDT", MarketType::Spot)],
        );
        let payload = json!({
            "e": "depthUpdate", "E": 42, "s": "BTCUSDT", "U": 1, "u": 2,
            "b": [[price.to_string(), quantity.to_string()]],
            "a": []
        });

        let msgs = BinanceAdapter
            .parse_frame(&frame("btcusdt@depth", payload), &[ChannelType::OrderBookUpdate], &info)
            .unwrap();
        let Msg::OrderBook(book) = &msgs[0] else {
            return Err(TestCaseError::fail("expected order book"));
        };

        prop_assert_eq!(book.bids[0].price(), price);
        prop_assert_eq!(book.bids[0].quantity(), quantity);
        prop_assert_eq!(book.bids[0].cost(), price * quantity);
    }

    #[test]
    fn mxc_level_cost_ignores_reported_amount(price in decimal(), quantity in decimal()) {
        let info = ExchangeInfo::new(
            "MXC",
            "wss://wbs.mxc.com",
            [PairInfo::new("BTC_USDT", "BTC_USDT", MarketType::Spot)],
        );
        let payload = json!({
            "symbol": "BTC_USDT",
            "data": {"asks": [{"p": price.to_string(), "q": quantity.to_string(), "a": "0"}]}
        });

        let msgs = MxcAdapter
            .parse_frame(&frame("push.symbol", payload), &[ChannelType::OrderBookUpdate], &info)
            .unwrap();
        let Msg::OrderBook(book) = &msgs[0] else {
            return Err(TestCaseError::fail("expected order book"));
        };

        prop_assert_eq!(book.asks[0].cost(), price * quantity);
    }
}
