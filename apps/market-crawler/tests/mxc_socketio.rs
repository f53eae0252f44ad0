//! MXC Socket.IO session against a local server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MockExchange, Recorder, ServerWs, eventually, fast_settings};
use futures_util::{SinkExt, StreamExt};
use market_crawler::infrastructure::connection::ConnectionState;
use market_crawler::{
    ChannelType, Crawler, ExchangeInfo, MarketType, Msg, PairInfo, StaticExchangeInfoProvider,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

const OPEN: &str = r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":60000}"#;

fn text(s: &str) -> Message {
    Message::Text(s.to_string().into())
}

async fn next_text(ws: &mut ServerWs) -> Option<String> {
    while let Some(Ok(msg)) = ws.next().await {
        if let Message::Text(t) = msg {
            return Some(t.as_str().to_string());
        }
    }
    None
}

fn push(symbol: &str) -> String {
    format!(
        r#"42["push.symbol",{{"symbol":"{symbol}","data":{{"deals":[{{"t":1588888888000,"p":"9000.1","q":"0.2","T":2}}],"asks":[{{"p":"9001","q":"1.5","a":"13501.5"}}],"bids":[]}}}}]"#
    )
}

fn crawler(server: &MockExchange) -> Crawler {
    let info = ExchangeInfo::new(
        "MXC",
        server.endpoint(),
        [
            PairInfo::new("BTC_USDT", "BTC_USDT", MarketType::Spot),
            PairInfo::new("ETH_USDT", "ETH_USDT", MarketType::Spot),
        ],
    );
    let provider = Arc::new(StaticExchangeInfoProvider::new().with(info));
    Crawler::new("MXC", provider, fast_settings(), CancellationToken::new()).unwrap()
}

#[tokio::test]
async fn subscribes_after_connect_and_normalizes_pushes() {
    let received: Arc<Mutex<Vec<String>>> = Arc::default();
    let log = Arc::clone(&received);
    let server = MockExchange::start(move |_, mut ws: ServerWs| {
        let log = Arc::clone(&log);
        async move {
            ws.send(text(OPEN)).await.unwrap();
            ws.send(text("40")).await.unwrap();

            let sub = next_text(&mut ws).await.unwrap();
            let symbol = if sub.contains("ETH_USDT") { "ETH_USDT" } else { "BTC_USDT" };
            log.lock().push(sub);

            ws.send(text(r#"42["rs.symbol","success"]"#)).await.unwrap();
            ws.send(text(&push(symbol))).await.unwrap();

            // Engine.IO ping from the server must be answered with a pong.
            ws.send(text("2")).await.unwrap();
            while let Some(reply) = next_text(&mut ws).await {
                log.lock().push(reply);
            }
        }
    })
    .await;

    let recorder = Recorder::default();
    let session = crawler(&server)
        .start(
            &[ChannelType::Trade, ChannelType::OrderBookUpdate],
            &["BTC_USDT".to_string(), "ETH_USDT".to_string()],
            recorder.handler(Duration::ZERO),
        )
        .await
        .unwrap();

    // One connection per pair, two messages (trade + book) per push.
    assert_eq!(session.statuses().len(), 2);
    assert!(eventually(Duration::from_secs(5), || recorder.len() == 4).await);
    assert!(eventually(Duration::from_secs(2), || received.lock().len() == 4).await);

    let mut subs: Vec<String> = received
        .lock()
        .iter()
        .filter(|m| m.starts_with("42"))
        .cloned()
        .collect();
    subs.sort();
    assert_eq!(
        subs,
        vec![
            r#"42["sub.symbol",{"symbol":"BTC_USDT"}]"#.to_string(),
            r#"42["sub.symbol",{"symbol":"ETH_USDT"}]"#.to_string(),
        ]
    );
    assert_eq!(received.lock().iter().filter(|m| *m == "3").count(), 2);

    for uri in server.uris() {
        assert_eq!(uri, "/socket.io/?EIO=3&transport=websocket");
    }

    let msgs = recorder.messages();
    let trades: Vec<_> = msgs
        .iter()
        .filter_map(|m| match m {
            Msg::Trade(t) => Some(t),
            _ => None,
        })
        .collect();
    assert_eq!(trades.len(), 2);
    for trade in trades {
        assert_eq!(trade.meta.exchange, "MXC");
        assert_eq!(trade.meta.channel, "sub.symbol");
        assert_eq!(trade.meta.timestamp, 1_588_888_888_000);
        assert_eq!(trade.price, "9000.1".parse::<Decimal>().unwrap());
        assert!(!trade.side);
    }

    let book = msgs
        .iter()
        .find_map(|m| match m {
            Msg::OrderBook(b) => Some(b),
            _ => None,
        })
        .unwrap();
    assert_eq!(book.asks.len(), 1);
    assert_eq!(book.asks[0].cost(), "13501.5".parse::<Decimal>().unwrap());
    assert!(book.bids.is_empty());

    for status in session.statuses() {
        assert_eq!(status.state(), ConnectionState::Active);
    }

    session.shutdown();
    session.wait().await;
}

#[tokio::test]
async fn disconnect_packet_triggers_reconnect() {
    let server = MockExchange::start(|index, mut ws: ServerWs| async move {
        ws.send(text(OPEN)).await.unwrap();
        ws.send(text("40")).await.unwrap();
        let _ = next_text(&mut ws).await;

        ws.send(text(&push("BTC_USDT"))).await.unwrap();
        if index == 0 {
            ws.send(text("41")).await.unwrap();
        }
        while next_text(&mut ws).await.is_some() {}
    })
    .await;

    let recorder = Recorder::default();
    let session = crawler(&server)
        .start(
            &[ChannelType::Trade],
            &["BTC_USDT".to_string()],
            recorder.handler(Duration::ZERO),
        )
        .await
        .unwrap();

    assert!(eventually(Duration::from_secs(5), || recorder.len() == 2).await);
    assert_eq!(server.sessions(), 2);
    assert_eq!(session.statuses()[0].reconnects(), 1);

    // Trade filter drops the book half of each push.
    assert!(recorder.messages().iter().all(|m| m.channel_type() == ChannelType::Trade));

    session.shutdown();
    session.wait().await;
}
