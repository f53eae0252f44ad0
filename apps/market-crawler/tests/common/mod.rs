//! Shared helpers for integration tests: a scripted local exchange server
//! and a recording message handler.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use market_crawler::{Msg, WebSocketSettings};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

/// Server side of one accepted session.
pub type ServerWs = WebSocketStream<TcpStream>;

/// Local WebSocket server that runs `script` for every accepted session.
pub struct MockExchange {
    pub addr: SocketAddr,
    uris: Arc<Mutex<Vec<String>>>,
    sessions: Arc<AtomicUsize>,
}

impl MockExchange {
    /// Bind to an ephemeral port. `script` gets the zero-based session index.
    pub async fn start<F, Fut>(script: F) -> Self
    where
        F: Fn(usize, ServerWs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let uris = Arc::new(Mutex::new(Vec::new()));
        let sessions = Arc::new(AtomicUsize::new(0));
        let script = Arc::new(script);

        let accept_uris = Arc::clone(&uris);
        let accept_sessions = Arc::clone(&sessions);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let uris = Arc::clone(&accept_uris);
                let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                    uris.lock().push(req.uri().to_string());
                    Ok(resp)
                };
                let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
                    continue;
                };
                let index = accept_sessions.fetch_add(1, Ordering::SeqCst);
                let script = Arc::clone(&script);
                tokio::spawn(async move { script(index, ws).await });
            }
        });

        Self {
            addr,
            uris,
            sessions,
        }
    }

    /// `ws://` endpoint for metadata documents.
    pub fn endpoint(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Request URIs (path and query) of every accepted session.
    pub fn uris(&self) -> Vec<String> {
        self.uris.lock().clone()
    }

    /// Sessions accepted so far.
    pub fn sessions(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }
}

/// Handler that records every message, optionally sleeping per message.
#[derive(Clone, Default)]
pub struct Recorder {
    seen: Arc<Mutex<Vec<Msg>>>,
}

impl Recorder {
    pub fn messages(&self) -> Vec<Msg> {
        self.seen.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    /// Handler closure; the first call sleeps for `first_delay`.
    pub fn handler(&self, first_delay: Duration) -> Arc<dyn market_crawler::MessageHandler> {
        let seen = Arc::clone(&self.seen);
        Arc::new(move |msg: Msg| {
            let seen = Arc::clone(&seen);
            async move {
                let first = seen.lock().is_empty();
                if first && !first_delay.is_zero() {
                    tokio::time::sleep(first_delay).await;
                }
                seen.lock().push(msg);
                anyhow::Ok(())
            }
        })
    }
}

/// Short timings so reconnect tests finish quickly.
pub fn fast_settings() -> WebSocketSettings {
    WebSocketSettings {
        heartbeat_interval: Duration::from_secs(5),
        heartbeat_timeout: Duration::from_secs(10),
        connect_timeout: Duration::from_secs(2),
        reconnect_delay_initial: Duration::from_millis(50),
        reconnect_delay_min: Duration::from_millis(20),
        reconnect_delay_max: Duration::from_millis(200),
        reconnect_delay_multiplier: 2.0,
    }
}

/// Poll `condition` every 10ms until it holds or `within` elapses.
pub async fn eventually(within: Duration, condition: impl Fn() -> bool) -> bool {
    tokio::time::timeout(within, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .is_ok()
}
