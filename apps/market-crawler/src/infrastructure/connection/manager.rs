//! Connection Manager
//!
//! Owns one WebSocket session to an exchange: connect, send the adapter's
//! subscription plan, feed text frames through the normalizer and
//! dispatcher, keep the session alive and reconnect whenever it drops.
//!
//! # Ordering
//!
//! The read loop races shutdown, keepalive and session rotation against
//! *reading* the next frame only. Once a frame is read it is normalized and
//! every resulting message is handed to the consumer and awaited before the
//! loop reads again, so messages of one connection are delivered strictly in
//! arrival order and an in-flight handler call is never interrupted.
//!
//! # Reconnection
//!
//! Any close not requested through the cancellation token (close frame,
//! stream end, transport error, heartbeat timeout, session age limit) leads
//! to `Reconnecting`, a backoff delay and a fresh session with the same
//! subscription plan. Backoff resets once a session delivers data.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use super::reconnect::{ReconnectConfig, ReconnectPolicy};
use super::status::{ConnectionState, ConnectionStatus};
use crate::application::ports::{
    ExchangeAdapter, Keepalive, NormalizeError, SubscriptionPlan, WireEvent,
};
use crate::application::services::dispatcher::{Dispatcher, Outcome};
use crate::application::services::normalizer::MessageNormalizer;
use crate::domain::Msg;
use crate::infrastructure::config::WebSocketSettings;
use crate::infrastructure::metrics::{self, FailureKind};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

// =============================================================================
// Error Type
// =============================================================================

/// Reasons a session ended without being asked to.
///
/// Always recovered by reconnecting; never surfaced to the consumer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Server closed the session.
    #[error("connection closed by server: {0}")]
    ClosedByServer(String),

    /// Handshake did not complete in time.
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Stream ended without a close frame.
    #[error("WebSocket stream ended")]
    StreamEnded,

    /// No inbound traffic within the heartbeat timeout.
    #[error("no inbound traffic for {0:?}")]
    HeartbeatTimeout(Duration),

    /// Session reached its maximum age.
    #[error("session age limit of {0:?} reached")]
    SessionExpired(Duration),
}

// =============================================================================
// Configuration
// =============================================================================

/// Per-connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// URL and handshakes, replayed on every reconnect.
    pub plan: SubscriptionPlan,
    /// Reconnection backoff.
    pub reconnect: ReconnectConfig,
    /// Keepalive interval.
    pub heartbeat_interval: Duration,
    /// Inbound silence tolerated before the session is dropped.
    pub heartbeat_timeout: Duration,
    /// Limit on one connect attempt.
    pub connect_timeout: Duration,
}

impl ConnectionConfig {
    /// Build from the plan and websocket settings.
    #[must_use]
    pub const fn new(plan: SubscriptionPlan, settings: &WebSocketSettings) -> Self {
        Self {
            plan,
            reconnect: ReconnectConfig::from_websocket_settings(settings),
            heartbeat_interval: settings.heartbeat_interval,
            heartbeat_timeout: settings.heartbeat_timeout,
            connect_timeout: settings.connect_timeout,
        }
    }
}

// =============================================================================
// Connection Manager
// =============================================================================

/// One exchange connection and its reconnect loop.
#[derive(Debug)]
pub struct ConnectionManager {
    config: ConnectionConfig,
    adapter: Arc<dyn ExchangeAdapter>,
    normalizer: MessageNormalizer,
    dispatcher: Dispatcher,
    status: Arc<ConnectionStatus>,
    cancel: CancellationToken,
}

/// Per-session flags.
#[derive(Debug, Default)]
struct Session {
    subscribed: bool,
    active: bool,
}

impl ConnectionManager {
    /// Create a connection manager.
    #[must_use]
    pub fn new(
        config: ConnectionConfig,
        adapter: Arc<dyn ExchangeAdapter>,
        normalizer: MessageNormalizer,
        dispatcher: Dispatcher,
        status: Arc<ConnectionStatus>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            adapter,
            normalizer,
            dispatcher,
            status,
            cancel,
        }
    }

    /// Shared status of this connection.
    #[must_use]
    pub fn status(&self) -> Arc<ConnectionStatus> {
        Arc::clone(&self.status)
    }

    /// Run until cancelled, reconnecting as needed.
    pub async fn run(self) {
        let mut policy = ReconnectPolicy::new(self.config.reconnect.clone());
        let exchange = self.adapter.name();
        let connection = self.status.id();

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            self.status.set_state(ConnectionState::Connecting);

            match self.connect_and_run(&mut policy).await {
                Ok(()) => break,
                Err(e) => {
                    if matches!(e, TransportError::SessionExpired(_)) {
                        tracing::info!(exchange, connection, "Rotating session");
                    } else {
                        tracing::warn!(exchange, connection, error = %e, "Connection dropped");
                    }

                    self.status.set_error(e.to_string());
                    self.status.set_state(ConnectionState::Reconnecting);
                    self.status.record_reconnect();
                    metrics::record_reconnect(exchange);

                    let delay = policy.next_delay();
                    tracing::info!(
                        exchange,
                        connection,
                        attempt = policy.attempt_count(),
                        delay_ms = delay.as_millis(),
                        "Reconnecting"
                    );

                    tokio::select! {
                        () = self.cancel.cancelled() => break,
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        self.status.set_state(ConnectionState::Closed);
        tracing::info!(exchange, connection, "Connection closed");
    }

    /// Connect and run one session. `Ok` means shutdown was requested.
    async fn connect_and_run(&self, policy: &mut ReconnectPolicy) -> Result<(), TransportError> {
        let exchange = self.adapter.name();
        tracing::info!(
            exchange,
            connection = self.status.id(),
            url = %self.config.plan.url,
            "Connecting"
        );

        let connect = tokio::time::timeout(
            self.config.connect_timeout,
            tokio_tungstenite::connect_async(self.config.plan.url.as_str()),
        );
        let (ws, _response) = tokio::select! {
            () = self.cancel.cancelled() => return Ok(()),
            result = connect => result
                .map_err(|_| TransportError::ConnectTimeout(self.config.connect_timeout))??,
        };

        metrics::connection_opened(exchange);
        let result = self.run_session(ws, policy).await;
        metrics::connection_closed(exchange);
        result
    }

    async fn run_session(
        &self,
        ws: WsStream,
        policy: &mut ReconnectPolicy,
    ) -> Result<(), TransportError> {
        let (mut write, mut read) = ws.split();
        let mut session = Session::default();

        if !self.config.plan.await_ready {
            self.subscribe(&mut write, &mut session).await?;
        }

        let interval = self.config.heartbeat_interval.max(Duration::from_millis(1));
        let mut heartbeat = tokio::time::interval_at(Instant::now() + interval, interval);
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut last_inbound = Instant::now();

        let max_age = self.adapter.max_session_age();
        let expiry = async {
            match max_age {
                Some(age) => tokio::time::sleep(age).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(expiry);

        loop {
            let frame = tokio::select! {
                () = self.cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }
                () = &mut expiry => {
                    let _ = write.send(Message::Close(None)).await;
                    return Err(TransportError::SessionExpired(max_age.unwrap_or_default()));
                }
                _ = heartbeat.tick() => {
                    let silence = last_inbound.elapsed();
                    if silence >= self.config.heartbeat_timeout {
                        return Err(TransportError::HeartbeatTimeout(silence));
                    }
                    let keepalive = match self.adapter.keepalive() {
                        Keepalive::Ping => Message::Ping(Vec::new().into()),
                        Keepalive::Text(text) => Message::Text(text.to_string().into()),
                    };
                    write.send(keepalive).await?;
                    continue;
                }
                frame = read.next() => frame,
            };

            match frame {
                Some(Ok(Message::Text(text))) => {
                    self.handle_text(&text, &mut write, &mut session, policy)
                        .await?;
                }
                Some(Ok(Message::Ping(data))) => {
                    write.send(Message::Pong(data)).await?;
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map_or_else(
                        || "no close frame".to_string(),
                        |f| format!("{} {}", u16::from(f.code), f.reason.as_str()),
                    );
                    return Err(TransportError::ClosedByServer(reason));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Err(TransportError::StreamEnded),
            }

            // Silence is measured from here so handler time never counts.
            last_inbound = Instant::now();
        }
    }

    async fn subscribe(
        &self,
        write: &mut WsSink,
        session: &mut Session,
    ) -> Result<(), TransportError> {
        for handshake in &self.config.plan.handshakes {
            tracing::debug!(
                exchange = self.adapter.name(),
                connection = self.status.id(),
                handshake = %handshake,
                "Sending subscription"
            );
            write.send(Message::Text(handshake.clone().into())).await?;
        }

        session.subscribed = true;
        self.status.set_state(ConnectionState::Subscribed);
        Ok(())
    }

    async fn handle_text(
        &self,
        text: &str,
        write: &mut WsSink,
        session: &mut Session,
        policy: &mut ReconnectPolicy,
    ) -> Result<(), TransportError> {
        let exchange = self.adapter.name();
        self.status.record_frame();
        metrics::record_frame_received(exchange);

        let received_at = Utc::now().timestamp_millis();
        let event = match self.adapter.decode_text(text, received_at) {
            Ok(event) => event,
            Err(e) => {
                self.drop_frame(&e, text);
                return Ok(());
            }
        };

        match event {
            WireEvent::Data(frame) => {
                if !session.active {
                    session.active = true;
                    self.status.set_state(ConnectionState::Active);
                    policy.reset();
                    tracing::info!(exchange, connection = self.status.id(), "Streaming");
                }

                match self.normalizer.normalize(&frame) {
                    Ok(msgs) => self.dispatch(msgs).await,
                    Err(e) => self.drop_frame(&e, text),
                }
            }
            WireEvent::Ready => {
                if !session.subscribed {
                    self.subscribe(write, session).await?;
                }
            }
            WireEvent::Reply(reply) => {
                write.send(Message::Text(reply.into())).await?;
            }
            WireEvent::Close => {
                return Err(TransportError::ClosedByServer(
                    "protocol-level disconnect".to_string(),
                ));
            }
            WireEvent::Ignore => {}
        }

        Ok(())
    }

    async fn dispatch(&self, msgs: Vec<Msg>) {
        let exchange = self.adapter.name();

        for msg in msgs {
            let delivery = self.dispatcher.dispatch(msg).await;
            metrics::record_handler_duration(exchange, delivery.elapsed);

            match delivery.outcome {
                Outcome::Delivered => {
                    self.status.record_dispatch();
                    metrics::record_message_dispatched(exchange, delivery.channel_type);
                }
                Outcome::Failed => {
                    self.status.record_handler_failure();
                    metrics::record_handler_failure(exchange, FailureKind::Error);
                }
                Outcome::Panicked => {
                    self.status.record_handler_failure();
                    metrics::record_handler_failure(exchange, FailureKind::Panic);
                }
            }
        }
    }

    fn drop_frame(&self, error: &NormalizeError, text: &str) {
        let exchange = self.adapter.name();
        self.status.record_drop();
        metrics::record_frame_dropped(exchange, error.reason());
        tracing::warn!(
            exchange,
            connection = self.status.id(),
            reason = error.reason(),
            error = %error,
            frame = %text.chars().take(200).collect::<String>(),
            "Dropping frame"
        );
    }
}
