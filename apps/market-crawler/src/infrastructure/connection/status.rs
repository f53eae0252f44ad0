//! Connection Status
//!
//! Shared, lock-light view of one connection's lifecycle and counters. The
//! connection task writes; the health server and crawl session read.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

/// Connection lifecycle state.
///
/// ```text
/// Idle -> Connecting -> Subscribed -> Active <-> Reconnecting
///                                        \
///                                         -> Closed (shutdown only)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    /// Not started yet.
    Idle,
    /// Opening the transport.
    Connecting,
    /// Handshakes sent, no data yet.
    Subscribed,
    /// Data is flowing.
    Active,
    /// Waiting to reconnect after an unrequested close.
    Reconnecting,
    /// Shut down by the owner. Terminal.
    Closed,
}

impl ConnectionState {
    /// State name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Subscribed => "subscribed",
            Self::Active => "active",
            Self::Reconnecting => "reconnecting",
            Self::Closed => "closed",
        }
    }
}

/// Live status of one connection.
#[derive(Debug)]
pub struct ConnectionStatus {
    id: usize,
    exchange: &'static str,
    label: String,
    state: watch::Sender<ConnectionState>,
    last_connected_at: parking_lot::RwLock<Option<DateTime<Utc>>>,
    last_error: parking_lot::RwLock<Option<String>>,
    frames_received: AtomicU64,
    frames_dropped: AtomicU64,
    messages_dispatched: AtomicU64,
    handler_failures: AtomicU64,
    reconnects: AtomicU64,
}

impl ConnectionStatus {
    /// Create an idle status.
    #[must_use]
    pub fn new(id: usize, exchange: &'static str, label: impl Into<String>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        Self {
            id,
            exchange,
            label: label.into(),
            state,
            last_connected_at: parking_lot::RwLock::new(None),
            last_error: parking_lot::RwLock::new(None),
            frames_received: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            messages_dispatched: AtomicU64::new(0),
            handler_failures: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
        }
    }

    /// Connection index within the crawl.
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Exchange name.
    #[must_use]
    pub const fn exchange(&self) -> &'static str {
        self.exchange
    }

    /// Short description of what the connection carries.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Set the lifecycle state.
    pub fn set_state(&self, state: ConnectionState) {
        if state == ConnectionState::Active {
            *self.last_connected_at.write() = Some(Utc::now());
            *self.last_error.write() = None;
        }
        self.state.send_replace(state);
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Record the reason of the last unrequested close.
    pub fn set_error(&self, message: impl Into<String>) {
        *self.last_error.write() = Some(message.into());
    }

    /// Last recorded error.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Count an inbound frame.
    pub fn record_frame(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a dropped frame.
    pub fn record_drop(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a delivered message.
    pub fn record_dispatch(&self) {
        self.messages_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a failed handler invocation.
    pub fn record_handler_failure(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a reconnect.
    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// Frames received so far.
    #[must_use]
    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    /// Messages delivered so far.
    #[must_use]
    pub fn messages_dispatched(&self) -> u64 {
        self.messages_dispatched.load(Ordering::Relaxed)
    }

    /// Reconnects so far.
    #[must_use]
    pub fn reconnects(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }

    /// Point-in-time copy for reporting.
    #[must_use]
    pub fn snapshot(&self) -> ConnectionSnapshot {
        ConnectionSnapshot {
            id: self.id,
            exchange: self.exchange,
            label: self.label.clone(),
            state: self.state(),
            last_connected_at: *self.last_connected_at.read(),
            last_error: self.last_error(),
            frames_received: self.frames_received(),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            messages_dispatched: self.messages_dispatched(),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            reconnects: self.reconnects(),
        }
    }
}

/// Serializable copy of a [`ConnectionStatus`].
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionSnapshot {
    /// Connection index.
    pub id: usize,
    /// Exchange name.
    pub exchange: &'static str,
    /// What the connection carries.
    pub label: String,
    /// Lifecycle state.
    pub state: ConnectionState,
    /// Last time the connection became active.
    pub last_connected_at: Option<DateTime<Utc>>,
    /// Last unrequested close reason.
    pub last_error: Option<String>,
    /// Inbound frames.
    pub frames_received: u64,
    /// Frames dropped by normalization.
    pub frames_dropped: u64,
    /// Messages delivered.
    pub messages_dispatched: u64,
    /// Handler errors and panics.
    pub handler_failures: u64,
    /// Reconnects.
    pub reconnects: u64,
}
