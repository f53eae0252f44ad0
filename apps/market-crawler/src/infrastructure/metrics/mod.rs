//! Prometheus Metrics Module
//!
//! Exposes crawler metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Frames**: Inbound frames received and dropped (by reason)
//! - **Messages**: Canonical messages dispatched by channel type
//! - **Handler**: Consumer failures and latency
//! - **Connections**: Open connections and reconnects
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::domain::ChannelType;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Subsequent calls return the handle installed by the first one.
///
/// # Errors
///
/// Returns an error if the recorder cannot be installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "crawler_frames_received_total",
        "Total text frames received from exchanges"
    );
    describe_counter!(
        "crawler_frames_dropped_total",
        "Total frames dropped by normalization, by reason"
    );
    describe_counter!(
        "crawler_messages_dispatched_total",
        "Total canonical messages delivered to the handler"
    );
    describe_counter!(
        "crawler_handler_failures_total",
        "Total handler invocations that returned an error or panicked"
    );

    describe_gauge!(
        "crawler_websocket_connections",
        "Number of open WebSocket connections"
    );
    describe_counter!(
        "crawler_reconnects_total",
        "Total WebSocket reconnection attempts"
    );

    describe_histogram!(
        "crawler_handler_duration_seconds",
        "Time spent in the consumer handler per message"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Handler failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Handler returned an error.
    Error,
    /// Handler panicked.
    Panic,
}

impl FailureKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Panic => "panic",
        }
    }
}

/// Record a text frame received.
pub fn record_frame_received(exchange: &'static str) {
    counter!("crawler_frames_received_total", "exchange" => exchange).increment(1);
}

/// Record a frame dropped by normalization.
pub fn record_frame_dropped(exchange: &'static str, reason: &'static str) {
    counter!(
        "crawler_frames_dropped_total",
        "exchange" => exchange,
        "reason" => reason
    )
    .increment(1);
}

/// Record a message delivered to the handler.
pub fn record_message_dispatched(exchange: &'static str, channel_type: ChannelType) {
    counter!(
        "crawler_messages_dispatched_total",
        "exchange" => exchange,
        "channel_type" => channel_type.as_str()
    )
    .increment(1);
}

/// Record a failed handler invocation.
pub fn record_handler_failure(exchange: &'static str, kind: FailureKind) {
    counter!(
        "crawler_handler_failures_total",
        "exchange" => exchange,
        "kind" => kind.as_str()
    )
    .increment(1);
}

/// Record handler latency.
pub fn record_handler_duration(exchange: &'static str, duration: Duration) {
    histogram!("crawler_handler_duration_seconds", "exchange" => exchange)
        .record(duration.as_secs_f64());
}

/// Adjust the open connection gauge.
pub fn connection_opened(exchange: &'static str) {
    gauge!("crawler_websocket_connections", "exchange" => exchange).increment(1.0);
}

/// Adjust the open connection gauge.
pub fn connection_closed(exchange: &'static str) {
    gauge!("crawler_websocket_connections", "exchange" => exchange).decrement(1.0);
}

/// Record a reconnection attempt.
pub fn record_reconnect(exchange: &'static str) {
    counter!("crawler_reconnects_total", "exchange" => exchange).increment(1);
}

// =============================================================================
// Tests
// =============================================================================
