#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Market Crawler - Exchange Market Data Normalizer
//!
//! Maintains long-lived WebSocket connections to cryptocurrency exchanges,
//! subscribes to trade, order book and best-bid-offer channels, and turns
//! every exchange-specific payload into one canonical message schema handed
//! to a consumer-supplied handler.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Canonical types with no I/O
//!   - `channel`: Abstract channel categories
//!   - `exchange`: Exchange metadata snapshot (pairs, endpoint)
//!   - `message`: Trade, order book and BBO messages
//!
//! - **Application**: Ports and transport-independent services
//!   - `ports`: Exchange adapter, metadata provider, consumer handler
//!   - `services`: Normalizer and dispatcher
//!
//! - **Infrastructure**: Adapters and runtime
//!   - `crawler`: Crawl entry point and connection fan-out
//!   - `exchanges`: Binance and MXC wire protocols
//!   - `connection`: WebSocket lifecycle, heartbeat, reconnection
//!   - `metadata`: File, HTTP and in-memory metadata providers
//!   - `config`, `health`, `metrics`, `telemetry`
//!
//! # Data Flow
//!
//! ```text
//!                 ┌──────────────┐
//! Binance WS ────►│ Connection 1 │──┐
//! Binance WS ────►│ Connection 2 │──┤   ┌────────────┐   ┌────────────┐
//!                 └──────────────┘  ├──►│ Normalizer │──►│ Dispatcher │──► handler
//! MXC Socket.IO ─►│ Connection N │──┘   └────────────┘   └────────────┘
//!                 └──────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Canonical market data types with no external dependencies.
pub mod domain;

/// Application layer - Port definitions and services.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::{
    BboMsg, ChannelType, ExchangeInfo, MarketType, Msg, MsgMeta, OrderBookMsg, OrderItem,
    PairInfo, TradeMsg,
};

// Ports
pub use application::ports::{
    ExchangeAdapter, ExchangeInfoProvider, MessageHandler, MetadataError, NormalizeError,
};

// Crawl entry point
pub use infrastructure::crawler::{CrawlError, CrawlSession, Crawler};

// Metadata providers
pub use infrastructure::metadata::{
    FileExchangeInfoProvider, HttpExchangeInfoProvider, StaticExchangeInfoProvider,
};

// Configuration
pub use infrastructure::config::{
    ConfigError, CrawlerConfig, MetadataSource, ServerSettings, WebSocketSettings,
};

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
