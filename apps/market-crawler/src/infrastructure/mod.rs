//! Infrastructure Layer - Adapters and external integrations.
//!
//! Concrete implementations of the application ports plus the runtime
//! pieces that drive them (connections, health, telemetry).

/// Crawl entry point: validation, bootstrap and connection fan-out.
pub mod crawler;

/// Per-exchange wire protocol adapters (Binance, MXC).
pub mod exchanges;

/// WebSocket connection lifecycle and reconnection.
pub mod connection;

/// Exchange metadata providers (file, HTTP, in-memory).
pub mod metadata;

/// Configuration loading.
pub mod config;

/// Health check HTTP endpoint.
pub mod health;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Logging and OpenTelemetry tracing.
pub mod telemetry;
