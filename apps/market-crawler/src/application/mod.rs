//! Application Layer - Use cases and port definitions.
//!
//! Turns raw exchange frames into canonical messages and delivers them to
//! the consumer, independent of any transport.

/// Port interfaces for exchanges, metadata and consumers.
pub mod ports;

/// Normalization and dispatch services.
pub mod services;
