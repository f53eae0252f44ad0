//! Port Interfaces
//!
//! Contracts between the crawl services and the outside world.
//!
//! ## Driven Ports (Outbound)
//!
//! - `ExchangeInfoProvider`: metadata directory consulted once per crawl
//! - `ExchangeAdapter`: per-exchange wire protocol
//!
//! ## Driver Ports (Inbound)
//!
//! - `MessageHandler`: consumer callback receiving canonical messages

mod exchange;
mod handler;
mod metadata;

pub use exchange::{
    ConnectionPolicy, ExchangeAdapter, Keepalive, NormalizeError, RawFrame, ResolveError,
    Subscription, SubscriptionPlan, WireEvent, lookup_pair, require_market,
};
pub use handler::MessageHandler;
pub use metadata::{ExchangeInfoProvider, MetadataError};
