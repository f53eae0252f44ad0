//! Exchange metadata providers.
//!
//! All providers serve the same JSON document per exchange:
//!
//! ```json
//! {
//!   "name": "Binance",
//!   "websocket_endpoint": "wss://stream.binance.com:9443",
//!   "pairs": {
//!     "BTC_USDT": {"normalized_pair": "BTC_USDT", "raw_pair": "BTCUSDT", "market_type": "Spot"}
//!   }
//! }
//! ```

mod file;
mod http;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::application::ports::{ExchangeInfoProvider, MetadataError};
use crate::domain::ExchangeInfo;

pub use file::FileExchangeInfoProvider;
pub use http::HttpExchangeInfoProvider;

/// In-memory provider.
#[derive(Debug, Clone, Default)]
pub struct StaticExchangeInfoProvider {
    exchanges: HashMap<String, ExchangeInfo>,
}

impl StaticExchangeInfoProvider {
    /// Create an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a snapshot, keyed by its exchange name.
    #[must_use]
    pub fn with(mut self, info: ExchangeInfo) -> Self {
        self.exchanges.insert(info.name().to_lowercase(), info);
        self
    }
}

#[async_trait]
impl ExchangeInfoProvider for StaticExchangeInfoProvider {
    async fn fetch_exchange_info(&self, exchange: &str) -> Result<ExchangeInfo, MetadataError> {
        self.exchanges
            .get(&exchange.to_lowercase())
            .cloned()
            .ok_or_else(|| MetadataError::NotFound(exchange.to_string()))
    }
}

/// Reject a document describing another exchange.
fn ensure_exchange(expected: &str, info: ExchangeInfo) -> Result<ExchangeInfo, MetadataError> {
    if info.name().eq_ignore_ascii_case(expected) {
        Ok(info)
    } else {
        Err(MetadataError::ExchangeMismatch {
            expected: expected.to_string(),
            actual: info.name().to_string(),
        })
    }
}
