//! Exchange Adapters
//!
//! One [`ExchangeAdapter`] per supported exchange, looked up by name from a
//! static registry when a crawl starts.
//!
//! | Exchange | Transport             | Topology            |
//! |----------|-----------------------|---------------------|
//! | Binance  | raw WebSocket JSON    | combined streams    |
//! | MXC      | Socket.IO (EIO v3)    | one pair/connection |

mod binance;
mod mxc;
pub mod socketio;
mod wire;

use std::sync::Arc;

use crate::application::ports::ExchangeAdapter;

pub use binance::{BINANCE, BinanceAdapter};
pub use mxc::{MXC, MxcAdapter};

/// Names of every registered exchange.
#[must_use]
pub const fn supported_exchanges() -> &'static [&'static str] {
    &[BINANCE, MXC]
}

/// Look up the adapter for `name` (case-insensitive).
#[must_use]
pub fn adapter_for(name: &str) -> Option<Arc<dyn ExchangeAdapter>> {
    if name.eq_ignore_ascii_case(BINANCE) {
        Some(Arc::new(BinanceAdapter))
    } else if name.eq_ignore_ascii_case(MXC) {
        Some(Arc::new(MxcAdapter))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("Binance", "Binance")]
    #[test_case("binance", "Binance")]
    #[test_case("MXC", "MXC")]
    #[test_case("mxc", "MXC")]
    fn finds_adapter(name: &str, expected: &str) {
        assert_eq!(adapter_for(name).unwrap().name(), expected);
    }

    #[test]
    fn unknown_exchange() {
        assert!(adapter_for("Kraken").is_none());
    }

    #[test]
    fn every_listed_exchange_resolves() {
        for name in supported_exchanges() {
            assert_eq!(adapter_for(name).unwrap().name(), *name);
        }
    }
}
