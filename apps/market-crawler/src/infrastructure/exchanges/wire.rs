//! Helpers shared by the exchange adapters.

use rust_decimal::Decimal;
use serde_json::Value;

use crate::application::ports::NormalizeError;
use crate::domain::{ExchangeInfo, OrderItem, PairInfo};

/// Check the event discriminator `key` of `payload` equals `expected`.
pub fn expect_event(payload: &Value, key: &str, expected: &'static str) -> Result<(), NormalizeError> {
    match payload.get(key).and_then(Value::as_str) {
        Some(actual) if actual == expected => Ok(()),
        Some(actual) => Err(NormalizeError::UnexpectedEvent {
            expected,
            actual: actual.to_string(),
        }),
        None => Err(NormalizeError::UnexpectedEvent {
            expected,
            actual: "<missing>".to_string(),
        }),
    }
}

/// Resolve a raw exchange symbol or fail with `UnknownSymbol`.
pub fn resolve_symbol<'a>(info: &'a ExchangeInfo, raw: &str) -> Result<&'a PairInfo, NormalizeError> {
    info.resolve_raw(raw)
        .ok_or_else(|| NormalizeError::UnknownSymbol(raw.to_string()))
}

/// Build an order book level, rejecting a cost that overflows.
pub fn order_item(price: Decimal, quantity: Decimal) -> Result<OrderItem, NormalizeError> {
    OrderItem::new(price, quantity).ok_or_else(|| NormalizeError::InvalidNumber {
        field: "cost",
        value: format!("{price} * {quantity}"),
    })
}
