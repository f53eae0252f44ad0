//! Application Services
//!
//! - `MessageNormalizer`: raw frame to canonical messages for one exchange
//! - `Dispatcher`: ordered, fault-isolated delivery to the consumer handler

pub mod dispatcher;
pub mod normalizer;

pub use dispatcher::{Delivery, Dispatcher, Outcome};
pub use normalizer::MessageNormalizer;
