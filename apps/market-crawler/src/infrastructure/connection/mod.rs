//! WebSocket connection management.
//!
//! - `manager`: session loop (connect, subscribe, read, keepalive, reconnect)
//! - `reconnect`: exponential backoff with jitter and a minimum delay
//! - `status`: lifecycle state and counters shared with the health server

mod manager;
mod reconnect;
mod status;

pub use manager::{ConnectionConfig, ConnectionManager, TransportError};
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
pub use status::{ConnectionSnapshot, ConnectionState, ConnectionStatus};
