//! Dispatcher
//!
//! Hands canonical messages to the consumer handler one at a time. Each call
//! is awaited to completion before the caller moves on, which is what gives
//! per-connection ordering and backpressure. Handler errors and panics are
//! contained here.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;

use crate::application::ports::MessageHandler;
use crate::domain::{ChannelType, Msg};

/// How a single handler invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Handler returned `Ok`.
    Delivered,
    /// Handler returned an error.
    Failed,
    /// Handler panicked.
    Panicked,
}

/// Result of dispatching one message.
#[derive(Debug, Clone, Copy)]
pub struct Delivery {
    /// Category of the delivered message.
    pub channel_type: ChannelType,
    /// How the handler ended.
    pub outcome: Outcome,
    /// Time spent in the handler.
    pub elapsed: Duration,
}

/// Sequential message dispatcher for one connection.
#[derive(Clone)]
pub struct Dispatcher {
    exchange: &'static str,
    handler: Arc<dyn MessageHandler>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("exchange", &self.exchange)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a dispatcher for `exchange`.
    #[must_use]
    pub fn new(exchange: &'static str, handler: Arc<dyn MessageHandler>) -> Self {
        Self { exchange, handler }
    }

    /// Deliver one message and wait for the handler to finish.
    pub async fn dispatch(&self, msg: Msg) -> Delivery {
        let channel_type = msg.channel_type();
        let pair = msg.pair().to_string();
        let started = Instant::now();

        let result = AssertUnwindSafe(self.handler.on_message(msg))
            .catch_unwind()
            .await;
        let elapsed = started.elapsed();

        let outcome = match result {
            Ok(Ok(())) => Outcome::Delivered,
            Ok(Err(e)) => {
                tracing::warn!(
                    exchange = self.exchange,
                    %channel_type,
                    pair = %pair,
                    error = %e,
                    "Message handler failed"
                );
                Outcome::Failed
            }
            Err(panic) => {
                tracing::error!(
                    exchange = self.exchange,
                    %channel_type,
                    pair = %pair,
                    panic = panic_message(panic.as_ref()),
                    "Message handler panicked"
                );
                Outcome::Panicked
            }
        };

        Delivery {
            channel_type,
            outcome,
            elapsed,
        }
    }

    /// Deliver messages in order, each completing before the next starts.
    pub async fn dispatch_all(&self, msgs: Vec<Msg>) -> Vec<Delivery> {
        let mut deliveries = Vec::with_capacity(msgs.len());
        for msg in msgs {
            deliveries.push(self.dispatch(msg).await);
        }
        deliveries
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}
