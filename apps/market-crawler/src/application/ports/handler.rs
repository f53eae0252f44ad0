//! Consumer handler port.

use std::future::Future;

use async_trait::async_trait;

use crate::domain::Msg;

/// Consumer callback invoked once per canonical message.
///
/// The next message on the same connection is not delivered until the
/// returned future completes. Errors are logged by the dispatcher and never
/// stop the crawl.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle one message.
    async fn on_message(&self, msg: Msg) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> MessageHandler for F
where
    F: Fn(Msg) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn on_message(&self, msg: Msg) -> anyhow::Result<()> {
        (self)(msg).await
    }
}
