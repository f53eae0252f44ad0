//! Crawl Entry Point
//!
//! Validates a crawl request, loads the exchange metadata once, resolves
//! every (channel type, pair) to a wire topic, groups topics into
//! connections according to the adapter's [`ConnectionPolicy`] and spawns
//! one [`ConnectionManager`] task per connection.
//!
//! Everything that can make a crawl fail happens here, before the first
//! socket opens. After that, failures are connection- or frame-local.

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::config::{ConfigError, WebSocketSettings};
use super::connection::{ConnectionConfig, ConnectionManager, ConnectionStatus};
use super::exchanges;
use crate::application::ports::{
    ConnectionPolicy, ExchangeAdapter, ExchangeInfoProvider, MessageHandler, MetadataError,
    ResolveError, Subscription,
};
use crate::application::services::dispatcher::Dispatcher;
use crate::application::services::normalizer::MessageNormalizer;
use crate::domain::{ChannelType, ExchangeInfo};

// =============================================================================
// Error Type
// =============================================================================

/// Errors that stop a crawl before any connection opens.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    /// No adapter is registered under this name.
    #[error("unknown exchange: {0}")]
    UnknownExchange(String),

    /// The request names no channel type.
    #[error("no channel types requested")]
    NoChannels,

    /// The exchange has no mapping for a requested channel type.
    #[error("channel type {channel} is not supported by {exchange}")]
    UnsupportedChannel {
        /// Exchange name.
        exchange: String,
        /// Requested channel type.
        channel: ChannelType,
    },

    /// A requested pair is not in the metadata snapshot.
    #[error("pair {pair} is not listed on {exchange}")]
    UnknownPair {
        /// Exchange name.
        exchange: String,
        /// Requested pair.
        pair: String,
    },

    /// A requested pair has a market type the exchange does not stream.
    #[error("{exchange} does not stream {market_type} pair {pair}")]
    UnsupportedMarket {
        /// Exchange name.
        exchange: String,
        /// Requested pair.
        pair: String,
        /// Pair market type.
        market_type: &'static str,
    },

    /// Nothing to subscribe to.
    #[error("no pairs to crawl on {0}")]
    NoPairs(String),

    /// Connection timings are unusable.
    #[error("invalid websocket settings: {0}")]
    Settings(#[from] ConfigError),

    /// Metadata fetch failed.
    #[error("failed to load exchange metadata: {0}")]
    Bootstrap(#[from] MetadataError),
}

impl From<ResolveError> for CrawlError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::UnsupportedChannel { exchange, channel } => {
                Self::UnsupportedChannel { exchange, channel }
            }
            ResolveError::UnknownPair { exchange, pair } => Self::UnknownPair { exchange, pair },
            ResolveError::UnsupportedMarket {
                exchange,
                pair,
                market_type,
            } => Self::UnsupportedMarket {
                exchange,
                pair,
                market_type,
            },
        }
    }
}

// =============================================================================
// Crawler
// =============================================================================

/// Crawl entry point for one exchange.
pub struct Crawler {
    adapter: Arc<dyn ExchangeAdapter>,
    provider: Arc<dyn ExchangeInfoProvider>,
    settings: WebSocketSettings,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Crawler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crawler")
            .field("exchange", &self.adapter.name())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Crawler {
    /// Create a crawler for `exchange`.
    ///
    /// Cancelling `cancel` shuts down every connection this crawler starts.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::UnknownExchange`] if no adapter is registered
    /// and [`CrawlError::Settings`] if `settings` fail validation.
    pub fn new(
        exchange: &str,
        provider: Arc<dyn ExchangeInfoProvider>,
        settings: WebSocketSettings,
        cancel: CancellationToken,
    ) -> Result<Self, CrawlError> {
        let adapter = exchanges::adapter_for(exchange)
            .ok_or_else(|| CrawlError::UnknownExchange(exchange.to_string()))?;
        settings.validate()?;

        Ok(Self {
            adapter,
            provider,
            settings,
            cancel,
        })
    }

    /// Exchange this crawler serves.
    #[must_use]
    pub fn exchange(&self) -> &'static str {
        self.adapter.name()
    }

    /// Crawl until shutdown.
    ///
    /// # Errors
    ///
    /// See [`Crawler::start`].
    pub async fn crawl(
        &self,
        channel_types: &[ChannelType],
        pairs: &[String],
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), CrawlError> {
        self.start(channel_types, pairs, handler).await?.wait().await;
        Ok(())
    }

    /// Validate, bootstrap and spawn every connection.
    ///
    /// `pairs` are normalized pairs; an empty list means every pair in the
    /// metadata snapshot.
    ///
    /// # Errors
    ///
    /// Fails on an empty or unsupported channel set, a metadata failure and
    /// any pair that cannot be resolved. No connection is opened on error.
    pub async fn start(
        &self,
        channel_types: &[ChannelType],
        pairs: &[String],
        handler: Arc<dyn MessageHandler>,
    ) -> Result<CrawlSession, CrawlError> {
        let exchange = self.adapter.name();
        let channel_types = validate_channels(self.adapter.as_ref(), channel_types)?;

        tracing::info!(exchange, channels = ?channel_types, "Loading exchange metadata");
        let info = Arc::new(self.provider.fetch_exchange_info(exchange).await?);

        let groups = plan_connections(self.adapter.as_ref(), &info, &channel_types, pairs)?;

        let normalizer = MessageNormalizer::new(
            Arc::clone(&self.adapter),
            Arc::clone(&info),
            channel_types.clone(),
        );
        let dispatcher = Dispatcher::new(exchange, handler);
        let cancel = self.cancel.child_token();

        let mut tasks = JoinSet::new();
        let mut statuses = Vec::with_capacity(groups.len());
        let mut topics = 0;

        for (id, group) in groups.iter().enumerate() {
            topics += group.len();
            let plan = self
                .adapter
                .subscription_plan(info.websocket_endpoint(), group);
            let status = Arc::new(ConnectionStatus::new(id, exchange, connection_label(group)));

            let manager = ConnectionManager::new(
                ConnectionConfig::new(plan, &self.settings),
                Arc::clone(&self.adapter),
                normalizer.clone(),
                dispatcher.clone(),
                Arc::clone(&status),
                cancel.clone(),
            );

            statuses.push(status);
            tasks.spawn(manager.run());
        }

        tracing::info!(
            exchange,
            connections = statuses.len(),
            topics,
            "Crawl started"
        );

        Ok(CrawlSession {
            exchange,
            info,
            statuses,
            tasks,
            cancel,
        })
    }
}

// =============================================================================
// Crawl Session
// =============================================================================

/// A running crawl.
#[derive(Debug)]
pub struct CrawlSession {
    exchange: &'static str,
    info: Arc<ExchangeInfo>,
    statuses: Vec<Arc<ConnectionStatus>>,
    tasks: JoinSet<()>,
    cancel: CancellationToken,
}

impl CrawlSession {
    /// Exchange being crawled.
    #[must_use]
    pub const fn exchange(&self) -> &'static str {
        self.exchange
    }

    /// Metadata snapshot shared by every connection.
    #[must_use]
    pub fn exchange_info(&self) -> Arc<ExchangeInfo> {
        Arc::clone(&self.info)
    }

    /// Status of every connection, in connection order.
    #[must_use]
    pub fn statuses(&self) -> &[Arc<ConnectionStatus>] {
        &self.statuses
    }

    /// Request shutdown of every connection.
    ///
    /// In-flight handler calls complete first.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Wait for every connection task to finish.
    pub async fn wait(mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                tracing::error!(exchange = self.exchange, error = %e, "Connection task failed");
            }
        }
        tracing::info!(exchange = self.exchange, "Crawl finished");
    }
}

// =============================================================================
// Planning
// =============================================================================

fn validate_channels(
    adapter: &dyn ExchangeAdapter,
    requested: &[ChannelType],
) -> Result<Vec<ChannelType>, CrawlError> {
    let mut channels = Vec::with_capacity(requested.len());
    for channel in requested {
        if !adapter.supported_channels().contains(channel) {
            return Err(CrawlError::UnsupportedChannel {
                exchange: adapter.name().to_string(),
                channel: *channel,
            });
        }
        if !channels.contains(channel) {
            channels.push(*channel);
        }
    }

    if channels.is_empty() {
        return Err(CrawlError::NoChannels);
    }
    Ok(channels)
}

/// Resolve every subscription and group them into connections.
fn plan_connections(
    adapter: &dyn ExchangeAdapter,
    info: &ExchangeInfo,
    channel_types: &[ChannelType],
    pairs: &[String],
) -> Result<Vec<Vec<Subscription>>, CrawlError> {
    let exchange = adapter.name();

    let mut selected: Vec<&str> = Vec::new();
    if pairs.is_empty() {
        selected.extend(info.pair_names());
    } else {
        for pair in pairs {
            if !selected.contains(&pair.as_str()) {
                selected.push(pair.as_str());
            }
        }
    }
    if selected.is_empty() {
        return Err(CrawlError::NoPairs(exchange.to_string()));
    }

    let mut per_pair = Vec::with_capacity(selected.len());
    for pair in selected {
        let pair_info = info.pair(pair).ok_or_else(|| CrawlError::UnknownPair {
            exchange: exchange.to_string(),
            pair: pair.to_string(),
        })?;

        let subscriptions = channel_types
            .iter()
            .map(|&channel_type| {
                Ok(Subscription {
                    channel_type,
                    pair: pair_info.clone(),
                    topic: adapter.resolve_channel(channel_type, pair, info)?,
                })
            })
            .collect::<Result<Vec<_>, ResolveError>>()?;
        per_pair.push(subscriptions);
    }

    Ok(match adapter.connection_policy() {
        ConnectionPolicy::PerPair => per_pair,
        ConnectionPolicy::Multiplexed {
            max_topics_per_connection,
        } => {
            let all: Vec<Subscription> = per_pair.into_iter().flatten().collect();
            all.chunks(max_topics_per_connection.max(1))
                .map(<[Subscription]>::to_vec)
                .collect()
        }
    })
}

fn connection_label(group: &[Subscription]) -> String {
    let mut pairs: Vec<&str> = Vec::new();
    for sub in group {
        if !pairs.contains(&sub.pair.normalized_pair.as_str()) {
            pairs.push(sub.pair.normalized_pair.as_str());
        }
    }

    match pairs.as_slice() {
        [] => String::new(),
        [only] => (*only).to_string(),
        [first, rest @ ..] => format!("{first} +{} pairs", rest.len()),
    }
}
