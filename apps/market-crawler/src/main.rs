//! Market Crawler Binary
//!
//! Crawls one exchange and writes every canonical message to stdout as a
//! JSON line. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! CRAWLER_EXCHANGE=Binance CRAWLER_CHANNELS=Trade,BBO \
//! CRAWLER_PAIRS=BTC_USDT,ETH_USDT CRAWLER_METADATA_FILE=binance.json \
//!     cargo run --bin market-crawler
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `CRAWLER_EXCHANGE`: Binance | MXC
//! - `CRAWLER_METADATA_FILE` or `CRAWLER_METADATA_URL`: metadata source
//!
//! ## Optional
//! - `CRAWLER_CHANNELS`: comma-separated channel types (default: Trade)
//! - `CRAWLER_PAIRS`: comma-separated normalized pairs (default: all)
//! - `CRAWLER_HEALTH_PORT`: health and metrics HTTP port (default: 0, disabled)
//! - `CRAWLER_HEARTBEAT_INTERVAL_SECS`, `CRAWLER_HEARTBEAT_TIMEOUT_SECS`
//! - `CRAWLER_CONNECT_TIMEOUT_SECS`: handshake limit per attempt (default: 10)
//! - `CRAWLER_RECONNECT_DELAY_INITIAL_MS`, `CRAWLER_RECONNECT_DELAY_MIN_MS`,
//!   `CRAWLER_RECONNECT_DELAY_MAX_SECS`, `CRAWLER_RECONNECT_DELAY_MULTIPLIER`
//! - `OTEL_ENABLED`: Export spans over OTLP (default: false)
//! - `RUST_LOG`: Log filter (default: `market_crawler=info`)

use std::io::Write;
use std::sync::Arc;

use market_crawler::infrastructure::health::{HealthServer, HealthServerState};
use market_crawler::infrastructure::telemetry;
use market_crawler::{
    CrawlerConfig, Crawler, ExchangeInfoProvider, FileExchangeInfoProvider,
    HttpExchangeInfoProvider, MessageHandler, MetadataSource, Msg, init_metrics,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| "failed to install rustls crypto provider")?;

    load_dotenv();

    let _telemetry_guard = telemetry::init()?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting market crawler");

    let _metrics_handle = init_metrics()?;

    let config = CrawlerConfig::from_env()?;
    log_config(&config);

    let provider: Arc<dyn ExchangeInfoProvider> = match &config.metadata {
        MetadataSource::File(path) => Arc::new(FileExchangeInfoProvider::new(path)),
        MetadataSource::Url(url) => Arc::new(HttpExchangeInfoProvider::new(url)?),
    };

    let shutdown_token = CancellationToken::new();
    let crawler = Crawler::new(
        &config.exchange,
        provider,
        config.websocket.clone(),
        shutdown_token.clone(),
    )?;

    let handler: Arc<dyn MessageHandler> = Arc::new(|msg: Msg| async move {
        let line = serde_json::to_string(&msg)?;
        writeln!(std::io::stdout().lock(), "{line}")?;
        anyhow::Ok(())
    });

    let session = crawler
        .start(&config.channels, &config.pairs, handler)
        .await?;

    if config.server.health_port != 0 {
        let health_state = Arc::new(HealthServerState::new(
            env!("CARGO_PKG_VERSION"),
            session.exchange(),
            session.statuses().to_vec(),
        ));
        let health_server = HealthServer::new(
            config.server.health_port,
            health_state,
            shutdown_token.clone(),
        );
        tokio::spawn(async move {
            if let Err(e) = health_server.run().await {
                tracing::error!(error = %e, "Health server error");
            }
        });
    }

    tokio::spawn(await_shutdown(shutdown_token));

    session.wait().await;

    tracing::info!("Market crawler stopped");
    Ok(())
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &CrawlerConfig) {
    tracing::info!(
        exchange = %config.exchange,
        channels = ?config.channels,
        pairs = config.pairs.len(),
        health_port = config.server.health_port,
        "Configuration loaded"
    );
    tracing::debug!(metadata = ?config.metadata, websocket = ?config.websocket, "Crawler settings");
}

/// Wait for shutdown signal (SIGTERM or SIGINT), then cancel the crawl.
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
}
