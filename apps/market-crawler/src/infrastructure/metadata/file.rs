//! Metadata document read from disk.

use std::path::PathBuf;

use async_trait::async_trait;

use super::ensure_exchange;
use crate::application::ports::{ExchangeInfoProvider, MetadataError};
use crate::domain::ExchangeInfo;

/// Reads one exchange's metadata document from a JSON file.
#[derive(Debug, Clone)]
pub struct FileExchangeInfoProvider {
    path: PathBuf,
}

impl FileExchangeInfoProvider {
    /// Create a provider for the document at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ExchangeInfoProvider for FileExchangeInfoProvider {
    async fn fetch_exchange_info(&self, exchange: &str) -> Result<ExchangeInfo, MetadataError> {
        tracing::debug!(exchange, path = %self.path.display(), "Loading exchange metadata");

        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| MetadataError::Io {
                path: self.path.display().to_string(),
                source,
            })?;

        let info: ExchangeInfo = serde_json::from_str(&contents)?;
        ensure_exchange(exchange, info)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::domain::MarketType;

    const DOCUMENT: &str = r#"{
        "name": "MXC",
        "websocket_endpoint": "wss://wbs.mxc.com/",
        "pairs": {
            "BTC_USDT": {"normalized_pair": "BTC_USDT", "raw_pair": "BTC_USDT", "market_type": "Spot"},
            "ETH_USDT": {"normalized_pair": "ETH_USDT", "raw_pair": "ETH_USDT"}
        }
    }"#;

    fn document_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn loads_document() {
        let file = document_file(DOCUMENT);
        let provider = FileExchangeInfoProvider::new(file.path());

        let info = provider.fetch_exchange_info("MXC").await.unwrap();
        assert_eq!(info.websocket_endpoint(), "wss://wbs.mxc.com");
        assert_eq!(info.len(), 2);
        assert_eq!(info.pair("ETH_USDT").unwrap().market_type, MarketType::Spot);
    }

    #[tokio::test]
    async fn wrong_exchange() {
        let file = document_file(DOCUMENT);
        let provider = FileExchangeInfoProvider::new(file.path());

        let err = provider.fetch_exchange_info("Binance").await.unwrap_err();
        assert!(matches!(err, MetadataError::ExchangeMismatch { .. }));
    }

    #[tokio::test]
    async fn invalid_json() {
        let file = document_file("{not json");
        let provider = FileExchangeInfoProvider::new(file.path());

        let err = provider.fetch_exchange_info("MXC").await.unwrap_err();
        assert!(matches!(err, MetadataError::Parse(_)));
    }

    #[tokio::test]
    async fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileExchangeInfoProvider::new(dir.path().join("absent.json"));

        let err = provider.fetch_exchange_info("MXC").await.unwrap_err();
        assert!(matches!(err, MetadataError::Io { .. }));
    }
}
