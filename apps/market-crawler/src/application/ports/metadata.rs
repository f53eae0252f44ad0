//! Exchange metadata port.

use async_trait::async_trait;

use crate::domain::ExchangeInfo;

/// Errors raised while fetching exchange metadata.
///
/// Any of these aborts a crawl before a connection is opened.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// Transport-level failure talking to the metadata source.
    #[error("metadata request failed: {0}")]
    Request(String),

    /// Metadata source answered with a non-success status.
    #[error("metadata source returned HTTP {status} for {url}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// Reading a metadata file failed.
    #[error("failed to read metadata file {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The metadata document is not valid.
    #[error("invalid metadata document: {0}")]
    Parse(#[from] serde_json::Error),

    /// The source has no metadata for this exchange.
    #[error("no metadata for exchange {0}")]
    NotFound(String),

    /// The document describes a different exchange than requested.
    #[error("metadata is for exchange {actual}, expected {expected}")]
    ExchangeMismatch {
        /// Requested exchange.
        expected: String,
        /// Exchange named in the document.
        actual: String,
    },
}

/// Source of exchange metadata (endpoint plus raw symbol ↔ pair mapping).
///
/// Called exactly once per crawl.
#[async_trait]
pub trait ExchangeInfoProvider: Send + Sync {
    /// Fetch the metadata snapshot for `exchange`.
    async fn fetch_exchange_info(&self, exchange: &str) -> Result<ExchangeInfo, MetadataError>;
}
