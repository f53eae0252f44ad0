//! Metadata documents served over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::ensure_exchange;
use crate::application::ports::{ExchangeInfoProvider, MetadataError};
use crate::domain::ExchangeInfo;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Fetches `{base_url}/{exchange}.json`.
#[derive(Debug, Clone)]
pub struct HttpExchangeInfoProvider {
    client: Client,
    base_url: String,
}

impl HttpExchangeInfoProvider {
    /// Create a provider rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Request`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, MetadataError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MetadataError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn document_url(&self, exchange: &str) -> String {
        format!("{}/{exchange}.json", self.base_url)
    }
}

#[async_trait]
impl ExchangeInfoProvider for HttpExchangeInfoProvider {
    async fn fetch_exchange_info(&self, exchange: &str) -> Result<ExchangeInfo, MetadataError> {
        let url = self.document_url(exchange);
        tracing::debug!(exchange, url = %url, "Fetching exchange metadata");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MetadataError::Request(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(MetadataError::NotFound(exchange.to_string()));
        }
        if !status.is_success() {
            return Err(MetadataError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| MetadataError::Request(e.to_string()))?;
        let info: ExchangeInfo = serde_json::from_str(&body)?;
        ensure_exchange(exchange, info)
    }
}
