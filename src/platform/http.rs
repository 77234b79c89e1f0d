//! HTTP client for the e-commerce platform's admin API.

use super::{CommercePlatform, PlatformError};
use crate::domain::order_event::split_tags;
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Platform client over the admin REST API.
///
/// The whole lookup (retries included) is bounded by the configured
/// timeout so webhook processing can proceed with partial data instead
/// of stalling.
#[derive(Debug, Clone)]
pub struct HttpCommercePlatform {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpCommercePlatform {
    /// Create a new platform client.
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url,
            timeout,
        }
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value, PlatformError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.timeout),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self.client.get(url).send().await.map_err(|e| {
                backoff::Error::transient(PlatformError::NetworkError(e.to_string()))
            })?;

            let status = response.status();
            if status.is_server_error() || status == 429 {
                return Err(backoff::Error::transient(PlatformError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(PlatformError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(PlatformError::ParseError(e.to_string())))
        })
        .await
    }
}

#[async_trait]
impl CommercePlatform for HttpCommercePlatform {
    async fn fetch_customer_tags(
        &self,
        external_customer_id: &str,
    ) -> Result<Vec<String>, PlatformError> {
        debug!("Fetching tags for platform customer {}", external_customer_id);

        let url = format!("{}/customers/{}", self.base_url, external_customer_id);
        let response = self.get_json(&url).await?;

        let tags = response
            .get("tags")
            .and_then(|t| t.as_str())
            .map(split_tags)
            .unwrap_or_default();

        Ok(tags)
    }
}
