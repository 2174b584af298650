use crate::domain::ports::{ImageFetcher, ManifestSource};
use crate::utils::error::{Result, TeiError};
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;

/// reqwest-backed client for manifests and images.
#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    client: Client,
    timeout: Option<Duration>,
}

impl HttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub(crate) async fn get(&self, url: &str) -> Result<Response> {
        let mut request = self.client.get(url);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        tracing::debug!("📡 GET {}", url);
        let response = request.send().await.map_err(|source| TeiError::Http {
            url: url.to_string(),
            source,
        })?;
        tracing::debug!("📡 {} -> {}", url, response.status());

        if !response.status().is_success() {
            return Err(TeiError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }

    pub(crate) async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        let body = self
            .get(url)
            .await?
            .text()
            .await
            .map_err(|source| TeiError::Http {
                url: url.to_string(),
                source,
            })?;

        serde_json::from_str(&body).map_err(|source| TeiError::InvalidJson {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl ManifestSource for HttpClient {
    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value> {
        self.get_json(url).await
    }
}

#[async_trait]
impl ImageFetcher for HttpClient {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self
            .get(url)
            .await?
            .bytes()
            .await
            .map_err(|source| TeiError::Http {
                url: url.to_string(),
                source,
            })?;
        Ok(bytes.to_vec())
    }
}
