//! HTTP client shared by every external source
//!
//! Wraps a single `reqwest` client with the configured timeout and user agent,
//! and turns transport failures and non-2xx answers into [`FetchError`]s.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::FetchError;

/// Settings for the shared HTTP client
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Per-request timeout
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// A fetched HTML page together with the URL it was served from after redirects
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub body: String,
}

/// Thin wrapper over `reqwest::Client`
pub struct HttpClient {
    client: Client,
    name: String,
}

impl HttpClient {
    pub fn new(name: &str, config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .cookie_store(true)
            .gzip(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            name: name.to_string(),
        })
    }

    /// GET a page and return its text
    pub async fn get_page(&self, url: &str) -> Result<FetchedPage, FetchError> {
        debug!(client = %self.name, url = %url, "Making GET request");
        let response = self.client.get(url).send().await?;
        Self::into_page(response).await
    }

    /// GET a page with query parameters
    pub async fn get_page_with_query<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        query: &T,
    ) -> Result<FetchedPage, FetchError> {
        debug!(client = %self.name, url = %url, "Making GET request with query");
        let response = self.client.get(url).query(query).send().await?;
        Self::into_page(response).await
    }

    /// GET a JSON document with query parameters
    pub async fn get_json_with_query<T, Q>(&self, url: &str, query: &Q) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        let page = self.get_page_with_query(url, query).await?;
        serde_json::from_str(&page.body).map_err(|e| FetchError::Decode(e.to_string()))
    }

    async fn into_page(response: Response) -> Result<FetchedPage, FetchError> {
        let url = response.url().to_string();
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        Ok(FetchedPage { url, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_config_default() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("scratcher/"));
    }

    #[test]
    fn test_client_builds_from_config() {
        assert!(HttpClient::new("test", &HttpConfig::default()).is_ok());
    }
}
