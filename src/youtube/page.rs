use crate::config::HttpConfig;
use crate::error::{Result, TranscriptError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Fetches an HTML document
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// `PageFetcher` over HTTP
#[derive(Clone)]
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

/// HTTP client shared by page and caption requests
pub fn build_client(config: &HttpConfig) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    let mut builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers);

    if let Some(seconds) = config.timeout_seconds {
        builder = builder.timeout(Duration::from_secs(seconds));
    }

    builder
        .build()
        .map_err(|e| TranscriptError::Config(format!("cannot build HTTP client: {}", e)))
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        debug!("Fetching page: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TranscriptError::page_fetch_failed(url, e))?;

        if !response.status().is_success() {
            return Err(TranscriptError::page_fetch_failed(
                url,
                format!("HTTP {}", response.status()),
            ));
        }

        let html = response
            .text()
            .await
            .map_err(|e| TranscriptError::page_fetch_failed(url, e))?;

        debug!("Downloaded {} characters of HTML from {}", html.len(), url);
        Ok(html)
    }
}
