use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::traits::PageSource;

const PLEDGE_PATH: &str = "/pledge/new";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status} fetching {url}")]
    Status { status: u16, url: String },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

/// Pledge-editing page for a campaign: query string dropped, `/pledge/new` appended.
pub fn pledge_url(campaign_url: &str) -> String {
    let base = campaign_url
        .split_once('?')
        .map_or(campaign_url, |(base, _)| base)
        .trim()
        .trim_end_matches('/');
    format!("{base}{PLEDGE_PATH}")
}

/// Plain HTTP GET page source.
pub struct HttpPageSource {
    client: reqwest::Client,
}

impl HttpPageSource {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("kswatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    pub async fn get(&self, url: &str) -> Result<String, FetchError> {
        let resp = self.client.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = resp.text().await?;
        debug!(url, bytes = body.len(), "Fetched page");
        Ok(body)
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, url: &str) -> anyhow::Result<String> {
        Ok(self.get(url).await?)
    }
}
