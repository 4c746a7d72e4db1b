pub mod error;
pub mod models;

pub use error::{PushoverError, Result};

use std::time::Duration;

use tracing::debug;

use crate::models::{Message, MessageResponse};

const MESSAGES_URL: &str = "https://api.pushover.net/1/messages.json";

#[derive(Debug, Clone)]
pub struct PushoverOptions {
    pub user_key: String,
    pub app_token: String,
    /// -2 (lowest) through 2 (emergency).
    pub priority: i8,
}

pub struct PushoverClient {
    client: reqwest::Client,
    endpoint: String,
    options: PushoverOptions,
}

impl PushoverClient {
    pub fn new(options: PushoverOptions) -> Result<Self> {
        Self::with_endpoint(MESSAGES_URL, options)
    }

    /// Point the client at a different messages endpoint (e.g. a local stub).
    pub fn with_endpoint(endpoint: &str, options: PushoverOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            options,
        })
    }

    /// Push `message` to the configured user. `url` becomes the tap-through link.
    pub async fn send(&self, message: &str, url: Option<&str>) -> Result<String> {
        let form = self.message(message, url);

        let resp = self.client.post(&self.endpoint).form(&form).send().await?;

        let status = resp.status();
        let body = resp.text().await?;
        let parsed = parse_response(&body);

        if !status.is_success() {
            return Err(PushoverError::Api {
                status: status.as_u16(),
                errors: parsed.map(|r| r.errors).unwrap_or_else(|| vec![body]),
            });
        }

        match parsed {
            Some(r) if r.is_accepted() => {
                debug!(request = r.request.as_str(), "Pushover accepted message");
                Ok(r.request)
            }
            Some(r) => Err(PushoverError::Rejected { request: r.request }),
            None => Err(PushoverError::Api {
                status: status.as_u16(),
                errors: vec![format!("unparseable response: {body}")],
            }),
        }
    }

    fn message<'a>(&'a self, message: &'a str, url: Option<&'a str>) -> Message<'a> {
        Message {
            token: &self.options.app_token,
            user: &self.options.user_key,
            priority: self.options.priority,
            message,
            url,
        }
    }
}

fn parse_response(body: &str) -> Option<MessageResponse> {
    serde_json::from_str(body).ok()
}
