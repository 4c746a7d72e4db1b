use async_trait::async_trait;
use pushover::{PushoverClient, PushoverOptions};
use tracing::info;

use crate::traits::NotifyBackend;

/// Pushover notification backend.
pub struct PushoverBackend {
    client: PushoverClient,
}

impl PushoverBackend {
    pub fn new(options: PushoverOptions) -> pushover::Result<Self> {
        Ok(Self {
            client: PushoverClient::new(options)?,
        })
    }
}

#[async_trait]
impl NotifyBackend for PushoverBackend {
    async fn notify(&self, message: &str, url: &str) -> anyhow::Result<()> {
        let request = self.client.send(message, Some(url)).await?;
        info!(request = request.as_str(), message, "Push notification sent");
        Ok(())
    }
}
