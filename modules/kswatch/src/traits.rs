// Seams between the watch loop and the outside world.
//
// PageSource: fetches the pledge page markup (HTTP GET in production).
// NotifyBackend: delivers a push message (Pushover in production).
// SelectionProvider: picks which sold-out tiers to watch.
//
// Tests drive the loop with scripted/recording implementations: no network,
// no terminal.

use anyhow::Result;
use async_trait::async_trait;

use crate::types::RewardRecord;

#[async_trait]
pub trait PageSource: Send + Sync {
    /// Return the full body of the page at `url`.
    async fn fetch(&self, url: &str) -> Result<String>;
}

#[async_trait]
pub trait NotifyBackend: Send + Sync {
    /// Push `message` with `url` as the tap-through link.
    async fn notify(&self, message: &str, url: &str) -> Result<()>;
}

pub trait SelectionProvider {
    /// Choose the records to watch from the sold-out `candidates`.
    /// An empty result means "nothing to watch".
    fn select(&self, candidates: &[RewardRecord]) -> Result<Vec<RewardRecord>>;
}

impl<F> SelectionProvider for F
where
    F: Fn(&[RewardRecord]) -> Result<Vec<RewardRecord>>,
{
    fn select(&self, candidates: &[RewardRecord]) -> Result<Vec<RewardRecord>> {
        self(candidates)
    }
}
