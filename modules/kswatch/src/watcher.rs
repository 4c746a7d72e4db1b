use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{info, warn};

use crate::extractor::RewardExtractor;
use crate::traits::{NotifyBackend, PageSource, SelectionProvider};
use crate::types::RewardRecord;

pub const AVAILABLE_MESSAGE: &str = "Kickstarter Reward available!";

/// Pause before exiting once the last watched tier is found, so a browser
/// opened from the push has time to load.
pub const DEFAULT_GRACE_DELAY: Duration = Duration::from_secs(10);

/// Tiers the user asked to be alerted about, in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchSet {
    records: Vec<RewardRecord>,
}

impl WatchSet {
    pub fn new(records: Vec<RewardRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[RewardRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remove and return the first watched tier whose identifier is absent
    /// from `unavailable`. At most one tier per call.
    pub fn take_first_available(&mut self, unavailable: &[RewardRecord]) -> Option<RewardRecord> {
        let still_gone: HashSet<&str> = unavailable.iter().map(|r| r.identifier.as_str()).collect();
        let pos = self
            .records
            .iter()
            .position(|r| !still_gone.contains(r.identifier.as_str()))?;
        Some(self.records.remove(pos))
    }
}

/// How a watch run ended. All are normal terminations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The page has no sold-out limited tiers.
    NothingUnavailable,
    /// The selection came back empty.
    NothingSelected,
    /// Every watched tier became available.
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub poll_interval: Duration,
    pub grace_delay: Duration,
    pub verbose: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            grace_delay: DEFAULT_GRACE_DELAY,
            verbose: false,
        }
    }
}

/// Result of one diff step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cycle {
    /// No data this cycle (fetch failed); nothing changed.
    Skipped,
    /// Every watched tier is still sold out.
    Unchanged,
    /// `0` became available and was removed; others are still watched.
    Available(RewardRecord),
    /// `0` became available and was the last watched tier.
    Exhausted(RewardRecord),
}

pub struct Watcher {
    source: Box<dyn PageSource>,
    notifier: Box<dyn NotifyBackend>,
    extractor: RewardExtractor,
    pledge_url: String,
    options: WatchOptions,
}

impl Watcher {
    pub fn new(
        source: Box<dyn PageSource>,
        notifier: Box<dyn NotifyBackend>,
        pledge_url: String,
        options: WatchOptions,
    ) -> Self {
        Self {
            source,
            notifier,
            extractor: RewardExtractor::default(),
            pledge_url,
            options,
        }
    }

    pub fn with_extractor(mut self, extractor: RewardExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn pledge_url(&self) -> &str {
        &self.pledge_url
    }

    /// Startup then poll until every selected tier comes back.
    ///
    /// Only the initial fetch can fail; once watching starts the loop
    /// absorbs fetch and notification failures.
    pub async fn run(&self, selector: &dyn SelectionProvider) -> Result<WatchOutcome> {
        let markup = self
            .source
            .fetch(&self.pledge_url)
            .await
            .with_context(|| format!("Failed to fetch {}", self.pledge_url))?;
        let page = self.extractor.extract_page(&markup);

        if page.rewards.is_empty() {
            println!("No unavailable limited rewards for this Kickstarter");
            return Ok(WatchOutcome::NothingUnavailable);
        }

        let (candidates, unusable): (Vec<_>, Vec<_>) =
            page.rewards.iter().cloned().partition(RewardRecord::is_usable);
        if !unusable.is_empty() {
            warn!(count = unusable.len(), "Dropping sold-out rewards without a selector id");
        }
        if candidates.is_empty() {
            println!("No unavailable limited rewards for this Kickstarter");
            return Ok(WatchOutcome::NothingUnavailable);
        }

        let watch = WatchSet::new(selector.select(&candidates)?);
        if watch.is_empty() {
            println!("No reward selected.");
            return Ok(WatchOutcome::NothingSelected);
        }

        println!("\nSelected rewards:");
        for r in watch.records() {
            println!("{}", r.description);
        }

        let name = page.title.as_deref().unwrap_or(&self.pledge_url);
        println!("\nSending test push to make sure everything is OK");
        self.push(&format!("Start watching: {name}")).await;

        println!("\nWatching...");
        info!(
            url = self.pledge_url.as_str(),
            watching = watch.len(),
            interval_secs = self.options.poll_interval.as_secs(),
            "Watch started"
        );

        self.watch(watch, page.rewards).await;
        Ok(WatchOutcome::Exhausted)
    }

    /// Poll loop. Returns once `watch` is empty.
    pub async fn watch(&self, mut watch: WatchSet, initial: Vec<RewardRecord>) {
        let mut latest = Some(initial);

        loop {
            match self.step(&mut watch, latest.as_deref()).await {
                Cycle::Exhausted(_) => {
                    tokio::time::sleep(self.options.grace_delay).await;
                    return;
                }
                Cycle::Skipped | Cycle::Unchanged | Cycle::Available(_) => {}
            }

            if self.options.verbose {
                info!(
                    "Waiting {} minutes ...",
                    self.options.poll_interval.as_secs_f64() / 60.0
                );
            }
            tokio::time::sleep(self.options.poll_interval).await;

            latest = self.poll().await;
        }
    }

    /// Diff `watch` against the latest sold-out set, announcing and removing
    /// the first tier that is no longer there.
    pub async fn step(&self, watch: &mut WatchSet, unavailable: Option<&[RewardRecord]>) -> Cycle {
        let Some(unavailable) = unavailable else {
            return Cycle::Skipped;
        };
        let Some(found) = watch.take_first_available(unavailable) else {
            return Cycle::Unchanged;
        };

        println!(
            "{} - Reward available!",
            Local::now().format("%B %d, %Y %I:%M %p")
        );
        println!("{}", found.description);
        info!(
            identifier = found.identifier.as_str(),
            price = found.price.as_str(),
            remaining = watch.len(),
            "Reward available"
        );
        self.push(AVAILABLE_MESSAGE).await;

        if watch.is_empty() {
            Cycle::Exhausted(found)
        } else {
            Cycle::Available(found)
        }
    }

    /// Fetch and extract. `None` when the fetch failed.
    async fn poll(&self) -> Option<Vec<RewardRecord>> {
        match self.source.fetch(&self.pledge_url).await {
            Ok(markup) => Some(self.extractor.extract(&markup)),
            Err(e) => {
                warn!(error = %e, url = self.pledge_url.as_str(), "Fetch failed, skipping cycle");
                None
            }
        }
    }

    async fn push(&self, message: &str) {
        if let Err(e) = self.notifier.notify(message, &self.pledge_url).await {
            warn!(error = %e, message, "Failed to send notification");
        }
    }
}
