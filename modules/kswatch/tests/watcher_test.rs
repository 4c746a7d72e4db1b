//! End-to-end watch runs against scripted pages. No network, no terminal,
//! zero-length delays.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use kswatch::selection::AmountSelector;
use kswatch::traits::{NotifyBackend, PageSource};
use kswatch::watcher::{Cycle, AVAILABLE_MESSAGE};
use kswatch::{RewardRecord, WatchOptions, WatchOutcome, WatchSet, Watcher};

const URL: &str = "https://www.kickstarter.com/projects/me/thing/pledge/new";

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Serves pages in order; the last one repeats forever.
#[derive(Clone)]
struct ScriptedSource {
    pages: Arc<Mutex<VecDeque<Result<String, String>>>>,
    fetches: Arc<AtomicUsize>,
}

impl ScriptedSource {
    fn new(pages: Vec<Result<String, String>>) -> Self {
        Self {
            pages: Arc::new(Mutex::new(pages.into())),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    async fn fetch(&self, url: &str) -> Result<String> {
        assert_eq!(url, URL);
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let mut pages = self.pages.lock().unwrap();
        let next = if pages.len() > 1 {
            pages.pop_front().unwrap()
        } else {
            pages.front().cloned().unwrap()
        };
        next.map_err(|e| anyhow!(e))
    }
}

#[derive(Clone, Default)]
struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(String, String)>>>,
    fail: bool,
}

impl RecordingNotifier {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }
}

#[async_trait]
impl NotifyBackend for RecordingNotifier {
    async fn notify(&self, message: &str, url: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((message.to_string(), url.to_string()));
        if self.fail {
            return Err(anyhow!("push service down"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Pledge page where each `(price, id)` is a sold-out tier.
fn page(sold_out: &[(&str, &str)]) -> Result<String, String> {
    let blocks: String = sold_out
        .iter()
        .map(|(price, id)| {
            format!(
                r#"<li class="pledge--all-gone">
                    <input class="pledge__radio" id="{id}" title="{price}" type="radio">
                    <h3 class="pledge__title">Tier {id}</h3>
                </li>"#
            )
        })
        .collect();
    Ok(format!(
        "<html><head><title>The Thing</title></head><body><ol>{blocks}</ol></body></html>"
    ))
}

fn watcher(source: &ScriptedSource, notifier: &RecordingNotifier) -> Watcher {
    Watcher::new(
        Box::new(source.clone()),
        Box::new(notifier.clone()),
        URL.to_string(),
        WatchOptions {
            poll_interval: Duration::ZERO,
            grace_delay: Duration::ZERO,
            verbose: true,
        },
    )
}

fn by_amounts(amounts: &[&str]) -> AmountSelector {
    AmountSelector::new(amounts.iter().map(|a| a.parse().unwrap()).collect())
}

fn record(id: &str) -> RewardRecord {
    RewardRecord {
        price: "$10.00".into(),
        identifier: id.into(),
        description: format!("Tier {id}"),
    }
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn nothing_sold_out_ends_without_notifying() {
    let source = ScriptedSource::new(vec![page(&[])]);
    let notifier = RecordingNotifier::default();

    let outcome = watcher(&source, &notifier)
        .run(&by_amounts(&["10"]))
        .await
        .unwrap();

    assert_eq!(outcome, WatchOutcome::NothingUnavailable);
    assert!(notifier.messages().is_empty());
    assert_eq!(source.fetches(), 1);
}

#[tokio::test]
async fn only_unusable_records_is_nothing_unavailable() {
    let html = r#"<ol><li class="pledge--all-gone"><h3 class="pledge__title">No radio</h3></li></ol>"#;
    let source = ScriptedSource::new(vec![Ok(html.to_string())]);
    let notifier = RecordingNotifier::default();

    let selector = |_: &[RewardRecord]| -> Result<Vec<RewardRecord>> {
        panic!("selector must not run without usable candidates")
    };
    let outcome = watcher(&source, &notifier).run(&selector).await.unwrap();
    assert_eq!(outcome, WatchOutcome::NothingUnavailable);
}

#[tokio::test]
async fn unmatched_amount_ends_without_notifying() {
    let source = ScriptedSource::new(vec![page(&[("$50.00", "a"), ("$75.00", "b")])]);
    let notifier = RecordingNotifier::default();

    let outcome = watcher(&source, &notifier)
        .run(&by_amounts(&["20"]))
        .await
        .unwrap();

    assert_eq!(outcome, WatchOutcome::NothingSelected);
    assert!(notifier.messages().is_empty());
}

#[tokio::test]
async fn initial_fetch_failure_is_an_error() {
    let source = ScriptedSource::new(vec![Err("connection refused".into())]);
    let notifier = RecordingNotifier::default();

    let err = watcher(&source, &notifier)
        .run(&by_amounts(&["10"]))
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("connection refused"));
    assert!(notifier.messages().is_empty());
}

// ---------------------------------------------------------------------------
// Poll loop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn watches_until_every_selected_tier_returns() {
    let source = ScriptedSource::new(vec![
        page(&[("$50.00", "A"), ("$75.00", "B"), ("$99.00", "C")]),
        page(&[("$50.00", "A"), ("$99.00", "C")]),
        page(&[("$99.00", "C")]),
    ]);
    let notifier = RecordingNotifier::default();

    let outcome = watcher(&source, &notifier)
        .run(&by_amounts(&["50", "75"]))
        .await
        .unwrap();

    assert_eq!(outcome, WatchOutcome::Exhausted);
    assert_eq!(
        notifier.messages(),
        vec![
            "Start watching: The Thing".to_string(),
            AVAILABLE_MESSAGE.to_string(),
            AVAILABLE_MESSAGE.to_string(),
        ]
    );
    let sent = notifier.sent.lock().unwrap();
    assert!(sent.iter().all(|(_, url)| url == URL));
}

#[tokio::test]
async fn one_transition_per_cycle() {
    let source = ScriptedSource::new(vec![
        page(&[("$50.00", "A"), ("$75.00", "B")]),
        page(&[]),
    ]);
    let notifier = RecordingNotifier::default();

    let outcome = watcher(&source, &notifier)
        .run(&by_amounts(&["50", "75"]))
        .await
        .unwrap();

    assert_eq!(outcome, WatchOutcome::Exhausted);
    assert_eq!(notifier.messages().len(), 3);
    // Startup, then one poll per transition.
    assert_eq!(source.fetches(), 3);
}

#[tokio::test]
async fn fetch_failure_skips_cycle_without_changes() {
    let source = ScriptedSource::new(vec![
        page(&[("$50.00", "A")]),
        Err("timeout".into()),
        Err("timeout".into()),
        page(&[("$50.00", "A")]),
        page(&[]),
    ]);
    let notifier = RecordingNotifier::default();

    let outcome = watcher(&source, &notifier)
        .run(&by_amounts(&["50"]))
        .await
        .unwrap();

    assert_eq!(outcome, WatchOutcome::Exhausted);
    assert_eq!(notifier.messages().len(), 2);
    assert_eq!(source.fetches(), 5);
}

#[tokio::test]
async fn notification_failures_do_not_stop_the_loop() {
    let source = ScriptedSource::new(vec![page(&[("$50.00", "A")]), page(&[])]);
    let notifier = RecordingNotifier::failing();

    let outcome = watcher(&source, &notifier)
        .run(&by_amounts(&["50"]))
        .await
        .unwrap();

    assert_eq!(outcome, WatchOutcome::Exhausted);
    assert_eq!(notifier.messages().len(), 2);
}

#[tokio::test]
async fn page_without_title_uses_url_as_name() {
    let html = r#"<ol><li class="pledge--all-gone">
        <input class="pledge__radio" id="A" title="$5">
        <h3 class="pledge__title">Only</h3>
    </li></ol>"#;
    let source = ScriptedSource::new(vec![Ok(html.to_string()), page(&[])]);
    let notifier = RecordingNotifier::default();

    let auto = |c: &[RewardRecord]| -> Result<Vec<RewardRecord>> { Ok(c.to_vec()) };
    watcher(&source, &notifier).run(&auto).await.unwrap();

    assert_eq!(notifier.messages()[0], format!("Start watching: {URL}"));
}

// ---------------------------------------------------------------------------
// Single step
// ---------------------------------------------------------------------------

#[tokio::test]
async fn step_reports_each_cycle_kind() {
    let source = ScriptedSource::new(vec![page(&[])]);
    let notifier = RecordingNotifier::default();
    let w = watcher(&source, &notifier);

    let mut watch = WatchSet::new(vec![record("A"), record("B")]);
    let all = vec![record("A"), record("B"), record("C")];
    let without_b = vec![record("A"), record("C")];

    assert_eq!(w.step(&mut watch, None).await, Cycle::Skipped);
    assert_eq!(w.step(&mut watch, Some(all.as_slice())).await, Cycle::Unchanged);
    assert_eq!(
        w.step(&mut watch, Some(without_b.as_slice())).await,
        Cycle::Available(record("B"))
    );
    assert_eq!(watch.records(), &[record("A")]);
    assert_eq!(w.step(&mut watch, Some(&[][..])).await, Cycle::Exhausted(record("A")));
    assert!(watch.is_empty());

    assert_eq!(notifier.messages().len(), 2);
    assert_eq!(source.fetches(), 0);
}
