use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kswatch::config::{Config, DEFAULT_CONFIG_FILE};
use kswatch::fetcher::{pledge_url, HttpPageSource};
use kswatch::notify::PushoverBackend;
use kswatch::selection::{AmountSelector, InteractiveSelector};
use kswatch::traits::SelectionProvider;
use kswatch::watcher::DEFAULT_GRACE_DELAY;
use kswatch::{Amount, WatchOptions, WatchOutcome, Watcher};

/// Watch a Kickstarter project for sold-out limited rewards to become available.
///
/// Specify amounts only if each is unique among the sold-out pledges;
/// without amounts a menu of sold-out pledges is shown.
#[derive(Parser)]
#[command(name = "kswatch", version)]
struct Cli {
    /// URL of the Kickstarter project
    url: String,

    /// Cost of each pledge to watch (e.g. 75 or $75.00)
    amounts: Vec<Amount>,

    /// Delay, in minutes, between each check
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    delay: u64,

    /// Print a message before each delay
    #[arg(short, long)]
    verbose: bool,

    /// Config file with Pushover credentials
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("kswatch=info,pushover=info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(outcome) => {
            info!(?outcome, "Done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<WatchOutcome> {
    let config = Config::load(&cli.config);
    config.log_redacted();

    let source = HttpPageSource::new()?;
    let notifier = PushoverBackend::new(config.pushover_options())?;

    let options = WatchOptions {
        poll_interval: Duration::from_secs(60 * cli.delay),
        grace_delay: DEFAULT_GRACE_DELAY,
        verbose: cli.verbose,
    };
    let watcher = Watcher::new(
        Box::new(source),
        Box::new(notifier),
        pledge_url(&cli.url),
        options,
    );

    let selector: Box<dyn SelectionProvider> = if cli.amounts.is_empty() {
        Box::new(InteractiveSelector)
    } else {
        Box::new(AmountSelector::new(cli.amounts))
    };

    watcher.run(selector.as_ref()).await
}
