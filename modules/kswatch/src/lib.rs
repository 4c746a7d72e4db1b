pub mod config;
pub mod extractor;
pub mod fetcher;
pub mod notify;
pub mod selection;
pub mod traits;
pub mod types;
pub mod watcher;

pub use extractor::{extract, extract_page, Markers, PledgePage, RewardExtractor};
pub use types::{Amount, RewardRecord};
pub use watcher::{WatchOptions, WatchOutcome, WatchSet, Watcher};
