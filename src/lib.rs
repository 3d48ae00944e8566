pub mod aggregate;
pub mod args;
pub mod browser;
pub mod config;
pub mod engine;
pub mod export;
pub mod history;
pub mod query;
pub mod stats;
pub mod store;
pub mod utils;

pub use aggregate::{scan, AggregateResult, HistoryRecord, QueryAggregator, ScanOptions};
pub use args::Args;
pub use browser::{analyze_browser_history, HistorySource};
pub use config::{init_default_config, load_config, Config};
pub use engine::{classify, EngineClass, EngineId};
pub use query::{extract_query, match_meaning_phrase};
pub use stats::ScanReport;
pub use store::ResultsStore;
