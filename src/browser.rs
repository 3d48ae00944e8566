use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use crate::aggregate::{QueryAggregator, ScanOptions};
use crate::config::Config;
use crate::export::sorted_entries;
use crate::history::{self, HistoryChunks, HistorySchema};
use crate::stats::ScanReport;
use crate::utils::{format_number, redact_phrase, shorten_url};

const EXAMPLE_URL_WIDTH: usize = 48;

/// Where the history comes from and how it is copied.
#[derive(Debug, Clone, Default)]
pub struct HistorySource {
    /// Explicit database path; the browser's default location otherwise.
    pub history: Option<PathBuf>,
    pub temp_path: Option<PathBuf>,
}

pub fn scan_options(config: &Config) -> ScanOptions {
    ScanOptions {
        engines: config.engines.iter().copied().collect(),
        processing_limit: config.limit,
    }
}

pub fn analyze_browser_history(config: &Config, source: &HistorySource) -> Result<ScanReport> {
    let total_start_time = Instant::now();
    let engines: Vec<String> = config.engines.iter().map(ToString::to_string).collect();
    info!(
        action = "start",
        component = "history_scan",
        browser = %config.browser,
        engines = %engines.join(","),
        limit = ?config.limit,
        "Starting browser history scan"
    );

    let (history_path, schema) = match &source.history {
        Some(path) => (path.clone(), HistorySchema::for_browser(&config.browser)?),
        None => history::get_browser_history_path(&config.browser)?,
    };
    let temp_history_path =
        history::copy_history_database(&history_path, source.temp_path.as_deref())?;

    let report = scan_database(&temp_history_path, schema, config);
    history::remove_history_copy(&temp_history_path);
    let report = report?;

    info!(
        action = "complete",
        component = "history_scan",
        records_processed = report.records_processed,
        phrase_count = report.result.len(),
        duration_ms = total_start_time.elapsed().as_millis(),
        "Scan completed successfully"
    );
    Ok(report)
}

/// Scans an already copied database. A failed history window fails the scan.
pub fn scan_database(path: &Path, schema: HistorySchema, config: &Config) -> Result<ScanReport> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open history database {:?}", path))?;
    info!(action = "connect", component = "database", path = ?path, "Connected to database");

    let date_range = history::get_date_range(&conn, schema)?;

    let mut fetch_error = None;
    let chunks = HistoryChunks::new(&conn, schema, config.chunk_days).map_while(|chunk| {
        chunk.map_err(|e| fetch_error = Some(e)).ok()
    });

    let mut aggregator = QueryAggregator::new(scan_options(config));
    aggregator.consume(chunks);

    if let Some(e) = fetch_error {
        return Err(e.context("History scan failed"));
    }

    let records_processed = aggregator.processed();
    info!(action = "aggregate", component = "query_aggregator", records_processed, "Aggregation finished");

    Ok(ScanReport {
        browser: config.browser.clone(),
        date_range: Some(date_range),
        records_processed,
        result: aggregator.finish(),
    })
}

pub fn print_scan_report(report: &ScanReport, top: usize, redact: bool) {
    match &report.date_range {
        Some(date_range) => {
            println!("\n--- {} \"meaning\" searches ---", report.browser);
            if date_range.days_between > 0 {
                println!(
                    "Date range: {} to {} ({} days)",
                    date_range.earliest,
                    date_range.latest,
                    format_number(date_range.days_between.unsigned_abs())
                );
            } else {
                println!("Date range: {} to {}", date_range.earliest, date_range.latest);
            }
            println!(
                "History entries evaluated: {}",
                format_number(report.records_processed as u64)
            );
        }
        None => println!("\n--- Stored \"meaning\" searches ---"),
    }

    let entries = sorted_entries(&report.result);
    println!(
        "Found {} unique words ({} searches)",
        format_number(entries.len() as u64),
        format_number(report.result.total_matches())
    );

    if entries.is_empty() {
        return;
    }

    println!("\nTop {} words:", std::cmp::min(top, entries.len()));
    for (phrase, count) in entries.iter().take(top) {
        let display_phrase = if redact {
            redact_phrase(phrase)
        } else {
            phrase.to_string()
        };
        println!("- {}: {}", display_phrase, format_number(*count));

        if redact {
            continue;
        }
        for url in report.result.examples.get(*phrase).into_iter().flatten() {
            println!("    {}", shorten_url(url, EXAMPLE_URL_WIDTH));
        }
    }
}
