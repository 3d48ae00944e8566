use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::aggregate::AggregateResult;

/// Phrases by count descending, ties broken by phrase ascending.
pub fn sorted_entries(result: &AggregateResult) -> Vec<(&str, u64)> {
    let mut entries: Vec<(&str, u64)> = result
        .counts
        .iter()
        .map(|(phrase, count)| (phrase.as_str(), *count))
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    entries
}

/// `{"emw_counts": {...}, "emw_examples": {...}}`, pretty-printed.
pub fn to_json(result: &AggregateResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("Failed to serialize results")
}

/// `word,count` header followed by one row per phrase in phrase order.
pub fn to_csv(result: &AggregateResult) -> String {
    let mut csv = String::from("word,count\n");
    for (phrase, count) in &result.counts {
        csv.push_str(&escape_csv(phrase));
        csv.push(',');
        csv.push_str(&count.to_string());
        csv.push('\n');
    }
    csv
}

fn escape_csv(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn write_json(result: &AggregateResult, path: &Path) -> Result<()> {
    fs::write(path, to_json(result)?).with_context(|| format!("Failed to write {:?}", path))?;
    info!(action = "export", component = "json", path = ?path, phrase_count = result.len(), "Exported JSON");
    Ok(())
}

pub fn write_csv(result: &AggregateResult, path: &Path) -> Result<()> {
    fs::write(path, to_csv(result)).with_context(|| format!("Failed to write {:?}", path))?;
    info!(action = "export", component = "csv", path = ?path, phrase_count = result.len(), "Exported CSV");
    Ok(())
}
