use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use url::Url;

use crate::engine::{self, EngineClass, EngineId};
use crate::query;

/// Example URLs kept per phrase.
pub const MAX_EXAMPLES: usize = 3;

/// A single visited URL as supplied by a history store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub url: String,
    /// Unix milliseconds.
    pub timestamp: i64,
}

impl HistoryRecord {
    pub fn new(url: impl Into<String>, timestamp: i64) -> Self {
        Self {
            url: url.into(),
            timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub engines: BTreeSet<EngineId>,
    pub processing_limit: Option<usize>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            engines: EngineId::ALL.into_iter().collect(),
            processing_limit: None,
        }
    }
}

/// Phrase counts and example URLs collected by one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    #[serde(rename = "emw_counts", default)]
    pub counts: BTreeMap<String, u64>,
    #[serde(rename = "emw_examples", default)]
    pub examples: BTreeMap<String, Vec<String>>,
}

impl AggregateResult {
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn total_matches(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// Accumulates phrase statistics record by record.
///
/// The aggregate is owned by the aggregator until [`QueryAggregator::finish`]
/// hands it over. Records past the processing limit are never inspected.
#[derive(Debug)]
pub struct QueryAggregator {
    options: ScanOptions,
    processed: usize,
    result: AggregateResult,
}

impl QueryAggregator {
    pub fn new(options: ScanOptions) -> Self {
        Self {
            options,
            processed: 0,
            result: AggregateResult::default(),
        }
    }

    /// Records evaluated so far, excluding the one that crossed the limit.
    pub fn processed(&self) -> usize {
        match self.options.processing_limit {
            Some(limit) => self.processed.min(limit),
            None => self.processed,
        }
    }

    /// True once no further records will be evaluated.
    pub fn is_exhausted(&self) -> bool {
        self.options
            .processing_limit
            .is_some_and(|limit| self.processed >= limit)
    }

    /// Feeds one record. Returns `false` if the record crossed the processing
    /// limit and was not inspected.
    pub fn ingest(&mut self, record: &HistoryRecord) -> bool {
        self.processed += 1;
        if let Some(limit) = self.options.processing_limit {
            if self.processed > limit {
                return false;
            }
        }

        if let Some(phrase) = self.candidate(&record.url) {
            *self.result.counts.entry(phrase.clone()).or_insert(0) += 1;

            let examples = self.result.examples.entry(phrase).or_default();
            if examples.len() < MAX_EXAMPLES {
                examples.push(record.url.clone());
            }
        }
        true
    }

    /// Feeds a chunk until it ends or the limit is reached. Records after the
    /// limit are never pulled from the chunk.
    pub fn ingest_chunk<C>(&mut self, chunk: C)
    where
        C: IntoIterator,
        C::Item: Borrow<HistoryRecord>,
    {
        let mut records = chunk.into_iter();
        while !self.is_exhausted() {
            let Some(record) = records.next() else {
                break;
            };
            if !self.ingest(<C::Item as Borrow<HistoryRecord>>::borrow(&record)) {
                break;
            }
        }
    }

    /// Feeds chunks in order, pulling no further chunks once the limit has
    /// been reached.
    pub fn consume<I, C>(&mut self, chunks: I)
    where
        I: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Borrow<HistoryRecord>,
    {
        let mut chunks = chunks.into_iter();
        while !self.is_exhausted() {
            let Some(chunk) = chunks.next() else {
                break;
            };
            self.ingest_chunk(chunk);
        }
    }

    pub fn finish(self) -> AggregateResult {
        self.result
    }

    fn candidate(&self, url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?;

        match engine::classify(host) {
            EngineClass::Engine(id) if self.options.engines.contains(&id) => {}
            _ => return None,
        }

        query::match_meaning_phrase(&query::query_param(&parsed))
    }
}

/// Runs a full scan over `chunks` with a fresh aggregate.
pub fn scan<I, C>(chunks: I, options: ScanOptions) -> AggregateResult
where
    I: IntoIterator<Item = C>,
    C: IntoIterator,
    C::Item: Borrow<HistoryRecord>,
{
    let mut aggregator = QueryAggregator::new(options);
    aggregator.consume(chunks);
    aggregator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn record(url: &str, timestamp: i64) -> HistoryRecord {
        HistoryRecord::new(url, timestamp)
    }

    fn options(engines: &[EngineId], limit: Option<usize>) -> ScanOptions {
        ScanOptions {
            engines: engines.iter().copied().collect(),
            processing_limit: limit,
        }
    }

    #[test]
    fn test_end_to_end_chunk() {
        let chunk = vec![
            record("https://www.google.com/search?q=ubiquitous+meaning", 1),
            record("https://bing.com/search?q=serendipity+meaning", 2),
            record("https://example.com/?q=foo+meaning", 3),
        ];

        let result = scan(
            vec![chunk],
            options(&[EngineId::Google, EngineId::Bing], None),
        );

        assert_eq!(result.counts.len(), 2);
        assert_eq!(result.counts["ubiquitous"], 1);
        assert_eq!(result.counts["serendipity"], 1);
        assert_eq!(
            result.examples["ubiquitous"],
            vec!["https://www.google.com/search?q=ubiquitous+meaning"]
        );
        assert_eq!(
            result.examples["serendipity"],
            vec!["https://bing.com/search?q=serendipity+meaning"]
        );
        assert!(!result.counts.contains_key("foo"));
    }

    #[test]
    fn test_disabled_engine_is_skipped() {
        let chunk = vec![
            record("https://duckduckgo.com/?q=laconic+meaning", 1),
            record("https://www.google.de/search?q=laconic+meaning", 2),
        ];

        let result = scan(vec![chunk], options(&[EngineId::Ddg], None));

        assert_eq!(result.counts["laconic"], 1);
        assert_eq!(
            result.examples["laconic"],
            vec!["https://duckduckgo.com/?q=laconic+meaning"]
        );
    }

    #[test]
    fn test_examples_are_capped_in_first_seen_order() {
        let chunk: Vec<HistoryRecord> = (0..10)
            .map(|i| {
                record(
                    &format!("https://www.google.com/search?q=Ephemeral+Meaning&n={}", i),
                    i,
                )
            })
            .collect();

        let result = scan(vec![chunk], ScanOptions::default());

        assert_eq!(result.counts["ephemeral"], 10);
        assert_eq!(
            result.examples["ephemeral"],
            vec![
                "https://www.google.com/search?q=Ephemeral+Meaning&n=0",
                "https://www.google.com/search?q=Ephemeral+Meaning&n=1",
                "https://www.google.com/search?q=Ephemeral+Meaning&n=2",
            ]
        );
    }

    fn numbered_chunk(offset: i64) -> Vec<HistoryRecord> {
        (0..4)
            .map(|i| {
                record(
                    &format!("https://www.google.com/search?q=word{}+meaning", offset + i),
                    offset + i,
                )
            })
            .collect()
    }

    #[test]
    fn test_processing_limit_stops_mid_chunk() {
        let inspected = Cell::new(0usize);
        let seen = &inspected;
        let chunks = vec![numbered_chunk(0), numbered_chunk(4)];
        let counted = chunks
            .iter()
            .map(move |chunk| chunk.iter().inspect(move |_| seen.set(seen.get() + 1)));

        let result = scan(counted, options(&EngineId::ALL, Some(5)));

        assert_eq!(result.total_matches(), 5);
        assert!(result.counts.contains_key("word4"));
        assert!(!result.counts.contains_key("word5"));
        assert_eq!(inspected.get(), 5);
    }

    #[test]
    fn test_processed_count_is_capped_at_limit() {
        let mut aggregator = QueryAggregator::new(options(&EngineId::ALL, Some(5)));
        for chunk in [numbered_chunk(0), numbered_chunk(4)] {
            for record in &chunk {
                aggregator.ingest(record);
            }
        }

        assert!(aggregator.is_exhausted());
        assert_eq!(aggregator.processed(), 5);
        assert_eq!(aggregator.finish().total_matches(), 5);
    }

    #[test]
    fn test_no_chunks_pulled_after_limit() {
        let pulled = Cell::new(0usize);
        let chunks = (0..3).map(|_| {
            pulled.set(pulled.get() + 1);
            vec![
                record("https://bing.com/search?q=a+meaning", 0),
                record("https://bing.com/search?q=b+meaning", 0),
            ]
        });

        let result = scan(chunks, options(&EngineId::ALL, Some(2)));

        assert_eq!(pulled.get(), 1);
        assert_eq!(result.total_matches(), 2);
    }

    #[test]
    fn test_zero_limit_evaluates_nothing() {
        let chunk = vec![record("https://bing.com/search?q=a+meaning", 0)];

        let result = scan(vec![chunk], options(&EngineId::ALL, Some(0)));

        assert!(result.is_empty());
    }

    #[test]
    fn test_malformed_records_do_not_abort() {
        let chunk = vec![
            record("::not a url::", 1),
            record("", 2),
            record("file:///tmp/q=x+meaning", 3),
            record("https://www.google.com/search?q=100%25+meaning", 4),
            record("https://www.google.com/search?q=meaning", 5),
            record("https://www.google.com/maps", 6),
            record("https://www.google.com/search?q=Hubris+meaning", 7),
        ];

        let result = scan(vec![chunk], ScanOptions::default());

        assert_eq!(result.counts.len(), 1);
        assert_eq!(result.counts["hubris"], 1);
    }

    #[test]
    fn test_scan_is_idempotent() {
        let chunks = vec![
            vec![
                record("https://www.google.com/search?q=Zeal+meaning", 3),
                record("https://duckduckgo.com/?q=zeal+MEANING", 2),
            ],
            vec![record("https://m.bing.com/search?q=vim+meaning", 1)],
        ];

        let first = scan(chunks.clone(), ScanOptions::default());
        let second = scan(chunks, ScanOptions::default());

        assert_eq!(first, second);
        assert_eq!(first.counts["zeal"], 2);
    }

    #[test]
    fn test_result_invariants_hold() {
        let chunk: Vec<HistoryRecord> = ["a", "b", "a", "c", "a", "a", "b"]
            .iter()
            .enumerate()
            .map(|(i, w)| {
                record(
                    &format!("https://duckduckgo.com/?q={}+meaning&i={}", w, i),
                    i as i64,
                )
            })
            .collect();

        let result = scan(vec![chunk], ScanOptions::default());

        for (phrase, count) in &result.counts {
            assert!(*count >= 1);
            let examples = &result.examples[phrase];
            assert!(!examples.is_empty());
            assert!(examples.len() <= MAX_EXAMPLES);
            assert!(examples.len() as u64 <= *count);
        }
        assert_eq!(result.counts.len(), result.examples.len());
    }
}
