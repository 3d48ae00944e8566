use chrono::{DateTime, Utc};

use crate::aggregate::AggregateResult;

const DATE_FORMAT: &str = "%B %-d, %Y";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub earliest: String,
    pub latest: String,
    pub days_between: i64,
}

impl DateRange {
    pub fn new(earliest: DateTime<Utc>, latest: DateTime<Utc>) -> Self {
        Self {
            earliest: earliest.format(DATE_FORMAT).to_string(),
            latest: latest.format(DATE_FORMAT).to_string(),
            days_between: (latest - earliest).num_days(),
        }
    }

    pub fn empty() -> Self {
        Self {
            earliest: "No data available".to_string(),
            latest: "No data available".to_string(),
            days_between: 0,
        }
    }
}

/// Everything the terminal report needs about one scan.
#[derive(Debug)]
pub struct ScanReport {
    pub browser: String,
    /// `None` when the result was loaded from the store instead of scanned.
    pub date_range: Option<DateRange>,
    pub records_processed: usize,
    pub result: AggregateResult,
}
