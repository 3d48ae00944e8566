use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, Result as SqliteResult};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::aggregate::HistoryRecord;
use crate::stats::DateRange;

/// Upper bound on records returned for a single time window.
pub const MAX_RESULTS_PER_WINDOW: i64 = 10_000;

/// Microseconds between 1601-01-01 and 1970-01-01.
const WEBKIT_EPOCH_OFFSET_MICROS: i64 = 11_644_473_600_000_000;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// On-disk layout of a browser history database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistorySchema {
    /// `History` file of Chrome and its derivatives; microseconds since 1601.
    Chromium,
    /// `places.sqlite` of Firefox; microseconds since the Unix epoch.
    Firefox,
}

impl HistorySchema {
    pub fn for_browser(browser: &str) -> Result<Self> {
        match browser.to_lowercase().as_str() {
            "vivaldi" | "chrome" | "chromium" | "brave" | "edge" => Ok(HistorySchema::Chromium),
            "firefox" => Ok(HistorySchema::Firefox),
            other => anyhow::bail!("Unsupported browser '{}'", other),
        }
    }

    fn window_query(self) -> &'static str {
        match self {
            HistorySchema::Chromium => {
                "SELECT id, url, last_visit_time FROM urls \
                 WHERE last_visit_time >= ?1 AND last_visit_time < ?2 \
                 ORDER BY last_visit_time DESC LIMIT ?3"
            }
            HistorySchema::Firefox => {
                "SELECT id, url, last_visit_date FROM moz_places \
                 WHERE last_visit_date >= ?1 AND last_visit_date < ?2 \
                 ORDER BY last_visit_date DESC LIMIT ?3"
            }
        }
    }

    fn date_range_query(self) -> &'static str {
        match self {
            HistorySchema::Chromium => "SELECT MIN(visit_time), MAX(visit_time) FROM visits",
            HistorySchema::Firefox => {
                "SELECT MIN(visit_date), MAX(visit_date) FROM moz_historyvisits"
            }
        }
    }

    /// Converts Unix milliseconds into the schema's native timestamp.
    pub fn from_unix_millis(self, millis: i64) -> i64 {
        match self {
            HistorySchema::Chromium => millis * 1000 + WEBKIT_EPOCH_OFFSET_MICROS,
            HistorySchema::Firefox => millis * 1000,
        }
    }

    /// Converts a native timestamp into Unix milliseconds.
    pub fn to_unix_millis(self, native: i64) -> i64 {
        match self {
            HistorySchema::Chromium => (native - WEBKIT_EPOCH_OFFSET_MICROS) / 1000,
            HistorySchema::Firefox => native / 1000,
        }
    }

    fn to_datetime(self, native: i64) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.to_unix_millis(native))
    }
}

pub fn get_browser_history_path(browser: &str) -> Result<(PathBuf, HistorySchema)> {
    let system = env::consts::OS;
    let home = PathBuf::from(env::var("HOME").or_else(|_| env::var("USERPROFILE"))?);
    let browser = browser.to_lowercase();

    let chromium_dir = |windows: &str, macos: &str, linux: &str| -> Result<PathBuf> {
        let user_data = match system {
            "windows" => PathBuf::from(env::var("LOCALAPPDATA")?).join(windows),
            "macos" => home.join("Library/Application Support").join(macos),
            "linux" => home.join(".config").join(linux),
            _ => anyhow::bail!("Unsupported operating system '{}'", system),
        };
        Ok(user_data.join("Default/History"))
    };

    let path = match browser.as_str() {
        "vivaldi" => chromium_dir("Vivaldi/User Data", "Vivaldi", "vivaldi")?,
        "chrome" => chromium_dir(
            "Google/Chrome/User Data",
            "Google/Chrome",
            "google-chrome",
        )?,
        "chromium" => chromium_dir("Chromium/User Data", "Chromium", "chromium")?,
        "brave" => chromium_dir(
            "BraveSoftware/Brave-Browser/User Data",
            "BraveSoftware/Brave-Browser",
            "BraveSoftware/Brave-Browser",
        )?,
        "edge" => chromium_dir("Microsoft/Edge/User Data", "Microsoft Edge", "microsoft-edge")?,
        "firefox" => {
            let profiles = match system {
                "windows" => PathBuf::from(env::var("APPDATA")?).join("Mozilla/Firefox/Profiles"),
                "macos" => home.join("Library/Application Support/Firefox/Profiles"),
                "linux" => home.join(".mozilla/firefox"),
                _ => anyhow::bail!("Unsupported operating system '{}'", system),
            };
            find_firefox_places(&profiles)?
        }
        _ => anyhow::bail!(
            "Unsupported browser '{}' or operating system '{}'",
            browser,
            system
        ),
    };

    let schema = HistorySchema::for_browser(&browser)?;
    info!(action = "resolve", component = "browser_path", browser = %browser, path = ?path, "Browser history path resolved");
    Ok((path, schema))
}

/// Picks `places.sqlite` from the first profile, preferring `*.default-release`.
fn find_firefox_places(profiles_dir: &Path) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(profiles_dir)
        .with_context(|| format!("Failed to read Firefox profiles at {:?}", profiles_dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|dir| dir.join("places.sqlite").is_file())
        .collect();
    candidates.sort();

    let profile = candidates
        .iter()
        .find(|dir| {
            dir.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(".default-release"))
        })
        .or_else(|| candidates.first())
        .with_context(|| format!("No Firefox profile with history under {:?}", profiles_dir))?;

    Ok(profile.join("places.sqlite"))
}

/// Copies the (possibly locked) live database, and its WAL file if present,
/// to a scratch location.
pub fn copy_history_database(history_path: &Path, temp_path: Option<&Path>) -> Result<PathBuf> {
    let start_time = Instant::now();
    info!(action = "start", component = "database_copy", "Copying browser history database");

    let temp_path = temp_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| env::temp_dir().join("meaning_scan_history_copy.db"));

    info!(action = "copy", component = "database_copy", source = ?history_path, destination = ?temp_path, "Database copy paths");

    if !history_path.exists() {
        anyhow::bail!("History file not found at {:?}", history_path);
    }

    // Leftovers from an interrupted run would be replayed into the fresh copy.
    remove_history_copy(&temp_path);

    fs::copy(history_path, &temp_path)
        .with_context(|| format!("Failed to copy {:?} to {:?}", history_path, temp_path))?;

    let wal = sidecar(history_path, "-wal");
    if wal.exists() {
        if let Err(e) = fs::copy(&wal, sidecar(&temp_path, "-wal")) {
            remove_history_copy(&temp_path);
            return Err(e).with_context(|| format!("Failed to copy {:?}", wal));
        }
    }

    let copy_time = start_time.elapsed();
    info!(action = "complete", component = "database_copy", duration_ms = copy_time.as_millis(), "Database copy completed");
    Ok(temp_path)
}

/// Removes a copy made by [`copy_history_database`]; failures only warn.
pub fn remove_history_copy(temp_path: &Path) {
    for path in [
        temp_path.to_path_buf(),
        sidecar(temp_path, "-wal"),
        sidecar(temp_path, "-shm"),
    ] {
        if !path.exists() {
            continue;
        }
        if let Err(e) = fs::remove_file(&path) {
            warn!(action = "cleanup", component = "database_copy", path = ?path, error = %e, "Failed to remove temporary file");
        }
    }
}

fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

pub fn get_date_range(conn: &Connection, schema: HistorySchema) -> Result<DateRange> {
    let start_time = Instant::now();
    info!(action = "start", component = "date_range_query", "Querying visit date range");

    let (earliest_timestamp, latest_timestamp): (Option<i64>, Option<i64>) = conn
        .query_row(schema.date_range_query(), [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .context("Failed to query visit dates")?;

    let bounds = earliest_timestamp
        .zip(latest_timestamp)
        .and_then(|(earliest, latest)| schema.to_datetime(earliest).zip(schema.to_datetime(latest)));

    let query_time = start_time.elapsed();
    match bounds {
        Some((earliest_date, latest_date)) => {
            let range = DateRange::new(earliest_date, latest_date);
            info!(
                action = "complete",
                component = "date_range_query",
                earliest_date = %range.earliest,
                latest_date = %range.latest,
                days_between = range.days_between,
                duration_ms = query_time.as_millis(),
                "Date range query completed"
            );
            Ok(range)
        }
        None => {
            warn!(
                action = "complete",
                component = "date_range_query",
                duration_ms = query_time.as_millis(),
                "No visit data found"
            );
            Ok(DateRange::empty())
        }
    }
}

/// Walks history backwards in fixed time windows, newest window first, down to
/// the Unix epoch. Empty windows do not end the walk.
///
/// A failed window is yielded once as an error and ends the sequence.
pub struct HistoryChunks<'conn> {
    conn: &'conn Connection,
    schema: HistorySchema,
    window_ms: i64,
    end_ms: i64,
    failed: bool,
}

impl<'conn> HistoryChunks<'conn> {
    pub fn new(conn: &'conn Connection, schema: HistorySchema, chunk_days: u32) -> Self {
        Self::ending_at(conn, schema, chunk_days, Utc::now())
    }

    pub fn ending_at(
        conn: &'conn Connection,
        schema: HistorySchema,
        chunk_days: u32,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            conn,
            schema,
            window_ms: i64::from(chunk_days.max(1)) * MILLIS_PER_DAY,
            end_ms: end.timestamp_millis(),
            failed: false,
        }
    }

    fn fetch(&self, start_ms: i64, end_ms: i64) -> Result<Vec<HistoryRecord>> {
        let start_time = Instant::now();
        let mut statement = self
            .conn
            .prepare_cached(self.schema.window_query())
            .context("Failed to prepare history window query")?;

        let schema = self.schema;
        let rows = statement
            .query_map(
                params![
                    schema.from_unix_millis(start_ms),
                    schema.from_unix_millis(end_ms),
                    MAX_RESULTS_PER_WINDOW
                ],
                |row| {
                    let id: i64 = row.get(0)?;
                    let url = match row.get_ref(1)? {
                        ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok().map(str::to_owned),
                        _ => None,
                    };
                    let timestamp = match row.get_ref(2)? {
                        ValueRef::Integer(native) => schema.to_unix_millis(native),
                        _ => 0,
                    };
                    Ok((id, url.map(|url| HistoryRecord { url, timestamp })))
                },
            )?
            .collect::<SqliteResult<Vec<_>>>()
            .with_context(|| {
                format!(
                    "Failed to read history window ending {}",
                    DateTime::from_timestamp_millis(end_ms)
                        .map(|d| d.to_rfc3339())
                        .unwrap_or_else(|| end_ms.to_string())
                )
            })?;

        // Rows whose URL is not UTF-8 text are dropped, not fatal.
        let mut records = Vec::with_capacity(rows.len());
        let mut skipped = 0usize;
        for (id, record) in rows {
            match record {
                Some(record) => records.push(record),
                None => {
                    skipped += 1;
                    debug!(action = "skip", component = "history_window", row_id = id, skipped, "Skipped history row with undecodable URL");
                }
            }
        }

        debug!(
            action = "fetch",
            component = "history_window",
            start_ms,
            end_ms,
            record_count = records.len(),
            skipped,
            duration_ms = start_time.elapsed().as_millis(),
            "Fetched history window"
        );
        Ok(records)
    }
}

impl Iterator for HistoryChunks<'_> {
    type Item = Result<Vec<HistoryRecord>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.end_ms <= 0 {
            return None;
        }

        let end_ms = self.end_ms;
        let start_ms = (end_ms - self.window_ms).max(0);
        self.end_ms -= self.window_ms;

        let chunk = self.fetch(start_ms, end_ms);
        self.failed = chunk.is_err();
        Some(chunk)
    }
}
