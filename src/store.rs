//! Persistence for the last scan result.
//!
//! The file holds the same JSON document as the JSON export, so an exported
//! file can be dropped in as a store and vice versa.

use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::aggregate::AggregateResult;

const DEFAULT_STORE_FILE: &str = ".meaning_scan_results.json";

#[derive(Debug, Clone)]
pub struct ResultsStore {
    path: PathBuf,
}

impl ResultsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store in the user's home directory.
    pub fn default_location() -> Result<Self> {
        let home = env::var("HOME")
            .or_else(|_| env::var("USERPROFILE"))
            .context("Neither HOME nor USERPROFILE is set")?;
        Ok(Self::new(PathBuf::from(home).join(DEFAULT_STORE_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the stored result. The document is written next to the target
    /// and renamed over it.
    pub fn save(&self, result: &AggregateResult) -> Result<()> {
        let json = crate::export::to_json(result)?;
        let staging = self.path.with_extension("json.tmp");

        fs::write(&staging, json).with_context(|| format!("Failed to write {:?}", staging))?;
        fs::rename(&staging, &self.path)
            .with_context(|| format!("Failed to move results into {:?}", self.path))?;

        info!(action = "save", component = "results_store", path = ?self.path, phrase_count = result.len(), "Saved scan results");
        Ok(())
    }

    pub fn load(&self) -> Result<Option<AggregateResult>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {:?}", self.path))?;
        let result: AggregateResult = serde_json::from_str(&content)
            .with_context(|| format!("Stored results at {:?} are not valid", self.path))?;

        info!(action = "load", component = "results_store", path = ?self.path, phrase_count = result.len(), "Loaded stored results");
        Ok(Some(result))
    }

    /// Deletes stored results. Returns whether anything was removed.
    pub fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path).with_context(|| format!("Failed to remove {:?}", self.path))?;
        info!(action = "clear", component = "results_store", path = ?self.path, "Cleared stored results");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> AggregateResult {
        let mut result = AggregateResult::default();
        result.counts.insert("ennui".to_string(), 4);
        result
            .examples
            .insert("ennui".to_string(), vec!["https://bing.com/search?q=ennui+meaning".to_string()]);
        result
    }

    #[test]
    fn test_load_missing_store() {
        let dir = TempDir::new().unwrap();
        let store = ResultsStore::new(dir.path().join("results.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = ResultsStore::new(dir.path().join("results.json"));

        store.save(&sample()).unwrap();

        assert_eq!(store.load().unwrap(), Some(sample()));
        assert!(!dir.path().join("results.json.tmp").exists());
    }

    #[test]
    fn test_save_replaces_previous_result() {
        let dir = TempDir::new().unwrap();
        let store = ResultsStore::new(dir.path().join("results.json"));

        store.save(&sample()).unwrap();
        store.save(&AggregateResult::default()).unwrap();

        assert_eq!(store.load().unwrap(), Some(AggregateResult::default()));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = ResultsStore::new(dir.path().join("results.json"));
        store.save(&sample()).unwrap();

        assert!(store.clear().unwrap());
        assert!(!store.clear().unwrap());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_store_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");
        fs::write(&path, "{not json").unwrap();

        assert!(ResultsStore::new(path).load().is_err());
    }
}
