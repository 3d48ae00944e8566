use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::engine::EngineId;

#[derive(Parser, Debug)]
#[command(
    name = "meaning-scan",
    about = "Find the words you looked up with \"<word> meaning\" searches in your browser history",
    version,
    long_about = None
)]
pub struct Args {
    /// Browser to analyze (vivaldi, chrome, chromium, brave, edge, firefox)
    #[arg(short, long)]
    pub browser: Option<String>,

    /// History database to read instead of the browser's default location
    #[arg(long, value_name = "PATH")]
    pub history: Option<PathBuf>,

    /// Search engine to include; repeat for several
    #[arg(short, long, value_enum)]
    pub engine: Vec<EngineChoice>,

    /// Stop after evaluating this many history entries
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Days of history fetched per window
    #[arg(long)]
    pub chunk_days: Option<u32>,

    /// Number of phrases to display
    #[arg(short, long)]
    pub top: Option<usize>,

    /// Write results as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Write phrase counts as CSV to this file
    #[arg(long, value_name = "FILE")]
    pub csv: Option<PathBuf>,

    /// Show the stored results of the last scan instead of scanning
    #[arg(long, conflicts_with = "clear")]
    pub cached: bool,

    /// Delete stored results and exit
    #[arg(long)]
    pub clear: bool,

    /// Do not store the scan result
    #[arg(long)]
    pub no_save: bool,

    /// Results store location
    #[arg(long, value_name = "FILE")]
    pub store: Option<PathBuf>,

    /// Custom temporary file path for database copy
    #[arg(long)]
    pub temp_path: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Mask phrases in the terminal report
    #[arg(long)]
    pub redact: bool,

    /// Initialize meaning_scan.toml with default settings
    #[arg(long)]
    pub init: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EngineChoice {
    Google,
    Bing,
    Ddg,
    All,
}

impl EngineChoice {
    /// Expands choices into a sorted, duplicate-free engine list.
    pub fn resolve(choices: &[EngineChoice]) -> Vec<EngineId> {
        let mut engines: Vec<EngineId> = choices
            .iter()
            .flat_map(|choice| match choice {
                EngineChoice::Google => vec![EngineId::Google],
                EngineChoice::Bing => vec![EngineId::Bing],
                EngineChoice::Ddg => vec![EngineId::Ddg],
                EngineChoice::All => EngineId::ALL.to_vec(),
            })
            .collect();
        engines.sort();
        engines.dedup();
        engines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_choices_resolve() {
        assert_eq!(
            EngineChoice::resolve(&[EngineChoice::Ddg, EngineChoice::Google, EngineChoice::Ddg]),
            vec![EngineId::Google, EngineId::Ddg]
        );
        assert_eq!(
            EngineChoice::resolve(&[EngineChoice::All, EngineChoice::Bing]),
            EngineId::ALL.to_vec()
        );
    }

    #[test]
    fn test_repeated_engine_flags() {
        let args = Args::parse_from(["meaning-scan", "-e", "google", "--engine", "ddg"]);
        assert_eq!(args.engine, vec![EngineChoice::Google, EngineChoice::Ddg]);
    }

    #[test]
    fn test_cached_conflicts_with_clear() {
        assert!(Args::try_parse_from(["meaning-scan", "--cached", "--clear"]).is_err());
    }
}
