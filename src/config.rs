use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::info;

use crate::args::{Args, EngineChoice};
use crate::engine::EngineId;

// Written by `--init` and used when no config file is present.
const DEFAULT_CONFIG: &str = include_str!("../default_config.toml");

pub const DEFAULT_CONFIG_FILE: &str = "meaning_scan.toml";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("chunk_days must be greater than 0")]
    ZeroChunkDays,

    #[error("top must be greater than 0")]
    ZeroTop,

    #[error("limit must be greater than 0")]
    ZeroLimit,

    #[error("at least one search engine must be enabled")]
    NoEngines,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_browser")]
    pub browser: String,

    #[serde(default = "default_engines")]
    pub engines: Vec<EngineId>,

    #[serde(default = "default_chunk_days")]
    pub chunk_days: u32,

    #[serde(default)]
    pub limit: Option<usize>,

    #[serde(default = "default_top")]
    pub top: usize,

    #[serde(default)]
    pub store: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser: default_browser(),
            engines: default_engines(),
            chunk_days: default_chunk_days(),
            limit: None,
            top: default_top(),
            store: None,
        }
    }
}

fn default_browser() -> String {
    "chrome".to_string()
}

fn default_engines() -> Vec<EngineId> {
    EngineId::ALL.to_vec()
}

fn default_chunk_days() -> u32 {
    30
}

fn default_top() -> usize {
    25
}

impl Config {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse configuration")
    }

    /// Command-line values win over file values.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(browser) = &args.browser {
            self.browser = browser.clone();
        }
        if !args.engine.is_empty() {
            self.engines = EngineChoice::resolve(&args.engine);
        }
        if let Some(chunk_days) = args.chunk_days {
            self.chunk_days = chunk_days;
        }
        if args.limit.is_some() {
            self.limit = args.limit;
        }
        if let Some(top) = args.top {
            self.top = top;
        }
        if let Some(store) = &args.store {
            self.store = Some(store.clone());
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.chunk_days == 0 {
            return Err(ConfigError::ZeroChunkDays);
        }
        if self.top == 0 {
            return Err(ConfigError::ZeroTop);
        }
        if self.limit == Some(0) {
            return Err(ConfigError::ZeroLimit);
        }
        if self.engines.is_empty() {
            return Err(ConfigError::NoEngines);
        }
        Ok(())
    }
}

/// Loads the explicit file if given, else `meaning_scan.toml` in the working
/// directory, else the embedded defaults.
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let start_time = Instant::now();

    let config = if let Some(path) = config_path {
        info!(action = "load", component = "config_file", file_path = ?path, "Loading configuration from specified file");
        if !path.exists() {
            anyhow::bail!("Config file not found: {:?}", path);
        }
        let content = fs::read_to_string(path)?;
        Config::parse(&content).with_context(|| format!("Invalid config file {:?}", path))?
    } else {
        let default_file = Path::new(DEFAULT_CONFIG_FILE);
        if default_file.exists() {
            info!(action = "load", component = "default_config_file", file_path = ?default_file, "Loading configuration from default file");
            let content = fs::read_to_string(default_file)?;
            Config::parse(&content)
                .with_context(|| format!("Invalid config file {:?}", default_file))?
        } else {
            info!(
                action = "load",
                component = "embedded_config",
                "Using embedded default configuration"
            );
            Config::parse(DEFAULT_CONFIG).context("Embedded default configuration is invalid")?
        }
    };

    info!(
        action = "complete",
        component = "config_loading",
        browser = %config.browser,
        chunk_days = config.chunk_days,
        duration_ms = start_time.elapsed().as_millis(),
        "Configuration loaded"
    );
    Ok(config)
}

pub fn init_default_config() -> Result<()> {
    let default_file = Path::new(DEFAULT_CONFIG_FILE);

    if default_file.exists() {
        anyhow::bail!(
            "{} already exists. Remove it first if you want to reinitialize.",
            DEFAULT_CONFIG_FILE
        );
    }

    fs::write(default_file, DEFAULT_CONFIG)?;
    println!("Created {} with default settings", DEFAULT_CONFIG_FILE);

    Ok(())
}
