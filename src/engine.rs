use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static GOOGLE_HOST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(^|\.)google\.[^/]+$").unwrap());
static BING_HOST: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)(^|\.)bing\.com$").unwrap());
static DDG_HOST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(^|\.)duckduckgo\.com$").unwrap());

/// Search engines whose result pages are recognized in history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineId {
    Google,
    Bing,
    Ddg,
}

impl EngineId {
    pub const ALL: [EngineId; 3] = [EngineId::Google, EngineId::Bing, EngineId::Ddg];

    pub fn as_str(self) -> &'static str {
        match self {
            EngineId::Google => "google",
            EngineId::Bing => "bing",
            EngineId::Ddg => "ddg",
        }
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying a hostname.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineClass {
    Engine(EngineId),
    Other,
}

/// Classifies a hostname by suffix. Google is checked first, then Bing, then
/// DuckDuckGo; anything else is `Other`.
pub fn classify(hostname: &str) -> EngineClass {
    if GOOGLE_HOST.is_match(hostname) {
        EngineClass::Engine(EngineId::Google)
    } else if BING_HOST.is_match(hostname) {
        EngineClass::Engine(EngineId::Bing)
    } else if DDG_HOST.is_match(hostname) {
        EngineClass::Engine(EngineId::Ddg)
    } else {
        EngineClass::Other
    }
}
