//! Configuration loading from TOML with environment variable overrides.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! section has defaults, so a missing file or a partial file is fine.
//! A handful of `TICKERBOARD_*` variables override the file afterwards.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::sort::SortDescriptor;

const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
const DEFAULT_CURRENCY_PATH: &str = "/currency";
const DEFAULT_MARKET_PATH: &str = "/market";
const DEFAULT_USER_AGENT: &str = "TICKERBOARD/0.1.0";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub source: SourceConfig,
    pub refresh: RefreshConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub currency_path: String,
    pub market_path: String,
    /// Sent as the `username` query parameter when set.
    pub username: Option<String>,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            currency_path: DEFAULT_CURRENCY_PATH.to_string(),
            market_path: DEFAULT_MARKET_PATH.to_string(),
            username: None,
            timeout_secs: 15,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Where rows come from.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Http,
    Fixture,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Http => write!(f, "http"),
            SourceKind::Fixture => write!(f, "fixture"),
        }
    }
}

impl FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "http" => Ok(SourceKind::Http),
            "fixture" | "mock" => Ok(SourceKind::Fixture),
            other => bail!("Unknown data source: {other}"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Simulated latency for the fixture source.
    pub fixture_latency_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Http,
            fixture_latency_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RefreshConfig {
    pub currency_interval_secs: u64,
    pub market_interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            currency_interval_secs: 300,
            market_interval_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DisplayConfig {
    /// Sort descriptor token, e.g. `volume_desc`. Empty = server order.
    pub sort: String,
    /// Max rows printed per snapshot (0 = all).
    pub limit: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            sort: "volume_desc".to_string(),
            limit: 0,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise start from defaults. Environment
    /// overrides are applied in both cases.
    pub fn load_or_default(path: &str) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::load(path)?
        } else {
            info!(path, "No config file found, using defaults");
            Self::default()
        };
        config.apply_overrides(non_empty_var)?;
        Ok(config)
    }

    /// Apply `TICKERBOARD_*` overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("TICKERBOARD_API_URL") {
            self.api.base_url = url;
        }
        if let Some(user) = lookup("TICKERBOARD_USERNAME") {
            self.api.username = Some(user);
        }
        if let Some(source) = lookup("TICKERBOARD_SOURCE") {
            self.source.kind = source.parse()?;
        }
        if let Some(sort) = lookup("TICKERBOARD_SORT") {
            self.display.sort = sort;
        }
        self.validate()
    }

    /// Reject values that would make the refresh loop or client unusable.
    pub fn validate(&self) -> Result<()> {
        if self.source.kind == SourceKind::Http && self.api.base_url.trim().is_empty() {
            bail!("api.base_url must be set for the http source");
        }
        if self.api.timeout_secs == 0 {
            bail!("api.timeout_secs must be greater than zero");
        }
        if self.refresh.currency_interval_secs == 0 || self.refresh.market_interval_secs == 0 {
            bail!("refresh intervals must be greater than zero");
        }
        Ok(())
    }

    /// Non-fatal problems worth logging at startup.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.display.sort.is_empty() {
            if let Err(e) = self.display.sort.parse::<SortDescriptor>() {
                warnings.push(format!(
                    "display.sort \"{}\" will be ignored: {e}",
                    self.display.sort
                ));
            }
        }
        warnings
    }
}

/// Value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
