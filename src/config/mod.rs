//! Typed configuration for the taskgroup binary.
//!
//! Values come from an optional TOML file, then environment variables on top.
//! Malformed values fail fast.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Concurrency cap for dispatchers; 0 means unbounded.
    pub limit: usize,
    /// Overall run timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Deepest directory level a walk descends into.
    pub max_depth: Option<usize>,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limit: 8,
            timeout_ms: None,
            max_depth: None,
            otel_endpoint: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables over the defaults.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Self::default().merge_lookup(|key| std::env::var(key).ok())
    }

    /// Load a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config file {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
            .map_err(|e| Error::Config(format!("bad config file {}: {e}", path.display())))?
            .merge_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Build configuration from an arbitrary key lookup over the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Self::default().merge_lookup(lookup)
    }

    fn merge_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(limit) = parsed(&lookup, "TASKGROUP_LIMIT")? {
            self.limit = limit;
        }
        if let Some(timeout_ms) = parsed(&lookup, "TASKGROUP_TIMEOUT_MS")? {
            self.timeout_ms = Some(timeout_ms);
        }
        if let Some(max_depth) = parsed(&lookup, "TASKGROUP_MAX_DEPTH")? {
            self.max_depth = Some(max_depth);
        }
        if let Some(endpoint) = lookup("OTEL_ENDPOINT").filter(|v| !v.is_empty()) {
            self.otel_endpoint = Some(endpoint);
        }
        if let Some(level) = lookup("LOG_LEVEL").filter(|v| !v.is_empty()) {
            self.log_level = level;
        }
        Ok(self)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("invalid value for {name} ({raw:?}): {e}"))),
    }
}
