//! Configuration schema, TOML loading, and override merging.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_DEBOUNCE_MS: u64 = 2000;
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse config {path}: {reason}")]
    Parse { path: String, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Quiet period after the last edit before an autosave commits.
    pub debounce_ms: u64,
    /// Newest entries shown by the history view.
    pub history_limit: usize,
    /// Suppress saves whose content equals the last successful save.
    /// Off by default: every quiet-period commit appends, keeping history
    /// length an observable record of save activity.
    pub skip_unchanged: bool,
    /// Persist pending changes once when the session closes, so a restore
    /// followed immediately by navigation is not lost.
    pub flush_on_close: bool,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            skip_unchanged: false,
            flush_on_close: true,
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub stdout: bool,
    pub stdout_format: LogFormat,
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            stdout: true,
            stdout_format: LogFormat::Compact,
            filter: None,
        }
    }
}

/// Partial config from a file or environment, merged over defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverride {
    pub debounce_ms: Option<u64>,
    pub history_limit: Option<usize>,
    pub skip_unchanged: Option<bool>,
    pub flush_on_close: Option<bool>,
    pub logging: Option<LoggingOverride>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingOverride {
    pub stdout: Option<bool>,
    pub stdout_format: Option<LogFormat>,
    pub filter: Option<String>,
}

impl ConfigOverride {
    pub fn apply_to(&self, target: &mut Config) {
        if let Some(ms) = self.debounce_ms {
            target.debounce_ms = ms;
        }
        if let Some(limit) = self.history_limit {
            target.history_limit = limit;
        }
        if let Some(skip) = self.skip_unchanged {
            target.skip_unchanged = skip;
        }
        if let Some(flush) = self.flush_on_close {
            target.flush_on_close = flush;
        }
        if let Some(logging) = self.logging.as_ref() {
            logging.apply_to(&mut target.logging);
        }
    }
}

impl LoggingOverride {
    pub fn apply_to(&self, target: &mut LoggingConfig) {
        if let Some(stdout) = self.stdout {
            target.stdout = stdout;
        }
        if let Some(format) = self.stdout_format {
            target.stdout_format = format;
        }
        if let Some(filter) = self.filter.as_ref() {
            target.filter = Some(filter.clone());
        }
    }
}

pub fn load_file(path: &Path) -> Result<Option<ConfigOverride>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    toml::from_str(&contents)
        .map(Some)
        .map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}

/// Defaults, then the config file (if any), then environment overrides.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = Config::default();
    if let Some(path) = path
        && let Some(layer) = load_file(path)?
    {
        layer.apply_to(&mut config);
    }
    apply_env_overrides(&mut config);
    Ok(config)
}

fn apply_env_overrides(config: &mut Config) {
    apply_env_from(config, |key| std::env::var(key).ok());
}

/// Env application with an injected lookup, so tests never touch the
/// process environment.
fn apply_env_from(config: &mut Config, get: impl Fn(&str) -> Option<String>) {
    if let Some(ms) = get("DRAFTLOG_DEBOUNCE_MS").and_then(|raw| parse_value(&raw)) {
        config.debounce_ms = ms;
    }
    if let Some(limit) = get("DRAFTLOG_HISTORY_LIMIT").and_then(|raw| parse_value(&raw)) {
        config.history_limit = limit;
    }
    if let Some(skip) = get("DRAFTLOG_SKIP_UNCHANGED").and_then(|raw| parse_bool(&raw)) {
        config.skip_unchanged = skip;
    }
    if let Some(flush) = get("DRAFTLOG_FLUSH_ON_CLOSE").and_then(|raw| parse_bool(&raw)) {
        config.flush_on_close = flush;
    }
}

fn parse_value<T: std::str::FromStr>(raw: &str) -> Option<T> {
    raw.trim().parse().ok()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
