//! Run configuration.
//!
//! [`ForgeConfig`] is read from an optional TOML file and then overridden by
//! `SKILLFORGE_*` environment variables. Every field has a default, so an
//! empty file (or none at all) is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{ForgeError, Result};
use crate::stages::executor::ExecutorConfig;

pub const ENV_OUTPUT_DIR: &str = "SKILLFORGE_OUTPUT_DIR";
pub const ENV_MAX_ROUNDS: &str = "SKILLFORGE_MAX_ROUNDS";
pub const ENV_TOOL_TIMEOUT_SECS: &str = "SKILLFORGE_TOOL_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForgeConfig {
    /// Root for generated artifacts.
    pub output_dir: PathBuf,
    /// Stored skills; defaults to `<output_dir>/skills`.
    pub skills_dir: Option<PathBuf>,
    /// Run side artifacts; defaults to `<output_dir>/runs`.
    pub runs_dir: Option<PathBuf>,
    /// Generate/simulate/validate rounds before giving up.
    pub max_rounds: u32,
    /// Capacity of the event channel between a run and its consumer.
    pub stream_buffer: usize,
    pub trending_window_days: u32,
    pub trending_min_stars: u64,
    pub trending_limit: usize,
    /// Stored skills fed to the generator as context.
    pub local_context_limit: usize,
    /// Upper bound for any single tool call; unbounded when unset.
    pub tool_timeout_secs: Option<u64>,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            skills_dir: None,
            runs_dir: None,
            max_rounds: 2,
            stream_buffer: 64,
            trending_window_days: 30,
            trending_min_stars: 100,
            trending_limit: 20,
            local_context_limit: 3,
            tool_timeout_secs: None,
        }
    }
}

impl ForgeConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ForgeError::Config(e.to_string()))?;
        config.validate()
    }

    /// Load from `path`, or defaults when `path` is `None`, then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    ForgeError::Config(format!("{}: {e}", path.display()))
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `SKILLFORGE_*` overrides fetched through `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(dir) = lookup(ENV_OUTPUT_DIR) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_MAX_ROUNDS) {
            self.max_rounds = raw
                .trim()
                .parse()
                .map_err(|_| ForgeError::Config(format!("{ENV_MAX_ROUNDS}: not a number: {raw}")))?;
        }
        if let Some(raw) = lookup(ENV_TOOL_TIMEOUT_SECS) {
            let secs = raw.trim().parse().map_err(|_| {
                ForgeError::Config(format!("{ENV_TOOL_TIMEOUT_SECS}: not a number: {raw}"))
            })?;
            self.tool_timeout_secs = Some(secs);
        }
        self.validate()
    }

    fn validate(self) -> Result<Self> {
        if self.max_rounds == 0 {
            return Err(ForgeError::Config("max_rounds must be at least 1".into()));
        }
        if self.stream_buffer == 0 {
            return Err(ForgeError::Config("stream_buffer must be at least 1".into()));
        }
        Ok(self)
    }

    pub fn skills_dir(&self) -> PathBuf {
        self.skills_dir
            .clone()
            .unwrap_or_else(|| self.output_dir.join("skills"))
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.runs_dir
            .clone()
            .unwrap_or_else(|| self.output_dir.join("runs"))
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_secs.map(Duration::from_secs)
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            runs_dir: self.runs_dir(),
            trending_window_days: self.trending_window_days,
            trending_min_stars: self.trending_min_stars,
            trending_limit: self.trending_limit,
            ..ExecutorConfig::default()
        }
    }
}
