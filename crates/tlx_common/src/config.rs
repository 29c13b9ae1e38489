//! tinyllamax configuration
//!
//! Configuration lives in ~/.config/tinyllamax/config.toml. Every field has a
//! default, so a missing file is fine. Environment variables with the
//! `TINYLLAMAX_` prefix override the file.

use crate::backend::{DEFAULT_MODEL, DEFAULT_OLLAMA_ENDPOINT};
use crate::paths;
use crate::shell::{DEFAULT_SUMMARY_LINES, DEFAULT_TIMEOUT_SECS};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "TINYLLAMAX_";

/// Intent decision backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Fake,
    Ollama,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Fake => "fake",
            BackendKind::Ollama => "ollama",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fake" => Ok(BackendKind::Fake),
            "ollama" => Ok(BackendKind::Ollama),
            _ => anyhow::bail!("Unknown backend '{}' (expected fake or ollama)", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// History database file
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,

    /// Record simulate/execute runs in the history
    #[serde(default = "default_true")]
    pub history_enabled: bool,

    /// Records kept by `history cleanup` when no count is given
    #[serde(default = "default_history_keep")]
    pub history_keep: usize,

    /// Lines kept in output summaries
    #[serde(default = "default_summary_lines")]
    pub summary_lines: usize,

    /// Subprocess timeout (valid: 1-300)
    #[serde(default = "default_shell_timeout")]
    pub shell_timeout_secs: u64,

    /// Distro id to plan for instead of /etc/os-release
    #[serde(default)]
    pub default_distro: Option<String>,

    #[serde(default)]
    pub backend: BackendKind,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_ollama_endpoint")]
    pub ollama_endpoint: String,
}

fn default_history_path() -> PathBuf {
    paths::default_history_path()
}

fn default_true() -> bool {
    true
}

fn default_history_keep() -> usize {
    1000
}

fn default_summary_lines() -> usize {
    DEFAULT_SUMMARY_LINES
}

fn default_shell_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_ollama_endpoint() -> String {
    DEFAULT_OLLAMA_ENDPOINT.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            history_path: default_history_path(),
            history_enabled: true,
            history_keep: default_history_keep(),
            summary_lines: default_summary_lines(),
            shell_timeout_secs: default_shell_timeout(),
            default_distro: None,
            backend: BackendKind::default(),
            model: default_model(),
            ollama_endpoint: default_ollama_endpoint(),
        }
    }
}

impl AppConfig {
    /// Defaults, then the config file, then environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&paths::default_config_path())?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load from a TOML file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Apply `TINYLLAMAX_*` overrides from the given lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(path) = var("HISTORY_PATH") {
            self.history_path = PathBuf::from(path);
        }
        if let Some(enabled) = var("HISTORY_ENABLED") {
            self.history_enabled = parse_bool(&enabled)
                .with_context(|| format!("Invalid {}HISTORY_ENABLED", ENV_PREFIX))?;
        }
        if let Some(distro) = var("DISTRO") {
            let distro = distro.trim().to_lowercase();
            self.default_distro = (!distro.is_empty()).then_some(distro);
        }
        if let Some(backend) = var("BACKEND") {
            self.backend = backend.parse()?;
        }
        if let Some(model) = var("MODEL") {
            self.model = model;
        }
        if let Some(endpoint) = var("OLLAMA_ENDPOINT") {
            self.ollama_endpoint = endpoint;
        }

        Ok(())
    }

    /// Clamp shell_timeout_secs to the valid range (1-300)
    pub fn effective_shell_timeout(&self) -> Duration {
        Duration::from_secs(self.shell_timeout_secs.clamp(1, DEFAULT_TIMEOUT_SECS))
    }

    /// At least one summary line
    pub fn effective_summary_lines(&self) -> usize {
        self.summary_lines.max(1)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected a boolean, got '{}'", other),
    }
}
