//! Service configuration
//!
//! Read from a YAML file given by `--config` or `DRIFTWATCH_CONFIG`; every
//! field has a default so an empty or missing file is valid.

use anyhow::{Context, Result};
use driftwatch_pipeline::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const TAVILY_ENV: &str = "TAVILY_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the SQLite databases
    pub data_dir: PathBuf,
    /// HTTP listen address for `serve`
    pub listen: SocketAddr,
    /// Tracing filter used when `RUST_LOG` is unset
    pub log_level: String,
    pub model: ModelConfig,
    pub knowledge: KnowledgeConfig,
    pub search: SearchConfig,
}

/// Model call timeout and retry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub timeout_secs: u64,
}

/// Knowledge index initialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    pub init_attempts: u32,
    pub init_backoff_ms: u64,
}

/// Web search for the research router
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Tavily API key; falls back to `TAVILY_API_KEY`
    pub tavily_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            listen: SocketAddr::from(([127, 0, 0, 1], 8000)),
            log_level: "info".to_string(),
            model: ModelConfig::default(),
            knowledge: KnowledgeConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            attempts: policy.attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            timeout_secs: policy.timeout.as_secs(),
        }
    }
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            init_attempts: 3,
            init_backoff_ms: 1000,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".driftwatch"))
        .unwrap_or_else(|| PathBuf::from(".driftwatch"))
}

impl Config {
    /// Load from `path`, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Self::from_yaml(&text)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            None => Self::default(),
        };

        if config.search.tavily_api_key.is_none() {
            config.search.tavily_api_key = std::env::var(TAVILY_ENV).ok().filter(|k| !k.is_empty());
        }

        debug!("Loaded config: data_dir={}", config.data_dir.display());
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("driftwatch.db")
    }

    pub fn knowledge_path(&self) -> PathBuf {
        self.data_dir.join("knowledge.db")
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.model.attempts.max(1),
            base_delay: Duration::from_millis(self.model.base_delay_ms),
            timeout: Duration::from_secs(self.model.timeout_secs.max(1)),
        }
    }
}
