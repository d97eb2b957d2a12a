use serde::{Deserialize, Serialize};

use super::platform;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Endpoint the assistant's search client posts to.  Defaults to the
    /// locally hosted backend.
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Timeout for the server-side oembed metadata lookup.
    #[serde(default = "default_oembed_timeout_secs")]
    pub oembed_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Case-insensitive keyword an input's placeholder must contain to be
    /// picked up by the assistant.
    #[serde(default = "default_placeholder_keyword")]
    pub placeholder_keyword: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            max_results: default_max_results(),
            oembed_timeout_secs: default_oembed_timeout_secs(),
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            placeholder_keyword: default_placeholder_keyword(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8988
}

fn default_search_endpoint() -> String {
    format!("http://{}:{}/youtube-search", default_bind_address(), default_port())
}

fn default_max_results() -> usize {
    10
}

fn default_oembed_timeout_secs() -> u64 {
    10
}

fn default_placeholder_keyword() -> String {
    "YouTube".to_string()
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
