//! Configuration management.
//!
//! TOML file under the platform config directory, with serde defaults so a
//! missing file or section behaves sensibly. The API key is never written
//! to the file by default; it is read from the environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Chat-completion provider settings
    #[serde(default)]
    pub llm: LlmConfig,
    /// Google Calendar settings
    #[serde(default)]
    pub calendar: CalendarConfig,
    /// Goal store settings
    #[serde(default)]
    pub goals: GoalsConfig,
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model for the main chat turn
    #[serde(default = "default_model")]
    pub model: String,
    /// Model for the one-shot regeneration when the first reply stalls
    #[serde(default = "default_regen_model")]
    pub regen_model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Optional inline key; the OPENAI_API_KEY env var wins when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_regen_model() -> String {
    "gpt-5".to_string()
}

fn default_max_tokens() -> u32 {
    250
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            regen_model: default_regen_model(),
            max_tokens: default_max_tokens(),
            api_key: None,
        }
    }
}

impl LlmConfig {
    pub fn api_key(&self) -> Result<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .context("No API key configured; set OPENAI_API_KEY or [llm].api_key")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Authorized-user token file; defaults to token.json in the data dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_path: Option<PathBuf>,
    /// Reference timezone for presets and time rendering (IANA name)
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Cap on events fetched per lookup
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_max_results() -> u32 {
    50
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            token_path: None,
            timezone: default_timezone(),
            max_results: default_max_results(),
        }
    }
}

impl CalendarConfig {
    pub fn token_path(&self) -> Result<PathBuf> {
        match &self.token_path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("token.json")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalsConfig {
    /// Goal store file; defaults to goals.json in the data dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl GoalsConfig {
    pub fn file(&self) -> Result<PathBuf> {
        if let Ok(path) = std::env::var("GOALS_FILE") {
            if !path.trim().is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
        match &self.file {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("goals.json")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating it with defaults on first run.
    pub fn load() -> Result<Self> {
        let config_path = config_path()?;

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            let config: Config = toml::from_str(&contents)
                .context("Failed to parse config file")?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to file.
    pub fn save(&self) -> Result<()> {
        let config_path = config_path()?;
        let parent = config_path.parent().context("Config path has no parent")?;

        std::fs::create_dir_all(parent).context("Failed to create config directory")?;

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents).context("Failed to write config file")?;

        Ok(())
    }
}

/// Get the configuration file path.
pub fn config_path() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "dolma", "dolma")
        .context("Failed to get project directories")?;
    Ok(base.config_dir().join("config.toml"))
}

/// Get the data directory path.
pub fn data_dir() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "dolma", "dolma")
        .context("Failed to get project directories")?;
    Ok(base.data_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_parse_from_empty_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.max_tokens, 250);
        assert_eq!(config.calendar.timezone, "UTC");
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [calendar]
            timezone = "Australia/Sydney"
            "#,
        )
        .unwrap();
        assert_eq!(config.calendar.timezone, "Australia/Sydney");
        assert_eq!(config.calendar.max_results, 50);
    }
}
