//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::application::errors::ConfigError;

/// Bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub bot: BotConfig,
    pub plugins: PluginsConfig,
    pub database: DatabaseConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotConfig {
    pub name: String,
    pub prefix: String,
    /// Owner identity (phone-number-equivalent); empty disables owner bypass
    pub owner_number: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PluginsConfig {
    pub directory: PathBuf,
    pub auto_load: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LimitsConfig {
    /// How long an inbound message id is remembered for de-duplication
    pub dedup_window_seconds: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "relaybot".to_string(),
            prefix: "!".to_string(),
            owner_number: String::new(),
        }
    }
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./plugins"),
            auto_load: true,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/relaybot.db"),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            dedup_window_seconds: 60,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig::default(),
            plugins: PluginsConfig::default(),
            database: DatabaseConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    /// Build a config from environment variables over the defaults
    pub fn load_env() -> Self {
        let mut config = Self::default();

        if let Ok(name) = std::env::var("BOT_NAME") {
            config.bot.name = name;
        }
        if let Ok(prefix) = std::env::var("PREFIX") {
            config.bot.prefix = prefix;
        }
        if let Ok(owner) = std::env::var("OWNER_NUMBER") {
            config.bot.owner_number = owner;
        }
        if let Ok(dir) = std::env::var("PLUGINS_DIR") {
            config.plugins.directory = PathBuf::from(dir);
        }
        if let Ok(path) = std::env::var("DB_PATH") {
            config.database.path = PathBuf::from(path);
        }
        if let Ok(window) = std::env::var("DEDUP_WINDOW_SECONDS") {
            if let Ok(seconds) = window.parse() {
                config.limits.dedup_window_seconds = seconds;
            }
        }

        config
    }
}
