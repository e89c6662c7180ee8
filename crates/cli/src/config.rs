//! Configuration loading from roiwidget.toml.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use auth::KeyList;
use runtime::WidgetConfig;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub widget: WidgetSection,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Reported to clients in `initialize`.
    #[serde(default = "default_name")]
    pub name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthConfig {
    /// Key name to accepted secret.
    #[serde(default)]
    pub keys: BTreeMap<String, String>,

    /// Also accept the value of this environment variable.
    pub env_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WidgetSection {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_teardown_grace_ms")]
    pub teardown_grace_ms: u64,

    /// Serve widget templates from this directory instead of the built-in one.
    pub assets_dir: Option<PathBuf>,
}

impl Default for WidgetSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            teardown_grace_ms: default_teardown_grace_ms(),
            assets_dir: None,
        }
    }
}

fn default_name() -> String {
    "roi-calculator".to_string()
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_teardown_grace_ms() -> u64 {
    2000
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        if config.widget.debounce_ms == 0 {
            return Err(ConfigError::Invalid("widget.debounce_ms must be > 0".to_string()));
        }
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Build the key list, including the environment key when it is set.
    pub fn key_list(&self) -> KeyList {
        let mut keys = KeyList {
            keys: self.auth.keys.clone(),
        };
        let env_secret = self
            .auth
            .env_key
            .as_ref()
            .and_then(|var| Some((var, std::env::var(var).ok()?)))
            .filter(|(_, secret)| !secret.is_empty());
        if let Some((var, secret)) = env_secret {
            keys = keys.with_key(var.clone(), secret);
        }
        keys
    }

    pub fn widget_config(&self) -> WidgetConfig {
        WidgetConfig {
            debounce: Duration::from_millis(self.widget.debounce_ms),
        }
    }

    pub fn teardown_grace(&self) -> Duration {
        Duration::from_millis(self.widget.teardown_grace_ms)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}
