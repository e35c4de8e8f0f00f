use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use tracing::debug;

/// Environment variable naming the config file when `--config` is absent.
pub const CONFIG_ENV: &str = "CHARTLOCK_CONFIG";

const APP_DIR: &str = "chartlock";

#[derive(clap::ValueEnum, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    #[value(name = "yaml")]
    Yaml,
    #[value(name = "json")]
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub repository_cache: PathBuf,
    pub repository_config: PathBuf,
    pub log_level: String,
    pub output: OutputFormat,
}

#[derive(Default, Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    #[serde(default)]
    pub repository_cache: Option<PathBuf>,
    #[serde(default)]
    pub repository_config: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub output: OutputFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_repository_cache() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("repository")
}

fn default_repository_config() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("repositories.yaml")
}

impl UserConfig {
    /// Read the config file at `path`, or `CHARTLOCK_CONFIG` when `path` is
    /// `None`. No file at all means defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(path) => PathBuf::from(path),
                None => return Ok(Self::from_defaults()),
            },
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        // an empty document deserializes as null
        if content.trim().is_empty() {
            return Ok(Self::from_defaults());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    fn from_defaults() -> Self {
        Self {
            log_level: default_log_level(),
            ..Default::default()
        }
    }

    /// Fill every unset value with its default.
    pub fn resolve(self) -> Config {
        let config = Config {
            repository_cache: self.repository_cache.unwrap_or_else(default_repository_cache),
            repository_config: self
                .repository_config
                .unwrap_or_else(default_repository_config),
            log_level: self.log_level,
            output: self.output,
        };
        debug!("config {:?}", config);
        config
    }
}
