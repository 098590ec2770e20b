//! Configuration loader and validator for the curator client.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::feed::DEFAULT_PAGE_SIZE;
use crate::import::DEFAULT_IMPORT_LIMIT;

/// Environment variable that overrides `api.base_url`.
pub const API_URL_ENV: &str = "CURA_API_URL";

/// Largest page the service accepts for `collections/{id}/videos`.
pub const MAX_PAGE_SIZE: u32 = 100;

const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub feed: Feed,
    #[serde(default)]
    pub import: Import,
}

/// Remote service settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Api {
    pub base_url: String,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/".to_string(),
        }
    }
}

/// Feed paging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Feed {
    pub page_size: u32,
}

impl Default for Feed {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Channel import settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Import {
    pub channel_limit: u32,
}

impl Default for Import {
    fn default() -> Self {
        Self {
            channel_limit: DEFAULT_IMPORT_LIMIT,
        }
    }
}

impl Config {
    /// Parsed service origin. Only valid after `validate` succeeded.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(self.api.base_url.trim())
            .map_err(|_| ConfigError::Invalid("api.base_url must be a valid URL"))
    }

    fn apply_env(&mut self) {
        self.override_base_url(std::env::var(API_URL_ENV).ok());
    }

    fn override_base_url(&mut self, url: Option<String>) {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.api.base_url = url;
        }
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory,
///   falling back to built-in defaults when that file does not exist.
/// - `CURA_API_URL` overrides `api.base_url` in every case.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut cfg = match path {
        Some(path) => parse(&fs::read_to_string(path)?)?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                parse(&fs::read_to_string(default_path)?)?
            } else {
                Config::default()
            }
        }
    };
    cfg.apply_env();
    validate(&cfg)?;
    Ok(cfg)
}

fn parse(content: &str) -> Result<Config, ConfigError> {
    Ok(serde_yaml::from_str(content)?)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.api.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("api.base_url must be non-empty"));
    }
    let url = cfg.base_url()?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid("api.base_url must use http or https"));
    }

    if cfg.feed.page_size == 0 {
        return Err(ConfigError::Invalid("feed.page_size must be > 0"));
    }
    if cfg.feed.page_size > MAX_PAGE_SIZE {
        return Err(ConfigError::Invalid("feed.page_size must be <= 100"));
    }

    if cfg.import.channel_limit == 0 {
        return Err(ConfigError::Invalid("import.channel_limit must be > 0"));
    }

    Ok(())
}

/// Returns the example YAML content.
pub fn example() -> &'static str {
    r#"api:
  base_url: "http://localhost:8000/api/"

feed:
  page_size: 20

import:
  channel_limit: 5000
"#
}
