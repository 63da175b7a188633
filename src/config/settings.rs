//! TOML-based configuration for statsq.
//!
//! Supports a config file (statsq.toml) with environment variable expansion
//! in catalog paths.
//!
//! Example configuration:
//! ```toml
//! [query]
//! max_retry = 3
//! slow_query_threshold_ms = 2000
//! default_window_days = 7
//! dialect = "duckdb"
//!
//! [catalogs]
//! billing = "${STATSQ_HOME}/catalogs/billing.toml"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::normalize::DEFAULT_WINDOW_DAYS;
use crate::sql::Dialect;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "STATSQ_CONFIG";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unsupported dialect: {0}")]
    UnsupportedDialect(String),

    #[error("Catalog not found: {0}")]
    CatalogNotFound(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub query: QuerySettings,

    /// Named catalog files (support ${ENV_VAR} expansion).
    pub catalogs: HashMap<String, String>,
}

/// Query pipeline settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Attempts per query, including the first.
    pub max_retry: u32,

    /// Executions slower than this are logged.
    pub slow_query_threshold_ms: u64,

    /// Width of the window completed around an open time bound.
    pub default_window_days: u32,

    /// SQL dialect name (postgres, duckdb, bigquery).
    pub dialect: String,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            max_retry: 3,
            slow_query_threshold_ms: 2000,
            default_window_days: DEFAULT_WINDOW_DAYS,
            dialect: "postgres".to_string(),
        }
    }
}

impl QuerySettings {
    pub fn slow_query_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_query_threshold_ms)
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.dialect()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `STATSQ_CONFIG`
    /// 2. `./statsq.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var(CONFIG_ENV) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("statsq.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        Ok(Settings::default())
    }

    /// The configured SQL dialect.
    pub fn dialect(&self) -> Result<Dialect, SettingsError> {
        self.query
            .dialect
            .parse()
            .map_err(|_| SettingsError::UnsupportedDialect(self.query.dialect.clone()))
    }

    /// Path of the named catalog file, environment variables expanded.
    pub fn catalog_path(&self, name: &str) -> Result<PathBuf, SettingsError> {
        let raw = self
            .catalogs
            .get(name)
            .ok_or_else(|| SettingsError::CatalogNotFound(name.to_string()))?;
        Ok(PathBuf::from(expand_env_vars(raw)?))
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name: String = if chars.next_if_eq(&'{').is_some() {
            chars.by_ref().take_while(|&ch| ch != '}').collect()
        } else {
            let mut name = String::new();
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                name.push(ch);
            }
            if name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
            name
        };

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
