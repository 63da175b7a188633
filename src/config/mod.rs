//! Configuration module for statsq.
//!
//! Handles query settings, catalog locations, and environment variables.

mod settings;

pub use settings::{expand_env_vars, QuerySettings, Settings, SettingsError, CONFIG_ENV};
