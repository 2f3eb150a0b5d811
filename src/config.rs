// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management
//!
//! Sources, later ones winning: built-in defaults, the TOML config file,
//! `VERSIONGRID_*` environment variables.

use crate::desired::DEFAULT_HISTORY_LIMIT;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "VERSIONGRID";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the feed files
    pub data_dir: PathBuf,
    /// Number of desired-version snapshots kept
    pub history_limit: usize,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Refuse to apply unless every feed loaded cleanly
    pub apply_requires_fresh_feeds: bool,
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "hyperpolymath", "versiongrid")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: project_dirs()
                .map(|d| d.data_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from("~/.local/share/versiongrid")),
            history_limit: DEFAULT_HISTORY_LIMIT,
            log_level: "info".to_string(),
            apply_requires_fresh_feeds: true,
        }
    }
}

impl Config {
    /// Value of one key rendered as text
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let table = toml::Value::try_from(self).context("Failed to serialize configuration")?;
        Ok(table.get(key).map(|value| match value {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        }))
    }

    /// Whole configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

/// Default location of the config file
#[must_use]
pub fn default_path() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().join("config.toml"))
}

/// Load configuration.
///
/// An explicitly given file must exist; the default file is optional.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let defaults = Config::default();
    let mut builder = config::Config::builder()
        .set_default("data_dir", defaults.data_dir.to_string_lossy().to_string())?
        .set_default("history_limit", i64::try_from(defaults.history_limit)?)?
        .set_default("log_level", defaults.log_level)?
        .set_default("apply_requires_fresh_feeds", defaults.apply_requires_fresh_feeds)?;

    match path {
        Some(path) => {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }
        None => {
            if let Some(path) = default_path() {
                builder = builder.add_source(
                    config::File::from(path)
                        .format(config::FileFormat::Toml)
                        .required(false),
                );
            }
        }
    }

    builder
        .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .build()
        .context("Failed to load configuration")?
        .try_deserialize()
        .context("Invalid configuration")
}
