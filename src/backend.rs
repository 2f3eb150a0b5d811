// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! JSON file backend for the feeds and mutations
//!
//! Layout of the data directory:
//!
//! ```text
//! <kind>-desired-versions.json          current desired set
//! <kind>-desired-versions-history.json  earlier sets, most recent first
//! <kind>-versions-info.json             built/installed versions
//! <kind>-versions-in-process.json        builds not yet finished
//! providers.json                        upstream providers
//! ```
//!
//! A missing file reads as an empty list.

use crate::adapters::provider_from_cells;
use crate::desired::{ApplyBatch, DEFAULT_HISTORY_LIMIT};
use crate::error::{FeedError, MutationError};
use crate::row::CellMap;
use crate::source::{DesiredVersionsBackend, RowFeed, RowMutations};
use crate::types::{
    DesiredVersion, DesiredVersionsSnapshot, ProviderInfo, VersionInProcess, VersionInfo,
};
use crate::version::VersionScheme;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Which family of versions a file set holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Kind {
    /// Client builds, `<distribution>-<build>_<client build>`
    Client,
    /// Developer builds, `<distribution>-<build>`
    Developer,
}

impl Kind {
    /// File name prefix
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Developer => "developer",
        }
    }
}

/// File holding the providers list
pub const PROVIDERS_FILE: &str = "providers.json";

/// Path of the desired versions file
#[must_use]
pub fn desired_path(dir: &Path, kind: Kind) -> PathBuf {
    dir.join(format!("{}-desired-versions.json", kind.prefix()))
}

/// Path of the desired versions history file
#[must_use]
pub fn history_path(dir: &Path, kind: Kind) -> PathBuf {
    dir.join(format!("{}-desired-versions-history.json", kind.prefix()))
}

/// Path of the versions info file
#[must_use]
pub fn versions_info_path(dir: &Path, kind: Kind) -> PathBuf {
    dir.join(format!("{}-versions-info.json", kind.prefix()))
}

/// Path of the versions in process file
#[must_use]
pub fn versions_in_process_path(dir: &Path, kind: Kind) -> PathBuf {
    dir.join(format!("{}-versions-in-process.json", kind.prefix()))
}

async fn read_list<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let exists = tokio::fs::try_exists(path)
        .await
        .with_context(|| format!("Failed to check {}", path.display()))?;
    if !exists {
        debug!("{} missing, reading as empty", path.display());
        return Ok(Vec::new());
    }
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Write `items` next to `path`; returns the staged file for [`commit_list`]
async fn stage_list<T: Serialize>(path: &Path, items: &[T]) -> Result<PathBuf> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(items).context("Failed to serialize")?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    Ok(tmp)
}

async fn commit_list(tmp: &Path, path: &Path) -> Result<()> {
    tokio::fs::rename(tmp, path)
        .await
        .with_context(|| format!("Failed to replace {}", path.display()))
}

async fn write_list<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let tmp = stage_list(path, items).await?;
    commit_list(&tmp, path).await
}

fn feed_error(err: &anyhow::Error) -> FeedError {
    FeedError::new(format!("{err:#}"))
}

fn mutation_error(err: &anyhow::Error) -> MutationError {
    MutationError::new(format!("{err:#}"))
}

// =============================================================================
// Desired Versions
// =============================================================================

/// Desired versions feeds of one kind, stored in a data directory
#[derive(Debug, Clone)]
pub struct DesiredVersionsFiles<V> {
    dir: PathBuf,
    kind: Kind,
    history_limit: usize,
    author: String,
    _version: PhantomData<fn() -> V>,
}

impl<V: VersionScheme> DesiredVersionsFiles<V> {
    /// Files of `kind` under `dir`
    pub fn new(dir: impl Into<PathBuf>, kind: Kind) -> Self {
        Self {
            dir: dir.into(),
            kind,
            history_limit: DEFAULT_HISTORY_LIMIT,
            author: "unknown".to_string(),
            _version: PhantomData,
        }
    }

    /// Cap the history written by submit
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Author recorded in history snapshots
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Read the desired set
    pub async fn load_desired(&self) -> Result<Vec<DesiredVersion<V>>> {
        read_list(&desired_path(&self.dir, self.kind)).await
    }

    /// Read the history
    pub async fn load_history(&self) -> Result<Vec<DesiredVersionsSnapshot<V>>> {
        read_list(&history_path(&self.dir, self.kind)).await
    }

    /// Read the versions info
    pub async fn load_versions_info(&self) -> Result<Vec<VersionInfo<V>>> {
        read_list(&versions_info_path(&self.dir, self.kind)).await
    }

    /// Read the builds in process
    pub async fn load_versions_in_process(&self) -> Result<Vec<VersionInProcess<V>>> {
        read_list(&versions_in_process_path(&self.dir, self.kind)).await
    }

    /// Record the batch in history, then replace the desired set.
    ///
    /// Both files are staged before either is replaced, and the desired set
    /// is replaced last: a failure never leaves a desired set the history
    /// does not hold.
    async fn store(&self, batch: &ApplyBatch<V>) -> Result<()> {
        let mut history = self.load_history().await?;
        history.insert(
            0,
            DesiredVersionsSnapshot {
                author: self.author.clone(),
                time: Utc::now(),
                versions: batch.versions.clone(),
            },
        );
        history.truncate(self.history_limit);
        let history_file = history_path(&self.dir, self.kind);
        let desired_file = desired_path(&self.dir, self.kind);
        let history_tmp = stage_list(&history_file, &history).await?;
        let desired_tmp = stage_list(&desired_file, &batch.versions).await?;
        commit_list(&history_tmp, &history_file).await?;
        commit_list(&desired_tmp, &desired_file).await?;
        info!(
            "wrote {} {} desired versions, history {}",
            batch.versions.len(),
            self.kind.prefix(),
            history.len()
        );
        Ok(())
    }
}

#[async_trait]
impl<V: VersionScheme> DesiredVersionsBackend<V> for DesiredVersionsFiles<V> {
    async fn fetch_desired(&self) -> Result<Vec<DesiredVersion<V>>, FeedError> {
        self.load_desired().await.map_err(|e| feed_error(&e))
    }

    async fn fetch_history(&self, limit: usize) -> Result<Vec<DesiredVersionsSnapshot<V>>, FeedError> {
        let mut history = self.load_history().await.map_err(|e| feed_error(&e))?;
        history.truncate(limit);
        Ok(history)
    }

    async fn fetch_reference(&self) -> Result<Vec<VersionInfo<V>>, FeedError> {
        self.load_versions_info().await.map_err(|e| feed_error(&e))
    }

    async fn submit(&self, batch: &ApplyBatch<V>) -> Result<(), MutationError> {
        self.store(batch).await.map_err(|e| mutation_error(&e))
    }
}

// =============================================================================
// Providers
// =============================================================================

/// Providers list stored in a data directory
#[derive(Debug, Clone)]
pub struct ProvidersFile {
    path: PathBuf,
}

impl ProvidersFile {
    /// The providers file under `dir`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(PROVIDERS_FILE),
        }
    }

    /// Read every provider
    pub async fn load(&self) -> Result<Vec<ProviderInfo>> {
        read_list(&self.path).await
    }

    async fn save(&self, providers: &[ProviderInfo]) -> Result<()> {
        write_list(&self.path, providers).await
    }

    async fn update(
        &self,
        edit: impl FnOnce(&mut Vec<ProviderInfo>) -> Result<(), MutationError> + Send,
    ) -> Result<(), MutationError> {
        let mut providers = self.load().await.map_err(|e| mutation_error(&e))?;
        edit(&mut providers)?;
        self.save(&providers).await.map_err(|e| mutation_error(&e))
    }
}

#[async_trait]
impl RowFeed<ProviderInfo> for ProvidersFile {
    async fn fetch_rows(&self) -> Result<Vec<ProviderInfo>, FeedError> {
        self.load().await.map_err(|e| feed_error(&e))
    }
}

#[async_trait]
impl RowMutations for ProvidersFile {
    async fn add_row(&self, values: &CellMap) -> Result<(), MutationError> {
        let provider = provider_from_cells(values)?;
        self.update(|providers| {
            if providers.iter().any(|p| p.distribution == provider.distribution) {
                return Err(MutationError::new(format!(
                    "provider {} already exists",
                    provider.distribution
                )));
            }
            providers.push(provider);
            Ok(())
        })
        .await
    }

    async fn change_row(
        &self,
        key: &str,
        new_values: &CellMap,
        _old_values: &CellMap,
    ) -> Result<(), MutationError> {
        let mut provider = provider_from_cells(new_values)?;
        provider.distribution = key.to_string();
        self.update(|providers| {
            let slot = providers
                .iter_mut()
                .find(|p| p.distribution == provider.distribution)
                .ok_or_else(|| MutationError::new(format!("no provider {}", provider.distribution)))?;
            *slot = provider;
            Ok(())
        })
        .await
    }

    async fn remove_row(&self, key: &str) -> Result<(), MutationError> {
        self.update(|providers| {
            let before = providers.len();
            providers.retain(|p| p.distribution != key);
            if providers.len() == before {
                return Err(MutationError::new(format!("no provider {key}")));
            }
            Ok(())
        })
        .await
    }
}
