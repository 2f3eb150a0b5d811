// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Collaborator contracts for queries and mutations
//!
//! The transport behind these traits is opaque to the grid: a GraphQL
//! client, an HTTP API or the JSON files in [`crate::backend`].

use crate::desired::ApplyBatch;
use crate::error::{FeedError, MutationError};
use crate::row::CellMap;
use crate::types::{DesiredVersion, DesiredVersionsSnapshot, VersionInfo};
use crate::version::VersionScheme;
use async_trait::async_trait;
use std::sync::Arc;

/// Screen-level sink for error banner messages
pub type ErrorSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Query feeding a single-source grid
#[async_trait]
pub trait RowFeed<W: Send>: Send + Sync {
    /// Fetch every record
    async fn fetch_rows(&self) -> Result<Vec<W>, FeedError>;
}

/// Remote writes behind an editable grid
#[async_trait]
pub trait RowMutations: Send + Sync {
    /// Create a record from the new row's values
    async fn add_row(&self, values: &CellMap) -> Result<(), MutationError>;

    /// Update the record behind an existing row
    async fn change_row(
        &self,
        key: &str,
        new_values: &CellMap,
        old_values: &CellMap,
    ) -> Result<(), MutationError>;

    /// Delete the record behind a row
    async fn remove_row(&self, key: &str) -> Result<(), MutationError>;
}

/// The three input feeds and the batch write of the desired-versions view
#[async_trait]
pub trait DesiredVersionsBackend<V: VersionScheme>: Send + Sync {
    /// Current desired versions
    async fn fetch_desired(&self) -> Result<Vec<DesiredVersion<V>>, FeedError>;

    /// Previous desired-version sets, most recent first, at most `limit`
    async fn fetch_history(&self, limit: usize) -> Result<Vec<DesiredVersionsSnapshot<V>>, FeedError>;

    /// Installed/built versions used for the read-only companion columns
    async fn fetch_reference(&self) -> Result<Vec<VersionInfo<V>>, FeedError>;

    /// Replace the desired set in one call
    async fn submit(&self, batch: &ApplyBatch<V>) -> Result<(), MutationError>;
}
