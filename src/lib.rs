// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Versiongrid library - editable version tables for a build/distribution dashboard
//!
//! This crate provides a typed, editable grid engine (columns, ordered rows,
//! per-row edit sessions) and a reconciliation engine that merges the
//! desired-versions, history and installed-versions feeds into one table
//! that can be edited locally and applied as a single batch.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod adapters;
pub mod backend;
pub mod column;
pub mod commands;
pub mod config;
pub mod desired;
pub mod edit;
pub mod error;
pub mod grid;
pub mod row;
pub mod source;
pub mod version;

/// Records exchanged with the query and mutation layer
pub mod types {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};

    // =========================================================================
    // Desired Versions
    // =========================================================================

    /// Version a service is configured to run
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct DesiredVersion<V> {
        /// Service name
        pub service: String,
        /// Configured version
        pub version: V,
    }

    impl<V> DesiredVersion<V> {
        /// Create a desired version entry
        pub fn new(service: impl Into<String>, version: V) -> Self {
            Self {
                service: service.into(),
                version,
            }
        }
    }

    /// One recorded state of the whole desired-versions set
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct DesiredVersionsSnapshot<V> {
        /// Who applied it
        pub author: String,
        /// When it was applied
        pub time: DateTime<Utc>,
        /// The complete set at that point
        pub versions: Vec<DesiredVersion<V>>,
    }

    impl<V> DesiredVersionsSnapshot<V> {
        /// Version of one service in this snapshot
        #[must_use]
        pub fn version_of(&self, service: &str) -> Option<&V> {
            self.versions
                .iter()
                .find(|v| v.service == service)
                .map(|v| &v.version)
        }
    }

    // =========================================================================
    // Installed Versions
    // =========================================================================

    /// Who built a version and when
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BuildInfo {
        /// Build author
        pub author: String,
        /// Build time
        pub time: DateTime<Utc>,
        /// Build comment
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub comment: Option<String>,
    }

    /// Who installed a version and when
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct InstallInfo {
        /// Installing account
        pub account: String,
        /// Install time
        pub time: DateTime<Utc>,
    }

    /// A built, possibly installed, version of a service
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct VersionInfo<V> {
        /// Service name
        pub service: String,
        /// The version
        pub version: V,
        /// Build metadata
        pub build_info: BuildInfo,
        /// Install metadata, absent until installed
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub install_info: Option<InstallInfo>,
    }

    /// A build that has started and not yet finished
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct VersionInProcess<V> {
        /// Service name
        pub service: String,
        /// Version being built
        pub version: V,
        /// Who started the build
        pub author: String,
        /// Build comment
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub comment: Option<String>,
        /// Build task identifier
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub task_id: Option<String>,
        /// When the build started
        pub start_time: DateTime<Utc>,
    }

    // =========================================================================
    // Providers
    // =========================================================================

    /// Upstream distribution repository
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ProviderInfo {
        /// Distribution name, unique
        pub distribution: String,
        /// Repository URL
        pub url: String,
        /// Access token for the repository
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub access_token: Option<String>,
        /// Consumer used to test new versions
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub test_consumer: Option<String>,
        /// State upload period in seconds
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub upload_state_interval_sec: Option<u32>,
    }
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::column::{CellValue, Column, ColumnSet};
    pub use crate::desired::{ApplyBatch, DesiredVersionsView, VersionWrap};
    pub use crate::error::{FeedError, GridError, MutationError};
    pub use crate::grid::{EditableGrid, GridView};
    pub use crate::types::*;
    pub use anyhow::{Context, Result};
}
