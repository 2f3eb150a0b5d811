// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Installed versions table

use super::{print_json, print_table};
use crate::adapters;
use crate::backend::{DesiredVersionsFiles, Kind};
use crate::config::Config;
use crate::edit::EditController;
use crate::grid::{render, ErrorBanner};
use crate::version::{ClientDistributionVersion, DeveloperDistributionVersion, VersionScheme};
use anyhow::{Context, Result};

/// Show built and installed versions, newest first
pub async fn run(config: &Config, kind: Kind, json: bool, color: bool) -> Result<()> {
    match kind {
        Kind::Client => show::<ClientDistributionVersion>(config, kind, json, color).await,
        Kind::Developer => show::<DeveloperDistributionVersion>(config, kind, json, color).await,
    }
}

async fn show<V: VersionScheme>(config: &Config, kind: Kind, json: bool, color: bool) -> Result<()> {
    let infos = DesiredVersionsFiles::<V>::new(&config.data_dir, kind)
        .load_versions_info()
        .await
        .context("Failed to load versions info")?;
    let store = adapters::installed_versions(infos).context("Invalid versions info")?;
    if json {
        let rows: Vec<_> = store.rows().iter().map(|r| r.source()).collect();
        return print_json(&rows);
    }
    let title = match kind {
        Kind::Client => "Client Versions",
        Kind::Developer => "Developer Versions",
    };
    let view = render(
        title,
        &store,
        &EditController::new(),
        &ErrorBanner::default(),
        |_| false,
    );
    print_table(&view, color);
    Ok(())
}
