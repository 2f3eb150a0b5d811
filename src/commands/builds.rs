// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Versions in process table

use super::{print_json, print_table};
use crate::adapters;
use crate::backend::{DesiredVersionsFiles, Kind};
use crate::config::Config;
use crate::edit::EditController;
use crate::grid::{render, ErrorBanner};
use crate::version::{ClientDistributionVersion, DeveloperDistributionVersion, VersionScheme};
use anyhow::{Context, Result};

/// Show builds that have started and not finished, latest first
pub async fn run(config: &Config, kind: Kind, json: bool, color: bool) -> Result<()> {
    match kind {
        Kind::Client => show::<ClientDistributionVersion>(config, kind, json, color).await,
        Kind::Developer => show::<DeveloperDistributionVersion>(config, kind, json, color).await,
    }
}

async fn show<V: VersionScheme>(config: &Config, kind: Kind, json: bool, color: bool) -> Result<()> {
    let builds = DesiredVersionsFiles::<V>::new(&config.data_dir, kind)
        .load_versions_in_process()
        .await
        .context("Failed to load versions in process")?;
    let store = adapters::versions_in_process(builds).context("Invalid versions in process")?;
    if json {
        let rows: Vec<_> = store.rows().iter().map(|r| r.source()).collect();
        return print_json(&rows);
    }
    let title = match kind {
        Kind::Client => "Client Versions In Process",
        Kind::Developer => "Developer Versions In Process",
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
