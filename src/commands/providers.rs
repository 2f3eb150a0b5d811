// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Providers: list, add, change and remove upstream repositories

use super::{print_json, print_table};
use crate::adapters::{self, UPLOAD_STATE_INTERVAL};
use crate::backend::ProvidersFile;
use crate::config::Config;
use crate::edit::Completion;
use crate::grid::EditableGrid;
use crate::types::ProviderInfo;
use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

/// Optional provider fields
#[derive(Debug, Clone, Default, Args)]
pub struct ProviderFields {
    /// Repository access token
    #[arg(long)]
    pub access_token: Option<String>,
    /// Consumer used to test new versions
    #[arg(long)]
    pub test_consumer: Option<String>,
    /// State upload period in seconds
    #[arg(long)]
    pub upload_state_interval: Option<String>,
}

/// Providers actions
#[derive(Debug, Clone, Subcommand)]
pub enum ProvidersAction {
    /// List providers
    List,
    /// Add a provider
    Add {
        /// Distribution name
        distribution: String,
        /// Repository URL
        url: String,
        #[command(flatten)]
        fields: ProviderFields,
    },
    /// Change a provider
    Change {
        /// Distribution name
        distribution: String,
        /// Repository URL
        #[arg(long)]
        url: Option<String>,
        #[command(flatten)]
        fields: ProviderFields,
    },
    /// Remove a provider
    Remove {
        /// Distribution name
        distribution: String,
    },
}

/// Run a providers action
pub async fn run(config: &Config, action: ProvidersAction, json: bool, color: bool) -> Result<()> {
    let file = ProvidersFile::new(&config.data_dir);
    let mut grid = adapters::providers_grid().context("Invalid column set")?;
    grid.reload(&file).await;
    if let Some(error) = grid.error() {
        bail!("{error}");
    }

    match action {
        ProvidersAction::List => {
            if json {
                let providers: Vec<&ProviderInfo> =
                    grid.store().rows().iter().map(|r| r.source()).collect();
                print_json(&providers)
            } else {
                print_table(&grid.view(), color);
                Ok(())
            }
        }
        ProvidersAction::Add {
            distribution,
            url,
            fields,
        } => {
            grid.begin_add()?;
            grid.set_input("distribution", &distribution)?;
            grid.set_input("url", &url)?;
            set_fields(&mut grid, &fields)?;
            let completion = grid
                .commit(&file, &file)
                .await
                .with_context(|| format!("Cannot add provider {distribution}"))?;
            report(&grid, &completion, &format!("Added provider {distribution}"))
        }
        ProvidersAction::Change {
            distribution,
            url,
            fields,
        } => {
            grid.begin_edit(&distribution)
                .with_context(|| format!("Cannot edit provider {distribution}"))?;
            if let Some(url) = &url {
                grid.set_input("url", url)?;
            }
            set_fields(&mut grid, &fields)?;
            let completion = grid
                .commit(&file, &file)
                .await
                .with_context(|| format!("Cannot change provider {distribution}"))?;
            report(&grid, &completion, &format!("Changed provider {distribution}"))
        }
        ProvidersAction::Remove { distribution } => {
            let completion = grid.remove(&distribution, &file, &file).await?;
            report(&grid, &completion, &format!("Removed provider {distribution}"))
        }
    }
}

fn set_fields(grid: &mut EditableGrid<ProviderInfo>, fields: &ProviderFields) -> Result<()> {
    if let Some(token) = &fields.access_token {
        grid.set_input("accessToken", token)?;
    }
    if let Some(consumer) = &fields.test_consumer {
        grid.set_input("testConsumer", consumer)?;
    }
    if let Some(interval) = &fields.upload_state_interval {
        grid.set_input(UPLOAD_STATE_INTERVAL, interval)?;
    }
    Ok(())
}

fn report(grid: &EditableGrid<ProviderInfo>, completion: &Completion, success: &str) -> Result<()> {
    match completion {
        Completion::Applied => {
            println!("{success}");
            Ok(())
        }
        Completion::Failed(_) => bail!("{}", grid.error().unwrap_or("write failed")),
        Completion::Stale => bail!("Write result discarded"),
    }
}
