// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Desired versions: show, stage and apply changes

use super::{current_user, print_json, print_table};
use crate::adapters;
use crate::backend::{DesiredVersionsFiles, Kind};
use crate::config::Config;
use crate::desired::{ApplyBatch, ApplyOutcome, DesiredVersionsView, ViewConfig, SERVICE, VERSION};
use crate::version::VersionScheme;
use anyhow::{bail, Context, Result};
use clap::Subcommand;

/// Desired versions actions
#[derive(Debug, Clone, Subcommand)]
pub enum DesiredAction {
    /// Show the desired versions table
    Show,
    /// Change the desired version of a service
    #[command(disable_version_flag = true)]
    Set {
        /// Service name
        service: String,
        /// New version
        version: String,
    },
    /// Add a service to the desired set
    #[command(disable_version_flag = true)]
    Add {
        /// Service name
        service: String,
        /// Version
        version: String,
    },
    /// Restore a service's version from a history snapshot
    Revert {
        /// Service name
        service: String,
        /// Snapshot position, 0 is the most recent
        #[arg(long)]
        snapshot: usize,
    },
    /// List history snapshots
    History {
        /// Maximum snapshots to list
        #[arg(long)]
        limit: Option<usize>,
    },
}

/// Arguments shared by desired versions actions
#[derive(Debug, Clone, Copy)]
pub struct DesiredArgs {
    /// Which versions
    pub kind: Kind,
    /// JSON output
    pub json: bool,
    /// Show the batch without writing it
    pub dry_run: bool,
    /// Colored output
    pub color: bool,
}

/// Run a desired versions action
pub async fn run(config: &Config, action: DesiredAction, args: DesiredArgs) -> Result<()> {
    match args.kind {
        Kind::Client => {
            let screen = adapters::client_desired_versions().context("Invalid column set")?;
            run_kind(config, screen, action, args).await
        }
        Kind::Developer => {
            let screen = adapters::developer_desired_versions().context("Invalid column set")?;
            run_kind(config, screen, action, args).await
        }
    }
}

async fn run_kind<V: VersionScheme>(
    config: &Config,
    screen: ViewConfig<V>,
    action: DesiredAction,
    args: DesiredArgs,
) -> Result<()> {
    let backend = DesiredVersionsFiles::<V>::new(&config.data_dir, args.kind)
        .with_history_limit(config.history_limit)
        .with_author(current_user());
    let mut view = DesiredVersionsView::new(
        screen
            .history_limit(config.history_limit)
            .apply_requires_fresh_feeds(config.apply_requires_fresh_feeds),
    );
    view.reload(&backend).await;

    match action {
        DesiredAction::Show => {
            if args.json {
                print_json(&*view.view())?;
            } else {
                print_table(&view.view(), args.color);
            }
            Ok(())
        }
        DesiredAction::History { limit } => {
            let history = view.history();
            let shown = &history[..limit.unwrap_or(history.len()).min(history.len())];
            if args.json {
                return print_json(shown);
            }
            if shown.is_empty() {
                println!("No history");
            }
            for (i, snapshot) in shown.iter().enumerate() {
                println!(
                    "{i}: {} by {} ({} services)",
                    snapshot.time.format("%Y-%m-%d %H:%M:%S"),
                    snapshot.author,
                    snapshot.versions.len()
                );
                for entry in &snapshot.versions {
                    println!("     {} {}", entry.service, entry.version);
                }
            }
            Ok(())
        }
        DesiredAction::Set { service, version } => {
            view.begin_edit(&service)
                .with_context(|| format!("Cannot edit {service}"))?;
            view.set_draft(VERSION, &version)?;
            view.commit()
                .with_context(|| format!("Invalid version for {service}: {version}"))?;
            finish(&mut view, &backend, args).await
        }
        DesiredAction::Add { service, version } => {
            view.begin_add()?;
            view.set_draft(SERVICE, &service)?;
            view.set_draft(VERSION, &version)?;
            view.commit()
                .with_context(|| format!("Cannot add {service} {version}"))?;
            finish(&mut view, &backend, args).await
        }
        DesiredAction::Revert { service, snapshot } => {
            view.revert_to_history(&service, snapshot)
                .with_context(|| format!("Cannot revert {service}"))?;
            view.commit()
                .with_context(|| format!("Snapshot {snapshot} version is invalid"))?;
            finish(&mut view, &backend, args).await
        }
    }
}

async fn finish<V: VersionScheme>(
    view: &mut DesiredVersionsView<V>,
    backend: &DesiredVersionsFiles<V>,
    args: DesiredArgs,
) -> Result<()> {
    if args.dry_run {
        match view.pending_batch()? {
            Some(batch) => {
                if !args.json {
                    println!("Dry-run: would apply");
                }
                print_changes(&batch, args.json)?;
            }
            None if args.json => print_json(&serde_json::Value::Null)?,
            None => println!("No changes"),
        }
        return Ok(());
    }
    match view.apply(backend).await? {
        ApplyOutcome::NothingToApply => println!("No changes"),
        ApplyOutcome::Applied(batch) => {
            if !args.json {
                println!("Applied");
            }
            print_changes(&batch, args.json)?;
        }
        ApplyOutcome::Failed(message) => bail!("Apply failed: {message}"),
    }
    Ok(())
}

fn print_changes<V: VersionScheme>(batch: &ApplyBatch<V>, json: bool) -> Result<()> {
    if json {
        return print_json(batch);
    }
    for change in &batch.changes {
        match &change.from {
            Some(from) => println!("  {}: {} -> {}", change.service, from, change.to),
            None => println!("  {}: (new) {}", change.service, change.to),
        }
    }
    Ok(())
}
