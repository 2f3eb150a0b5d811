// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Versiongrid CLI - desired versions, installed versions, builds and providers

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use versiongrid::backend::Kind;
use versiongrid::commands;
use versiongrid::commands::desired::{DesiredAction, DesiredArgs};
use versiongrid::commands::providers::ProvidersAction;
use versiongrid::config;

#[derive(Parser)]
#[command(name = "versiongrid")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, env = "VERSIONGRID_CONFIG", global = true)]
    config: Option<std::path::PathBuf>,

    /// Data directory override
    #[arg(long, env = "VERSIONGRID_DATA_DIR", global = true)]
    data_dir: Option<std::path::PathBuf>,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR", global = true, value_parser = clap::builder::BoolishValueParser::new())]
    no_color: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show and change desired versions
    Desired {
        /// Client or developer versions
        #[arg(long, value_enum, default_value = "client", global = true)]
        kind: Kind,

        /// Show what would be applied without writing
        #[arg(long, global = true)]
        dry_run: bool,

        #[command(subcommand)]
        action: DesiredAction,
    },

    /// Show built and installed versions
    Versions {
        /// Client or developer versions
        #[arg(long, value_enum, default_value = "client")]
        kind: Kind,
    },

    /// Show builds in process
    Builds {
        /// Client or developer versions
        #[arg(long, value_enum, default_value = "developer")]
        kind: Kind,
    },

    /// Manage upstream providers
    Providers {
        #[command(subcommand)]
        action: ProvidersAction,
    },

    /// Show configuration
    Config {
        /// Configuration key (omit to show all)
        key: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    // Initialize logging
    let filter = match cli.verbose {
        _ if std::env::var_os("RUST_LOG").is_some() => EnvFilter::from_default_env(),
        0 if cli.quiet => EnvFilter::new("error"),
        0 => EnvFilter::new(&config.log_level),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let color = !cli.no_color;

    // Execute command
    match cli.command {
        Commands::Desired {
            kind,
            dry_run,
            action,
        } => {
            let args = DesiredArgs {
                kind,
                json: cli.json,
                dry_run,
                color,
            };
            commands::desired::run(&config, action, args).await
        }
        Commands::Versions { kind } => commands::versions::run(&config, kind, cli.json, color).await,
        Commands::Builds { kind } => commands::builds::run(&config, kind, cli.json, color).await,
        Commands::Providers { action } => {
            commands::providers::run(&config, action, cli.json, color).await
        }
        Commands::Config { key } => commands::config::run(&config, key.as_deref()),
        Commands::Completions { shell } => commands::completions::run(shell, &mut Cli::command()),
    }
}
