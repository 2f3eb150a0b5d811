// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! `config` command

use crate::config::Config;
use anyhow::{bail, Result};

/// Print the whole configuration, or the value of one key
pub fn run(config: &Config, key: Option<&str>) -> Result<()> {
    match key {
        Some(key) => match config.get(key)? {
            Some(value) => println!("{value}"),
            None => bail!("Unknown configuration key: {key}"),
        },
        None => print!("{}", config.to_toml()?),
    }
    Ok(())
}
