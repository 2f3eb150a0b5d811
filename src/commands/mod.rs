// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Command implementations

pub mod builds;
pub mod completions;
pub mod config;
pub mod desired;
pub mod providers;
pub mod versions;

use crate::grid::GridView;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

/// Name recorded as the author of applied changes
#[must_use]
pub fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Print a view as JSON
pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

/// Print a view as an aligned text table
pub fn print_table(view: &GridView, color: bool) {
    println!("{}", view.title);
    if let Some(error) = &view.error {
        if color {
            println!("{}", error.red());
        } else {
            println!("{error}");
        }
    }
    if view.rows.is_empty() {
        println!("  (no rows)");
        return;
    }

    let mut widths: Vec<usize> = view.columns.iter().map(|c| c.header.len()).collect();
    for row in &view.rows {
        for (width, cell) in widths.iter_mut().zip(&row.cells) {
            *width = (*width).max(cell.len());
        }
    }

    let header: Vec<String> = view
        .columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:<w$}", c.header, w = *w))
        .collect();
    let header = format!("  {}", header.join("  "));
    if color {
        println!("{}", header.bold());
    } else {
        println!("{header}");
    }

    for row in &view.rows {
        let cells: Vec<String> = row
            .cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{cell:<w$}", w = *w))
            .collect();
        let marker = if row.marked { '*' } else { ' ' };
        let line = format!("{marker} {}", cells.join("  "));
        if row.marked && color {
            println!("{}", line.yellow());
        } else {
            println!("{}", line.trim_end());
        }
    }
}
