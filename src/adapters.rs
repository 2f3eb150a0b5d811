// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Screen adapters: column lists, orders and row mappers for each table

use crate::column::{validators, CellValue, Column, ColumnSet, Element};
use crate::desired::{ViewConfig, VersionWrap, WrapComparator, INSTALL_TIME, SERVICE, VERSION};
use crate::error::{GridError, MutationError};
use crate::grid::EditableGrid;
use crate::row::{CellMap, RowStore};
use crate::types::{ProviderInfo, VersionInProcess, VersionInfo};
use crate::version::{
    compare_optional, compare_optional_desc, ClientDistributionVersion,
    DeveloperDistributionVersion, VersionScheme,
};
use std::sync::Arc;

// =============================================================================
// Desired Versions
// =============================================================================

/// Columns of a desired-versions table before install data arrives
pub fn desired_version_columns<V: VersionScheme>() -> Result<ColumnSet, GridError> {
    ColumnSet::new(vec![
        Column::text(SERVICE, "Service")
            .validate(validators::all_of(vec![validators::non_empty(), validators::unique()])),
        Column::text(VERSION, "Version")
            .editable()
            .validate(validators::parses_as::<V>()),
        Column::text("author", "Author"),
        Column::date("creationTime", "Creation Time"),
        Column::text("comment", "Comment"),
    ])
}

/// Cells of a desired-versions row
pub fn desired_version_cells<V: VersionScheme>(wrap: &VersionWrap<V>) -> CellMap {
    let mut cells = CellMap::new();
    cells.insert(SERVICE.into(), CellValue::text(&wrap.service));
    cells.insert(VERSION.into(), CellValue::text(wrap.version.to_string()));
    let companion = |value: CellValue| {
        if wrap.reference_loaded {
            value
        } else {
            CellValue::NotLoaded
        }
    };
    let build = wrap.build.as_ref();
    cells.insert(
        "author".into(),
        companion(CellValue::opt_text(build.map(|b| b.author.clone()))),
    );
    cells.insert(
        "creationTime".into(),
        companion(CellValue::opt_date(build.map(|b| b.time))),
    );
    cells.insert(
        "comment".into(),
        companion(CellValue::opt_text(build.and_then(|b| b.comment.clone()))),
    );
    cells.insert(
        INSTALL_TIME.into(),
        companion(CellValue::opt_date(wrap.install.as_ref().map(|i| i.time))),
    );
    cells
}

/// Ascending by version, then by service
pub fn by_version<V: VersionScheme>() -> WrapComparator<V> {
    Arc::new(|a: Option<&VersionWrap<V>>, b: Option<&VersionWrap<V>>| {
        compare_optional(a.map(|w| &w.version), b.map(|w| &w.version))
            .then_with(|| compare_optional(a.map(|w| &w.service), b.map(|w| &w.service)))
    })
}

fn desired_versions<V: VersionScheme>(title: &str) -> Result<ViewConfig<V>, GridError> {
    Ok(ViewConfig::new(
        title,
        desired_version_columns::<V>()?,
        by_version::<V>(),
        Arc::new(desired_version_cells::<V>),
    ))
}

/// Client desired versions screen
pub fn client_desired_versions() -> Result<ViewConfig<ClientDistributionVersion>, GridError> {
    desired_versions("Client Desired Versions")
}

/// Developer desired versions screen
pub fn developer_desired_versions() -> Result<ViewConfig<DeveloperDistributionVersion>, GridError> {
    desired_versions("Developer Desired Versions")
}

// =============================================================================
// Installed Versions
// =============================================================================

/// Columns of the read-only installed versions table
pub fn installed_version_columns() -> Result<ColumnSet, GridError> {
    ColumnSet::new(vec![
        Column::text(SERVICE, "Service"),
        Column::text(VERSION, "Version"),
        Column::text("author", "Author"),
        Column::date("creationTime", "Creation Time"),
        Column::text("comment", "Comment"),
        Column::text("installedBy", "Installed By"),
        Column::date(INSTALL_TIME, "Install Time"),
    ])
}

/// Cells of an installed versions row
pub fn installed_version_cells<V: VersionScheme>(info: &VersionInfo<V>) -> CellMap {
    let install = info.install_info.as_ref();
    let mut cells = CellMap::new();
    cells.insert(SERVICE.into(), CellValue::text(&info.service));
    cells.insert(VERSION.into(), CellValue::text(info.version.to_string()));
    cells.insert("author".into(), CellValue::text(&info.build_info.author));
    cells.insert("creationTime".into(), CellValue::Date(info.build_info.time));
    cells.insert("comment".into(), CellValue::opt_text(info.build_info.comment.clone()));
    cells.insert("installedBy".into(), CellValue::opt_text(install.map(|i| i.account.clone())));
    cells.insert(INSTALL_TIME.into(), CellValue::opt_date(install.map(|i| i.time)));
    cells
}

/// Installed versions, newest version first
pub fn installed_versions<V: VersionScheme>(
    infos: Vec<VersionInfo<V>>,
) -> Result<RowStore<VersionInfo<V>>, GridError> {
    let mut store = RowStore::new(
        installed_version_columns()?,
        Arc::new(|i: &VersionInfo<V>| i.service.clone()),
        Arc::new(|a: &VersionInfo<V>, b: &VersionInfo<V>| {
            compare_optional_desc(Some(&a.version), Some(&b.version))
                .then_with(|| a.service.cmp(&b.service))
        }),
    );
    let rows = infos
        .into_iter()
        .map(|info| {
            let cells = installed_version_cells(&info);
            (info, cells)
        })
        .collect();
    store.replace_all(rows)?;
    Ok(store)
}

// =============================================================================
// Versions In Process
// =============================================================================

/// Columns of the read-only versions in process table
pub fn in_process_columns() -> Result<ColumnSet, GridError> {
    ColumnSet::new(vec![
        Column::text(SERVICE, "Service"),
        Column::text(VERSION, "Version"),
        Column::text("author", "Author"),
        Column::text("comment", "Comment"),
        Column::text("task", "Task"),
        Column::date("startTime", "Start Time"),
    ])
}

/// Cells of a versions in process row
pub fn in_process_cells<V: VersionScheme>(build: &VersionInProcess<V>) -> CellMap {
    let mut cells = CellMap::new();
    cells.insert(SERVICE.into(), CellValue::text(&build.service));
    cells.insert(VERSION.into(), CellValue::text(build.version.to_string()));
    cells.insert("author".into(), CellValue::text(&build.author));
    cells.insert("comment".into(), CellValue::opt_text(build.comment.clone()));
    cells.insert("task".into(), CellValue::opt_text(build.task_id.clone()));
    cells.insert("startTime".into(), CellValue::Date(build.start_time));
    cells
}

/// Builds in process, most recently started first.
///
/// Rows are keyed by service and version, so one service may have several
/// builds running.
pub fn versions_in_process<V: VersionScheme>(
    builds: Vec<VersionInProcess<V>>,
) -> Result<RowStore<VersionInProcess<V>>, GridError> {
    let mut store = RowStore::new(
        in_process_columns()?,
        Arc::new(|b: &VersionInProcess<V>| format!("{} {}", b.service, b.version)),
        Arc::new(|a: &VersionInProcess<V>, b: &VersionInProcess<V>| {
            b.start_time
                .cmp(&a.start_time)
                .then_with(|| a.service.cmp(&b.service))
        }),
    );
    let rows = builds
        .into_iter()
        .map(|build| {
            let cells = in_process_cells(&build);
            (build, cells)
        })
        .collect();
    store.replace_all(rows)?;
    Ok(store)
}

// =============================================================================
// Providers
// =============================================================================

/// Column holding the upload interval
pub const UPLOAD_STATE_INTERVAL: &str = "uploadStateInterval";

/// Columns of the providers table
pub fn provider_columns() -> Result<ColumnSet, GridError> {
    ColumnSet::new(vec![
        Column::text("distribution", "Distribution")
            .validate(validators::all_of(vec![validators::non_empty(), validators::unique()])),
        Column::text("url", "URL").editable().validate(validators::url()),
        Column::text("accessToken", "Access Token").editable(),
        Column::text("testConsumer", "Test Consumer").editable(),
        Column::number(UPLOAD_STATE_INTERVAL, "Upload State Interval (sec)")
            .editable()
            .validate(validators::number()),
        Column::elements("actions", "Actions"),
    ])
}

/// Cells of a providers row
#[must_use]
pub fn provider_cells(provider: &ProviderInfo) -> CellMap {
    let mut cells = CellMap::new();
    cells.insert("distribution".into(), CellValue::text(&provider.distribution));
    cells.insert("url".into(), CellValue::text(&provider.url));
    cells.insert("accessToken".into(), CellValue::opt_text(provider.access_token.clone()));
    cells.insert("testConsumer".into(), CellValue::opt_text(provider.test_consumer.clone()));
    cells.insert(
        UPLOAD_STATE_INTERVAL.into(),
        provider
            .upload_state_interval_sec
            .map_or(CellValue::Empty, |sec| CellValue::Number(f64::from(sec))),
    );
    cells.insert(
        "actions".into(),
        CellValue::Elements(vec![Element {
            id: "delete".into(),
            label: "Delete".into(),
        }]),
    );
    cells
}

fn text_cell(values: &CellMap, column: &str) -> Option<String> {
    values
        .get(column)
        .and_then(CellValue::as_text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Rebuild a provider record from row values
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn provider_from_cells(values: &CellMap) -> Result<ProviderInfo, MutationError> {
    let distribution =
        text_cell(values, "distribution").ok_or_else(|| MutationError::new("distribution is required"))?;
    let url = text_cell(values, "url").ok_or_else(|| MutationError::new("url is required"))?;
    let upload_state_interval_sec = match values.get(UPLOAD_STATE_INTERVAL) {
        Some(CellValue::Number(n)) if *n >= 0.0 && n.fract() == 0.0 && *n <= f64::from(u32::MAX) => {
            Some(*n as u32)
        }
        None | Some(CellValue::Empty) => None,
        Some(other) => {
            return Err(MutationError::new(format!(
                "invalid upload state interval: {other}"
            )))
        }
    };
    Ok(ProviderInfo {
        distribution,
        url,
        access_token: text_cell(values, "accessToken"),
        test_consumer: text_cell(values, "testConsumer"),
        upload_state_interval_sec,
    })
}

/// Editable providers table keyed and ordered by distribution
pub fn providers_grid() -> Result<EditableGrid<ProviderInfo>, GridError> {
    Ok(EditableGrid::new(
        "Providers",
        provider_columns()?,
        Arc::new(|p: &ProviderInfo| p.distribution.clone()),
        Arc::new(|a: &ProviderInfo, b: &ProviderInfo| a.distribution.cmp(&b.distribution)),
        Arc::new(provider_cells),
    ))
}
