// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! End-to-end screen scenarios against in-memory backends

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::Mutex;
use versiongrid::adapters;
use versiongrid::desired::{
    ApplyBatch, ApplyOutcome, DesiredVersionsView, Feed, INSTALL_TIME, SERVICE, VERSION,
};
use versiongrid::edit::{Completion, EditMode};
use versiongrid::error::{FeedError, GridError, MutationError};
use versiongrid::row::CellMap;
use versiongrid::source::{DesiredVersionsBackend, RowFeed, RowMutations};
use versiongrid::types::{
    BuildInfo, DesiredVersion, DesiredVersionsSnapshot, InstallInfo, ProviderInfo, VersionInfo,
};
use versiongrid::version::ClientDistributionVersion;

type Version = ClientDistributionVersion;

// =============================================================================
// Test Helpers
// =============================================================================

fn make_version(text: &str) -> Version {
    text.parse().unwrap()
}

fn make_desired(entries: &[(&str, &str)]) -> Vec<DesiredVersion<Version>> {
    entries
        .iter()
        .map(|(service, version)| DesiredVersion::new(*service, make_version(version)))
        .collect()
}

fn make_info(service: &str, version: &str, author: &str) -> VersionInfo<Version> {
    VersionInfo {
        service: service.into(),
        version: make_version(version),
        build_info: BuildInfo {
            author: author.into(),
            time: Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
            comment: Some("nightly".into()),
        },
        install_info: Some(InstallInfo {
            account: "ops".into(),
            time: Utc.with_ymd_and_hms(2024, 6, 2, 8, 30, 0).unwrap(),
        }),
    }
}

fn make_provider(distribution: &str, url: &str) -> ProviderInfo {
    ProviderInfo {
        distribution: distribution.into(),
        url: url.into(),
        access_token: None,
        test_consumer: None,
        upload_state_interval_sec: None,
    }
}

/// In-memory desired versions backend that records submits
struct MockBackend {
    desired: Mutex<Vec<DesiredVersion<Version>>>,
    history: Mutex<Vec<DesiredVersionsSnapshot<Version>>>,
    reference: Mutex<Result<Vec<VersionInfo<Version>>, FeedError>>,
    submits: Mutex<Vec<ApplyBatch<Version>>>,
    reject: Mutex<Option<String>>,
    ignore_writes: Mutex<bool>,
}

impl MockBackend {
    fn new(desired: &[(&str, &str)]) -> Self {
        Self {
            desired: Mutex::new(make_desired(desired)),
            history: Mutex::new(Vec::new()),
            reference: Mutex::new(Ok(vec![make_info("api", "ak-1.2.0", "bob")])),
            submits: Mutex::new(Vec::new()),
            reject: Mutex::new(None),
            ignore_writes: Mutex::new(false),
        }
    }

    fn submit_count(&self) -> usize {
        self.submits.lock().unwrap().len()
    }
}

#[async_trait]
impl DesiredVersionsBackend<Version> for MockBackend {
    async fn fetch_desired(&self) -> Result<Vec<DesiredVersion<Version>>, FeedError> {
        Ok(self.desired.lock().unwrap().clone())
    }

    async fn fetch_history(
        &self,
        limit: usize,
    ) -> Result<Vec<DesiredVersionsSnapshot<Version>>, FeedError> {
        Ok(self.history.lock().unwrap().iter().take(limit).cloned().collect())
    }

    async fn fetch_reference(&self) -> Result<Vec<VersionInfo<Version>>, FeedError> {
        self.reference.lock().unwrap().clone()
    }

    async fn submit(&self, batch: &ApplyBatch<Version>) -> Result<(), MutationError> {
        if let Some(message) = self.reject.lock().unwrap().clone() {
            return Err(MutationError::new(message));
        }
        self.submits.lock().unwrap().push(batch.clone());
        if !*self.ignore_writes.lock().unwrap() {
            *self.desired.lock().unwrap() = batch.versions.clone();
        }
        Ok(())
    }
}

/// In-memory providers table
#[derive(Default)]
struct MockProviders {
    rows: Mutex<Vec<ProviderInfo>>,
    fail_writes: Mutex<Option<String>>,
    writes: Mutex<Vec<String>>,
}

impl MockProviders {
    fn with(rows: Vec<ProviderInfo>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    fn write(&self, what: String) -> Result<(), MutationError> {
        if let Some(message) = self.fail_writes.lock().unwrap().clone() {
            return Err(MutationError::new(message));
        }
        self.writes.lock().unwrap().push(what);
        Ok(())
    }
}

#[async_trait]
impl RowFeed<ProviderInfo> for MockProviders {
    async fn fetch_rows(&self) -> Result<Vec<ProviderInfo>, FeedError> {
        Ok(self.rows.lock().unwrap().clone())
    }
}

#[async_trait]
impl RowMutations for MockProviders {
    async fn add_row(&self, values: &CellMap) -> Result<(), MutationError> {
        let provider = adapters::provider_from_cells(values)?;
        self.write(format!("add {}", provider.distribution))?;
        self.rows.lock().unwrap().push(provider);
        Ok(())
    }

    async fn change_row(&self, key: &str, new: &CellMap, _: &CellMap) -> Result<(), MutationError> {
        let provider = adapters::provider_from_cells(new)?;
        self.write(format!("change {key}"))?;
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|p| p.distribution == key) {
            *row = provider;
        }
        Ok(())
    }

    async fn remove_row(&self, key: &str) -> Result<(), MutationError> {
        self.write(format!("remove {key}"))?;
        self.rows.lock().unwrap().retain(|p| p.distribution != key);
        Ok(())
    }
}

async fn make_loaded_view(backend: &MockBackend) -> DesiredVersionsView<Version> {
    let mut view = DesiredVersionsView::new(adapters::client_desired_versions().unwrap());
    view.reload(backend).await;
    view
}

// =============================================================================
// Reference Join
// =============================================================================

#[tokio::test]
async fn test_reference_fields_joined_by_service() {
    let backend = MockBackend::new(&[("api", "ak-1.2.0"), ("web", "ak-1.0.0")]);
    let view = make_loaded_view(&backend).await;
    let rendered = view.view();

    assert_eq!(rendered.cell("api", "author"), Some("bob"));
    assert_eq!(rendered.cell("api", "creationTime"), Some("2024-06-01 10:00:00"));
    assert_eq!(rendered.cell("api", "comment"), Some("nightly"));
    assert_eq!(rendered.cell("api", INSTALL_TIME), Some("2024-06-02 08:30:00"));
    assert_eq!(rendered.cell("web", "author"), Some(""));
    assert!(rendered.column_index(INSTALL_TIME).is_some());
}

#[test]
fn test_install_column_appears_with_reference_feed() {
    let mut view = DesiredVersionsView::new(adapters::client_desired_versions().unwrap());
    view.set_desired_versions(make_desired(&[("api", "ak-1.2.0")]));
    assert!(view.view().column_index(INSTALL_TIME).is_none());
    assert_eq!(
        view.store().find("api").unwrap().get("author"),
        Some(&versiongrid::column::CellValue::NotLoaded)
    );

    view.set_versions_history(vec![make_info("api", "ak-1.2.0", "bob")]);
    let columns: Vec<String> = view.view().columns.iter().map(|c| c.name.clone()).collect();
    assert_eq!(columns.last().map(String::as_str), Some(INSTALL_TIME));

    view.set_versions_history(vec![make_info("api", "ak-1.2.0", "bob")]);
    let again: Vec<String> = view.view().columns.iter().map(|c| c.name.clone()).collect();
    assert_eq!(again, columns);
}

#[test]
fn test_rows_sorted_by_version() {
    let mut view = DesiredVersionsView::new(adapters::client_desired_versions().unwrap());
    view.set_desired_versions(make_desired(&[
        ("web", "ak-1.10.0"),
        ("api", "ak-1.9.0"),
        ("db", "ak-1.9.0"),
    ]));
    let keys: Vec<&str> = view.store().rows().iter().map(|r| r.key()).collect();
    assert_eq!(keys, ["api", "db", "web"]);
}

#[test]
fn test_no_rows_before_desired_feed() {
    let mut view = DesiredVersionsView::new(adapters::client_desired_versions().unwrap());
    view.set_versions_history(vec![make_info("api", "ak-1.2.0", "bob")]);
    assert!(view.store().is_empty());
    assert!(!view.is_loaded(Feed::Desired));
}

// =============================================================================
// Stale Results
// =============================================================================

#[test]
fn test_older_feed_result_is_discarded() {
    let mut view = DesiredVersionsView::new(adapters::client_desired_versions().unwrap());
    let older = view.begin_reload(Feed::Desired);
    let newer = view.begin_reload(Feed::Desired);

    assert!(view.complete_desired(newer, Ok(make_desired(&[("api", "ak-2.0.0")]))));
    assert!(!view.complete_desired(older, Ok(make_desired(&[("api", "ak-1.0.0")]))));
    assert_eq!(view.view().cell("api", VERSION), Some("ak-2.0.0"));
}

#[test]
fn test_results_after_unmount_are_ignored() {
    let mut view = DesiredVersionsView::new(adapters::client_desired_versions().unwrap());
    let ticket = view.begin_reload(Feed::Desired);
    view.unmount();
    assert!(!view.complete_desired(ticket, Ok(make_desired(&[("api", "ak-1.0.0")]))));
    assert!(view.store().is_empty());
    assert_eq!(view.begin_edit("api"), Err(GridError::Unmounted));
}

#[tokio::test]
async fn test_subscribers_see_new_views() {
    let backend = MockBackend::new(&[("api", "ak-1.2.0")]);
    let mut view = DesiredVersionsView::new(adapters::client_desired_versions().unwrap());
    let mut rx = view.subscribe();
    view.reload(&backend).await;

    assert!(rx.has_changed().unwrap());
    let seen = rx.borrow_and_update().clone();
    assert_eq!(seen.rows.len(), 1);
    assert!(seen.revision > 0);
}

// =============================================================================
// Providers
// =============================================================================

#[tokio::test]
async fn test_bad_url_keeps_row_in_editing() {
    let backend = MockProviders::with(vec![make_provider("ak", "https://ak.example.com")]);
    let mut grid = adapters::providers_grid().unwrap();
    grid.reload(&backend).await;

    grid.begin_edit("ak").unwrap();
    assert!(!grid.set_input("url", "bad-url").unwrap());
    let err = grid.commit(&backend, &backend).await.unwrap_err();
    assert_eq!(
        err,
        GridError::Validation {
            columns: vec!["url".into()]
        }
    );

    let view = grid.view();
    let row = view.rows.iter().find(|r| r.key == "ak").unwrap();
    assert_eq!(row.mode, EditMode::Editing);
    assert_eq!(row.invalid, ["url"]);
    assert!(backend.writes.lock().unwrap().is_empty());
    assert_eq!(
        grid.store().find("ak").unwrap().source().url,
        "https://ak.example.com"
    );
}

#[tokio::test]
async fn test_added_provider_appears_after_reload() {
    let backend = MockProviders::with(vec![make_provider("ak", "https://ak.example.com")]);
    let mut grid = adapters::providers_grid().unwrap();
    grid.reload(&backend).await;

    grid.begin_add().unwrap();
    grid.set_input("distribution", "bk").unwrap();
    grid.set_input("url", "https://bk.example.com").unwrap();
    grid.set_input(adapters::UPLOAD_STATE_INTERVAL, "60").unwrap();
    let completion = grid.commit(&backend, &backend).await.unwrap();

    assert_eq!(completion, Completion::Applied);
    assert!(grid.edits().is_idle());
    assert_eq!(grid.store().len(), 2);
    assert_eq!(
        grid.store().find("bk").unwrap().source().upload_state_interval_sec,
        Some(60)
    );
}

#[tokio::test]
async fn test_duplicate_distribution_is_rejected() {
    let backend = MockProviders::with(vec![make_provider("ak", "https://ak.example.com")]);
    let mut grid = adapters::providers_grid().unwrap();
    grid.reload(&backend).await;

    grid.begin_add().unwrap();
    assert!(!grid.set_input("distribution", "ak").unwrap());
    grid.set_input("url", "https://other.example.com").unwrap();
    assert!(matches!(
        grid.commit(&backend, &backend).await,
        Err(GridError::Validation { .. })
    ));
    assert_eq!(grid.store().len(), 1);
}

#[tokio::test]
async fn test_padded_distribution_is_rejected() {
    let backend = MockProviders::with(vec![make_provider("ak", "https://ak.example.com")]);
    let mut grid = adapters::providers_grid().unwrap();
    grid.reload(&backend).await;

    grid.begin_add().unwrap();
    assert!(!grid.set_input("distribution", " ak").unwrap());
    grid.set_input("url", "https://other.example.com").unwrap();
    assert!(grid.commit(&backend, &backend).await.is_err());
    assert!(backend.writes.lock().unwrap().is_empty());
    assert_eq!(grid.store().len(), 1);
}

#[tokio::test]
async fn test_failed_remove_sets_banner() {
    let backend = MockProviders::with(vec![make_provider("ak", "https://ak.example.com")]);
    let mut grid = adapters::providers_grid().unwrap();
    grid.reload(&backend).await;
    *backend.fail_writes.lock().unwrap() = Some("forbidden".into());

    let completion = grid.remove("ak", &backend, &backend).await.unwrap();

    assert_eq!(completion, Completion::Failed("forbidden".into()));
    assert_eq!(grid.error(), Some("Remove row error forbidden"));
    assert_eq!(grid.store().len(), 1);
}

// =============================================================================
// Apply
// =============================================================================

#[tokio::test]
async fn test_apply_submits_only_committed_changes() {
    let backend = MockBackend::new(&[("api", "ak-1.2.0"), ("web", "ak-1.0.0")]);
    let mut view = make_loaded_view(&backend).await;

    view.begin_edit("web").unwrap();
    view.set_draft(VERSION, "ak-1.1.0").unwrap();
    view.commit().unwrap();
    view.begin_edit("api").unwrap();
    view.set_draft(VERSION, "ak-9.9.9").unwrap();

    let outcome = view.apply(&backend).await.unwrap();

    let ApplyOutcome::Applied(batch) = outcome else {
        panic!("expected applied outcome");
    };
    assert_eq!(batch.changes.len(), 1);
    assert_eq!(batch.changes[0].service, "web");
    assert_eq!(batch.changes[0].from, Some(make_version("ak-1.0.0")));
    assert_eq!(batch.changes[0].to, make_version("ak-1.1.0"));
    assert!(batch.versions.contains(&DesiredVersion::new("api", make_version("ak-1.2.0"))));
    assert!(view.staged().is_empty());
    assert_eq!(view.view().cell("web", VERSION), Some("ak-1.1.0"));
    assert_eq!(view.edits().mode_of("api"), EditMode::Editing);
}

#[tokio::test]
async fn test_accepted_submit_shows_server_value() {
    let backend = MockBackend::new(&[("api", "ak-1.2.0")]);
    *backend.ignore_writes.lock().unwrap() = true;
    let mut view = make_loaded_view(&backend).await;

    view.begin_edit("api").unwrap();
    view.set_draft(VERSION, "ak-1.3.0").unwrap();
    view.commit().unwrap();

    let outcome = view.apply(&backend).await.unwrap();

    assert!(matches!(outcome, ApplyOutcome::Applied(_)));
    assert_eq!(backend.submit_count(), 1);
    assert!(view.staged().is_empty());
    assert_eq!(view.view().cell("api", VERSION), Some("ak-1.2.0"));
    assert!(!view.store().find("api").unwrap().source().modified);
    assert!(view.pending_batch().unwrap().is_none());
}

#[tokio::test]
async fn test_added_service_is_submitted() {
    let backend = MockBackend::new(&[("api", "ak-1.2.0")]);
    let mut view = make_loaded_view(&backend).await;

    view.begin_add().unwrap();
    view.set_draft(SERVICE, "db").unwrap();
    view.set_draft(VERSION, "ak-0.1.0").unwrap();
    view.commit().unwrap();
    assert!(view.store().find("db").unwrap().source().modified);

    let ApplyOutcome::Applied(batch) = view.apply(&backend).await.unwrap() else {
        panic!("expected applied outcome");
    };
    assert_eq!(batch.changes[0].from, None);
    assert_eq!(batch.versions.len(), 2);
    assert!(!view.store().find("db").unwrap().source().modified);
}

#[tokio::test]
async fn test_rejected_submit_keeps_rows() {
    let backend = MockBackend::new(&[("api", "ak-1.2.0"), ("web", "ak-1.0.0")]);
    let mut view = make_loaded_view(&backend).await;
    view.begin_edit("web").unwrap();
    view.set_draft(VERSION, "ak-1.1.0").unwrap();
    view.commit().unwrap();
    let before = view.store().fingerprint();
    *backend.reject.lock().unwrap() = Some("denied".into());

    let outcome = view.apply(&backend).await.unwrap();

    assert!(matches!(outcome, ApplyOutcome::Failed(ref m) if m == "denied"));
    assert_eq!(view.error(), Some("Set desired versions error denied"));
    assert_eq!(view.store().fingerprint(), before);
    assert_eq!(view.staged().get("web"), Some(&make_version("ak-1.1.0")));
    assert_eq!(backend.submit_count(), 0);
}

#[tokio::test]
async fn test_apply_refused_with_failed_feed() {
    let backend = MockBackend::new(&[("api", "ak-1.2.0")]);
    *backend.reference.lock().unwrap() = Err(FeedError::new("timeout"));
    let mut view = make_loaded_view(&backend).await;
    assert_eq!(view.error(), Some("Query versions info error timeout"));

    view.begin_edit("api").unwrap();
    view.set_draft(VERSION, "ak-1.3.0").unwrap();
    view.commit().unwrap();

    assert_eq!(
        view.apply(&backend).await.unwrap_err(),
        GridError::StaleFeeds {
            feeds: vec!["versions info".into()]
        }
    );
    assert_eq!(backend.submit_count(), 0);
}

#[tokio::test]
async fn test_apply_with_stale_feeds_allowed_when_configured() {
    let backend = MockBackend::new(&[("api", "ak-1.2.0")]);
    *backend.reference.lock().unwrap() = Err(FeedError::new("timeout"));
    let mut view = DesiredVersionsView::new(
        adapters::client_desired_versions()
            .unwrap()
            .apply_requires_fresh_feeds(false),
    );
    view.reload(&backend).await;
    view.begin_edit("api").unwrap();
    view.set_draft(VERSION, "ak-1.3.0").unwrap();
    view.commit().unwrap();

    assert!(matches!(
        view.apply(&backend).await.unwrap(),
        ApplyOutcome::Applied(_)
    ));
    assert_eq!(backend.submit_count(), 1);
}

#[tokio::test]
async fn test_nothing_to_apply() {
    let backend = MockBackend::new(&[("api", "ak-1.2.0")]);
    let mut view = make_loaded_view(&backend).await;

    view.begin_edit("api").unwrap();
    view.set_draft(VERSION, "ak-1.2.0").unwrap();
    view.commit().unwrap();

    assert!(matches!(
        view.apply(&backend).await.unwrap(),
        ApplyOutcome::NothingToApply
    ));
    assert_eq!(backend.submit_count(), 0);
}

#[tokio::test]
async fn test_revert_from_history_then_apply() {
    let backend = MockBackend::new(&[("api", "ak-1.2.0")]);
    backend.history.lock().unwrap().push(DesiredVersionsSnapshot {
        author: "ann".into(),
        time: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
        versions: make_desired(&[("api", "ak-1.0.0")]),
    });
    let mut view = make_loaded_view(&backend).await;

    view.revert_to_history("api", 0).unwrap();
    view.commit().unwrap();
    let ApplyOutcome::Applied(batch) = view.apply(&backend).await.unwrap() else {
        panic!("expected applied outcome");
    };

    assert_eq!(batch.changes[0].to, make_version("ak-1.0.0"));
    assert_eq!(view.view().cell("api", VERSION), Some("ak-1.0.0"));
    assert_eq!(
        view.revert_to_history("api", 3),
        Err(GridError::SnapshotNotFound(3))
    );
}
