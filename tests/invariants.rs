// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Invariant tests for the grid and reconciliation engines
//!
//! These tests verify critical invariants:
//! 1. Version order is a strict total order with absent values last
//! 2. Feed setters are idempotent
//! 3. Failed validation never reaches the row store or the mutation channel
//! 4. Only one edit session exists at a time
//! 5. Revert-then-cancel leaves committed values untouched

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use versiongrid::adapters;
use versiongrid::column::CellValue;
use versiongrid::desired::{DesiredVersionsView, VersionWrap, SERVICE, VERSION};
use versiongrid::error::{FeedError, GridError, MutationError};
use versiongrid::row::CellMap;
use versiongrid::source::{RowFeed, RowMutations};
use versiongrid::types::{
    BuildInfo, DesiredVersion, DesiredVersionsSnapshot, InstallInfo, ProviderInfo, VersionInfo,
};
use versiongrid::version::{compare_optional, ClientDistributionVersion, ClientVersion};

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
    let time = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
    VersionInfo {
        service: service.into(),
        version: make_version(version),
        build_info: BuildInfo {
            author: author.into(),
            time,
            comment: None,
        },
        install_info: Some(InstallInfo {
            account: "ops".into(),
            time,
        }),
    }
}

fn make_snapshot(entries: &[(&str, &str)]) -> DesiredVersionsSnapshot<Version> {
    DesiredVersionsSnapshot {
        author: "ann".into(),
        time: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
        versions: make_desired(entries),
    }
}

fn make_view() -> DesiredVersionsView<Version> {
    let mut view = DesiredVersionsView::new(adapters::client_desired_versions().unwrap());
    view.set_versions_history(vec![make_info("api", "ak-1.2.0", "bob")]);
    view.set_desired_versions_history(vec![make_snapshot(&[("api", "ak-1.1.0"), ("web", "ak-0.9.0")])]);
    view.set_desired_versions(make_desired(&[("api", "ak-1.2.0"), ("web", "ak-1.0.0")]));
    view
}

fn make_wrap(version: Version, service: &str) -> VersionWrap<Version> {
    VersionWrap {
        service: service.into(),
        version,
        reference_loaded: true,
        build: None,
        install: None,
        modified: false,
    }
}

/// Provider backend that counts writes
#[derive(Default)]
struct CountingProviders {
    rows: Mutex<Vec<ProviderInfo>>,
    writes: AtomicUsize,
}

#[async_trait]
impl RowFeed<ProviderInfo> for CountingProviders {
    async fn fetch_rows(&self) -> Result<Vec<ProviderInfo>, FeedError> {
        Ok(self.rows.lock().unwrap().clone())
    }
}

#[async_trait]
impl RowMutations for CountingProviders {
    async fn add_row(&self, _: &CellMap) -> Result<(), MutationError> {
        self.writes.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(())
    }

    async fn change_row(&self, _: &str, _: &CellMap, _: &CellMap) -> Result<(), MutationError> {
        self.writes.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(())
    }

    async fn remove_row(&self, _: &str) -> Result<(), MutationError> {
        self.writes.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(())
    }
}

fn version_strategy() -> impl Strategy<Value = Version> {
    (
        prop::sample::select(vec!["ak", "bk", "ck"]),
        prop::collection::vec(0u32..20, 1..4),
        0u32..4,
    )
        .prop_map(|(distribution, developer_build, client_build)| ClientDistributionVersion {
            distribution: distribution.to_string(),
            version: ClientVersion {
                developer_build,
                client_build,
            },
        })
}

// =============================================================================
// Version Order
// =============================================================================

proptest! {
    #[test]
    fn test_order_is_antisymmetric(a in version_strategy(), b in version_strategy()) {
        let cmp = adapters::by_version::<Version>();
        let (wa, wb) = (make_wrap(a, "s"), make_wrap(b, "s"));
        prop_assert_eq!(cmp(Some(&wa), Some(&wb)), cmp(Some(&wb), Some(&wa)).reverse());
    }

    #[test]
    fn test_order_is_transitive(
        a in version_strategy(),
        b in version_strategy(),
        c in version_strategy(),
    ) {
        let mut sorted = [a, b, c];
        sorted.sort();
        prop_assert!(sorted[0] <= sorted[1]);
        prop_assert!(sorted[1] <= sorted[2]);
        prop_assert!(sorted[0] <= sorted[2]);
    }

    #[test]
    fn test_absent_sorts_last(a in version_strategy()) {
        prop_assert_eq!(compare_optional(Some(&a), None), Ordering::Less);
        prop_assert_eq!(compare_optional(None, Some(&a)), Ordering::Greater);
    }

    #[test]
    fn test_display_parses_back(a in version_strategy()) {
        prop_assert_eq!(a.to_string().parse::<Version>().unwrap(), a);
    }
}

#[test]
fn test_segments_compare_numerically() {
    assert!(make_version("ak-1.10.0") > make_version("ak-1.9.0"));
    assert!(make_version("ak-1.2") < make_version("ak-1.2.0"));
    assert!(make_version("ak-1.2.0_2") > make_version("ak-1.2.0"));
    assert!(make_version("bk-0.1.0") > make_version("ak-9.9.9"));
}

// =============================================================================
// Idempotence
// =============================================================================

#[test]
fn test_feed_setters_are_idempotent() {
    let mut view = make_view();
    let before = view.store().fingerprint();
    let rows_before = view.store().len();

    view.set_desired_versions(make_desired(&[("api", "ak-1.2.0"), ("web", "ak-1.0.0")]));
    view.set_versions_history(vec![make_info("api", "ak-1.2.0", "bob")]);
    view.set_desired_versions_history(vec![make_snapshot(&[("api", "ak-1.1.0")])]);

    assert_eq!(view.store().len(), rows_before);
    assert_eq!(view.store().fingerprint(), before);
}

#[test]
fn test_feed_arrival_order_does_not_matter() {
    let mut first = DesiredVersionsView::new(adapters::client_desired_versions().unwrap());
    first.set_desired_versions(make_desired(&[("api", "ak-1.2.0")]));
    first.set_versions_history(vec![make_info("api", "ak-1.2.0", "bob")]);

    let mut second = DesiredVersionsView::new(adapters::client_desired_versions().unwrap());
    second.set_versions_history(vec![make_info("api", "ak-1.2.0", "bob")]);
    second.set_desired_versions(make_desired(&[("api", "ak-1.2.0")]));

    assert_eq!(first.store().fingerprint(), second.store().fingerprint());
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_invalid_commit_never_writes() {
    let backend = CountingProviders::default();
    backend.rows.lock().unwrap().push(ProviderInfo {
        distribution: "ak".into(),
        url: "https://ak.example.com".into(),
        access_token: None,
        test_consumer: None,
        upload_state_interval_sec: Some(30),
    });
    let mut grid = adapters::providers_grid().unwrap();
    grid.reload(&backend).await;
    let before = grid.store().fingerprint();

    grid.begin_edit("ak").unwrap();
    for (column, input) in [("url", "bad-url"), (adapters::UPLOAD_STATE_INTERVAL, "soon")] {
        grid.set_input(column, input).unwrap();
        let err = grid.commit(&backend, &backend).await.unwrap_err();
        assert!(matches!(err, GridError::Validation { .. }));
        grid.set_input(column, if column == "url" { "https://ak.example.com" } else { "30" })
            .unwrap();
    }

    assert_eq!(backend.writes.load(AtomicOrdering::SeqCst), 0);
    assert_eq!(grid.store().fingerprint(), before);
}

#[test]
fn test_invalid_version_is_not_staged() {
    let mut view = make_view();
    let before = view.store().fingerprint();
    view.begin_edit("api").unwrap();
    assert!(!view.set_draft(VERSION, "not a version").unwrap());
    assert!(matches!(view.commit(), Err(GridError::Validation { .. })));
    assert!(view.staged().is_empty());
    assert_eq!(view.store().fingerprint(), before);
}

// =============================================================================
// Edit Session Exclusivity
// =============================================================================

#[test]
fn test_second_add_is_a_no_op() {
    let mut view = make_view();
    view.begin_add().unwrap();
    view.set_draft(SERVICE, "db").unwrap();
    let session = view.edits().session().cloned();
    let rows = view.store().len();

    assert_eq!(view.begin_add(), Err(GridError::EditInProgress));
    assert_eq!(view.begin_edit("api"), Err(GridError::EditInProgress));
    assert_eq!(view.edits().session().cloned(), session);
    assert_eq!(view.store().len(), rows);
}

// =============================================================================
// Revert
// =============================================================================

#[test]
fn test_revert_then_cancel_keeps_committed_values() {
    let mut view = make_view();
    let before = view.store().fingerprint();

    view.revert_to_history("api", 0).unwrap();
    let draft = view.edits().session().unwrap().draft().get(VERSION).cloned();
    assert_eq!(draft, Some(CellValue::text("ak-1.1.0")));
    assert_eq!(
        view.store().find("api").unwrap().get(VERSION),
        Some(&CellValue::text("ak-1.2.0"))
    );

    assert!(view.cancel());
    assert_eq!(view.store().fingerprint(), before);
    assert!(view.staged().is_empty());
}

#[test]
fn test_revert_requires_commit_to_stage() {
    let mut view = make_view();
    view.revert_to_history("web", 0).unwrap();
    assert!(view.staged().is_empty());
    view.commit().unwrap();
    assert_eq!(view.staged().get("web"), Some(&make_version("ak-0.9.0")));
}

#[test]
fn test_revert_of_unknown_service_in_snapshot() {
    let mut view = make_view();
    view.set_desired_versions(make_desired(&[("api", "ak-1.2.0"), ("db", "ak-1.0.0")]));
    assert_eq!(
        view.revert_to_history("db", 0),
        Err(GridError::SnapshotMissingRow {
            index: 0,
            key: "db".into()
        })
    );
}

#[test]
fn test_on_error_sink_receives_banner() {
    let seen = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = Arc::clone(&seen);
    let config = adapters::client_desired_versions()
        .unwrap()
        .on_error(Arc::new(move |message: &str| sink.lock().unwrap().push(message.to_string())));
    let mut view = DesiredVersionsView::new(config);
    let ticket = view.begin_reload(versiongrid::desired::Feed::History);
    view.complete_history(ticket, Err(FeedError::new("boom")));
    assert_eq!(
        seen.lock().unwrap().as_slice(),
        ["Query desired versions history error boom".to_string()]
    );
}
