// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Desired versions view: reconciliation of three independent feeds
//!
//! The view blends the desired set, the bounded history of earlier desired
//! sets and the installed/built reference list into one editable table.
//! Feeds may arrive in any order and any number of times; every arrival
//! rebuilds the whole row set from the latest value of each feed plus the
//! changes staged locally by committed edits. Staged changes reach the
//! server only through [`DesiredVersionsView::apply`], as one batch.

use crate::column::{CellValue, Column, ColumnSet};
use crate::edit::{Completion, EditController, EditTarget, MutationKind};
use crate::error::{FeedError, GridError, MutationError};
use crate::grid::{render, ErrorBanner, GridView, RowMapper, ViewPublisher};
use crate::row::{CellMap, OrderFn, RowStore};
use crate::source::{DesiredVersionsBackend, ErrorSink};
use crate::types::{BuildInfo, DesiredVersion, DesiredVersionsSnapshot, InstallInfo, VersionInfo};
use crate::version::VersionScheme;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Service name column
pub const SERVICE: &str = "service";
/// Desired version column
pub const VERSION: &str = "version";
/// Install time column, appended once the reference feed arrives
pub const INSTALL_TIME: &str = "installTime";

/// Default number of history snapshots kept
pub const DEFAULT_HISTORY_LIMIT: usize = 25;

/// Input feeds of the view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    /// Current desired versions
    Desired,
    /// Earlier desired sets
    History,
    /// Installed/built versions
    Reference,
}

impl Feed {
    /// Every feed
    pub const ALL: [Feed; 3] = [Feed::Desired, Feed::History, Feed::Reference];

    /// Name used in messages
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Desired => "desired versions",
            Self::History => "desired versions history",
            Self::Reference => "versions info",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Desired => 0,
            Self::History => 1,
            Self::Reference => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct FeedState {
    issued: u64,
    applied: u64,
    loaded: bool,
    failed: bool,
}

/// Identifies one in-flight feed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedTicket {
    feed: Feed,
    generation: u64,
    seq: u64,
}

impl FeedTicket {
    /// Feed the request was issued for
    #[must_use]
    pub fn feed(&self) -> Feed {
        self.feed
    }
}

/// A desired version joined with the reference entry of its service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionWrap<V> {
    /// Service name, the domain key
    pub service: String,
    /// Desired version, staged if modified
    pub version: V,
    /// Whether the reference feed had arrived when this row was built
    pub reference_loaded: bool,
    /// Build metadata of the service's reference entry
    pub build: Option<BuildInfo>,
    /// Install metadata of the service's reference entry
    pub install: Option<InstallInfo>,
    /// Staged locally, not yet applied
    pub modified: bool,
}

/// Orders two optionally present rows; absent sorts last
pub type WrapComparator<V> =
    Arc<dyn Fn(Option<&VersionWrap<V>>, Option<&VersionWrap<V>>) -> Ordering + Send + Sync>;

/// Per-screen configuration, fixed at construction
pub struct ViewConfig<V> {
    /// Grid title
    pub title: String,
    /// Columns before the reference feed arrives
    pub columns: ColumnSet,
    /// Column appended once the reference feed arrives
    pub install_column: Column,
    /// Row order
    pub comparator: WrapComparator<V>,
    /// Row to cells
    pub mapper: RowMapper<VersionWrap<V>>,
    /// Number of history snapshots requested and kept
    pub history_limit: usize,
    /// Refuse to apply unless every feed is loaded and healthy
    pub apply_requires_fresh_feeds: bool,
    /// Receives every banner message
    pub on_error: Option<ErrorSink>,
}

impl<V> ViewConfig<V> {
    /// Configuration with default history limit and fail-closed apply
    pub fn new(
        title: impl Into<String>,
        columns: ColumnSet,
        comparator: WrapComparator<V>,
        mapper: RowMapper<VersionWrap<V>>,
    ) -> Self {
        Self {
            title: title.into(),
            columns,
            install_column: Column::date(INSTALL_TIME, "Install Time"),
            comparator,
            mapper,
            history_limit: DEFAULT_HISTORY_LIMIT,
            apply_requires_fresh_feeds: true,
            on_error: None,
        }
    }

    /// Set the history limit
    #[must_use]
    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Set the stale feed policy for apply
    #[must_use]
    pub fn apply_requires_fresh_feeds(mut self, required: bool) -> Self {
        self.apply_requires_fresh_feeds = required;
        self
    }

    /// Forward banner messages to a sink
    #[must_use]
    pub fn on_error(mut self, sink: ErrorSink) -> Self {
        self.on_error = Some(sink);
        self
    }
}

impl<V> fmt::Debug for ViewConfig<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewConfig")
            .field("title", &self.title)
            .field("columns", &self.columns.names())
            .field("history_limit", &self.history_limit)
            .field("apply_requires_fresh_feeds", &self.apply_requires_fresh_feeds)
            .finish_non_exhaustive()
    }
}

/// One staged change in an apply batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionChange<V> {
    /// Service name
    pub service: String,
    /// Server value before the change, `None` for an added service
    pub from: Option<V>,
    /// Staged value
    pub to: V,
}

/// Everything submitted by one apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyBatch<V> {
    /// Complete desired set, committed values only
    pub versions: Vec<DesiredVersion<V>>,
    /// What differs from the server's desired set
    pub changes: Vec<VersionChange<V>>,
}

/// Result of [`DesiredVersionsView::apply`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome<V> {
    /// No staged changes; nothing was submitted
    NothingToApply,
    /// Batch accepted and feeds reloaded
    Applied(ApplyBatch<V>),
    /// Batch rejected; staged changes kept
    Failed(String),
}

/// Editable, reconciled desired-versions table
pub struct DesiredVersionsView<V: VersionScheme> {
    config: ViewConfig<V>,
    desired: Option<Vec<DesiredVersion<V>>>,
    history: Option<Vec<DesiredVersionsSnapshot<V>>>,
    reference: Option<Vec<VersionInfo<V>>>,
    staged: BTreeMap<String, V>,
    store: RowStore<VersionWrap<V>>,
    edits: EditController,
    banner: ErrorBanner,
    feeds: [FeedState; 3],
    generation: u64,
    mounted: bool,
    publisher: ViewPublisher,
}

impl<V: VersionScheme> DesiredVersionsView<V> {
    /// Create an empty view; rows appear once the desired feed arrives
    pub fn new(config: ViewConfig<V>) -> Self {
        let comparator = Arc::clone(&config.comparator);
        let order: OrderFn<VersionWrap<V>> =
            Arc::new(move |a: &VersionWrap<V>, b: &VersionWrap<V>| comparator(Some(a), Some(b)));
        let store = RowStore::new(
            config.columns.clone(),
            Arc::new(|w: &VersionWrap<V>| w.service.clone()),
            order,
        );
        let publisher = ViewPublisher::new(&config.title);
        Self {
            config,
            desired: None,
            history: None,
            reference: None,
            staged: BTreeMap::new(),
            store,
            edits: EditController::new(),
            banner: ErrorBanner::default(),
            feeds: [FeedState::default(); 3],
            generation: 1,
            mounted: true,
            publisher,
        }
    }

    /// Configuration
    #[must_use]
    pub fn config(&self) -> &ViewConfig<V> {
        &self.config
    }

    /// Row store
    #[must_use]
    pub fn store(&self) -> &RowStore<VersionWrap<V>> {
        &self.store
    }

    /// Edit state
    #[must_use]
    pub fn edits(&self) -> &EditController {
        &self.edits
    }

    /// History snapshots, most recent first
    #[must_use]
    pub fn history(&self) -> &[DesiredVersionsSnapshot<V>] {
        self.history.as_deref().unwrap_or_default()
    }

    /// Locally staged versions by service
    #[must_use]
    pub fn staged(&self) -> &BTreeMap<String, V> {
        &self.staged
    }

    /// Whether a feed has delivered data at least once
    #[must_use]
    pub fn is_loaded(&self, feed: Feed) -> bool {
        self.feeds[feed.index()].loaded
    }

    /// Feeds that have not loaded, or failed since they last loaded
    #[must_use]
    pub fn stale_feeds(&self) -> Vec<Feed> {
        Feed::ALL
            .into_iter()
            .filter(|f| {
                let state = self.feeds[f.index()];
                !state.loaded || state.failed
            })
            .collect()
    }

    /// Banner message
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.banner.message()
    }

    /// Latest view
    #[must_use]
    pub fn view(&self) -> Arc<GridView> {
        self.publisher.current()
    }

    /// Receive every future view
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<GridView>> {
        self.publisher.subscribe()
    }

    // =========================================================================
    // Feeds
    // =========================================================================

    /// Issue a ticket for a feed request about to start
    pub fn begin_reload(&mut self, feed: Feed) -> FeedTicket {
        let state = &mut self.feeds[feed.index()];
        state.issued += 1;
        FeedTicket {
            feed,
            generation: self.generation,
            seq: state.issued,
        }
    }

    /// Apply a desired feed result; returns whether it was used
    pub fn complete_desired(
        &mut self,
        ticket: FeedTicket,
        result: Result<Vec<DesiredVersion<V>>, FeedError>,
    ) -> bool {
        if !self.accept(ticket, Feed::Desired) {
            return false;
        }
        match result {
            Ok(versions) => self.set_desired_versions(versions),
            Err(err) => self.feed_failed(Feed::Desired, &err),
        }
        true
    }

    /// Apply a history feed result; returns whether it was used
    pub fn complete_history(
        &mut self,
        ticket: FeedTicket,
        result: Result<Vec<DesiredVersionsSnapshot<V>>, FeedError>,
    ) -> bool {
        if !self.accept(ticket, Feed::History) {
            return false;
        }
        match result {
            Ok(history) => self.set_desired_versions_history(history),
            Err(err) => self.feed_failed(Feed::History, &err),
        }
        true
    }

    /// Apply a reference feed result; returns whether it was used
    pub fn complete_reference(
        &mut self,
        ticket: FeedTicket,
        result: Result<Vec<VersionInfo<V>>, FeedError>,
    ) -> bool {
        if !self.accept(ticket, Feed::Reference) {
            return false;
        }
        match result {
            Ok(info) => self.set_versions_history(info),
            Err(err) => self.feed_failed(Feed::Reference, &err),
        }
        true
    }

    /// Replace the desired feed and rebuild the rows
    pub fn set_desired_versions(&mut self, versions: Vec<DesiredVersion<V>>) {
        if !self.mounted {
            return;
        }
        debug!("{}: {} desired versions", self.config.title, versions.len());
        self.desired = Some(versions);
        self.feed_loaded(Feed::Desired);
        self.rederive();
    }

    /// Replace the reference feed and rebuild the rows
    pub fn set_versions_history(&mut self, info: Vec<VersionInfo<V>>) {
        if !self.mounted {
            return;
        }
        debug!("{}: {} reference versions", self.config.title, info.len());
        self.reference = Some(info);
        self.feed_loaded(Feed::Reference);
        self.rederive();
    }

    /// Replace the history feed, keeping at most the configured number of snapshots
    pub fn set_desired_versions_history(&mut self, mut history: Vec<DesiredVersionsSnapshot<V>>) {
        if !self.mounted {
            return;
        }
        history.truncate(self.config.history_limit);
        debug!("{}: {} history snapshots", self.config.title, history.len());
        self.history = Some(history);
        self.feed_loaded(Feed::History);
        self.rederive();
    }

    /// Fetch all three feeds concurrently and apply the results
    pub async fn reload(&mut self, backend: &dyn DesiredVersionsBackend<V>) {
        let desired = self.begin_reload(Feed::Desired);
        let history = self.begin_reload(Feed::History);
        let reference = self.begin_reload(Feed::Reference);
        let limit = self.config.history_limit;
        let (desired_result, history_result, reference_result) = tokio::join!(
            backend.fetch_desired(),
            backend.fetch_history(limit),
            backend.fetch_reference()
        );
        self.complete_reference(reference, reference_result);
        self.complete_history(history, history_result);
        self.complete_desired(desired, desired_result);
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Start editing the row of a service
    pub fn begin_edit(&mut self, service: &str) -> Result<(), GridError> {
        self.ensure_mounted()?;
        self.edits.begin_edit(&self.store, service)?;
        self.publish();
        Ok(())
    }

    /// Start drafting a new service
    pub fn begin_add(&mut self) -> Result<(), GridError> {
        self.ensure_mounted()?;
        self.edits.begin_add(&self.store)?;
        self.publish();
        Ok(())
    }

    /// Change a draft value from operator text; returns whether it is valid
    pub fn set_draft(&mut self, column: &str, input: &str) -> Result<bool, GridError> {
        self.ensure_mounted()?;
        let valid = self.edits.set_input(&self.store, column, input)?;
        self.publish();
        Ok(valid)
    }

    /// Restore one draft column to its committed value
    pub fn revert_draft(&mut self, column: &str) -> Result<bool, GridError> {
        let valid = self.edits.revert_draft(&self.store, column)?;
        self.publish();
        Ok(valid)
    }

    /// Load a service's version from a history snapshot into the draft.
    ///
    /// Opens an edit session on the row when none is open. Nothing is
    /// staged until [`commit`](Self::commit).
    pub fn revert_to_history(&mut self, service: &str, index: usize) -> Result<(), GridError> {
        self.ensure_mounted()?;
        let version = self
            .history()
            .get(index)
            .ok_or(GridError::SnapshotNotFound(index))?
            .version_of(service)
            .ok_or_else(|| GridError::SnapshotMissingRow {
                index,
                key: service.to_string(),
            })?
            .to_string();
        let target = self.edits.session().map(|s| s.target().clone());
        match target {
            Some(EditTarget::Row(key)) if key == service => {}
            Some(_) => return Err(GridError::EditInProgress),
            None => self.edits.begin_edit(&self.store, service)?,
        }
        debug!("{}: draft {} from snapshot {}", self.config.title, service, index);
        self.edits
            .set_draft(&self.store, VERSION, CellValue::Text(version))?;
        self.publish();
        Ok(())
    }

    /// Validate the draft and stage it locally
    pub fn commit(&mut self) -> Result<(), GridError> {
        self.ensure_mounted()?;
        let pending = match self.edits.commit(&self.store) {
            Ok(Some(pending)) => pending,
            Ok(None) => {
                self.publish();
                return Ok(());
            }
            Err(err) => {
                self.publish();
                return Err(err);
            }
        };
        let staged = match &pending.kind {
            MutationKind::Change { key, new_values, .. } => {
                parse_version::<V>(new_values).map(|version| (key.clone(), version))
            }
            MutationKind::Add { values } => parse_service(values)
                .and_then(|service| {
                    if self.store.find(&service).is_some() {
                        Err(GridError::DuplicateKey(service))
                    } else {
                        Ok(service)
                    }
                })
                .and_then(|service| parse_version::<V>(values).map(|version| (service, version))),
        };
        match staged {
            Ok((service, version)) => {
                if self.edits.finish(pending.ticket, Ok(())) == Completion::Applied {
                    info!("{}: staged {} = {}", self.config.title, service, version);
                    self.stage(service, version);
                    self.rederive();
                }
                Ok(())
            }
            Err(err) => {
                self.edits
                    .finish(pending.ticket, Err(MutationError::new(err.to_string())));
                self.publish();
                Err(err)
            }
        }
    }

    /// Discard the open session; returns whether there was one
    pub fn cancel(&mut self) -> bool {
        let had = self.edits.cancel();
        if had {
            self.publish();
        }
        had
    }

    /// Drop a staged change of one service; returns whether there was one
    pub fn unstage(&mut self, service: &str) -> bool {
        let had = self.staged.remove(service).is_some();
        if had {
            self.rederive();
        }
        had
    }

    // =========================================================================
    // Apply
    // =========================================================================

    /// The batch [`apply`](Self::apply) would submit, `None` with nothing staged
    pub fn pending_batch(&self) -> Result<Option<ApplyBatch<V>>, GridError> {
        self.ensure_mounted()?;
        if self.config.apply_requires_fresh_feeds {
            let stale = self.stale_feeds();
            if !stale.is_empty() {
                return Err(GridError::StaleFeeds {
                    feeds: stale.iter().map(|f| f.name().to_string()).collect(),
                });
            }
        }
        if self.staged.is_empty() {
            return Ok(None);
        }
        let versions = self
            .store
            .rows()
            .iter()
            .map(|row| DesiredVersion::new(row.key(), row.source().version.clone()))
            .collect();
        let changes = self
            .staged
            .iter()
            .map(|(service, to)| VersionChange {
                service: service.clone(),
                from: self.server_version(service).cloned(),
                to: to.clone(),
            })
            .collect();
        Ok(Some(ApplyBatch { versions, changes }))
    }

    /// Submit staged changes as one batch, then reload every feed.
    ///
    /// An accepted submit clears the submitted changes, so the refetched
    /// desired set decides what each row shows. A rejected submit surfaces on
    /// the banner and leaves rows and staged changes as they were.
    pub async fn apply(
        &mut self,
        backend: &dyn DesiredVersionsBackend<V>,
    ) -> Result<ApplyOutcome<V>, GridError> {
        let Some(batch) = self.pending_batch()? else {
            debug!("{}: nothing to apply", self.config.title);
            return Ok(ApplyOutcome::NothingToApply);
        };
        info!(
            "{}: applying {} change(s) over {} services",
            self.config.title,
            batch.changes.len(),
            batch.versions.len()
        );
        match backend.submit(&batch).await {
            Ok(()) => {
                self.banner.clear();
                for change in &batch.changes {
                    self.staged.remove(&change.service);
                }
                self.reload(backend).await;
                Ok(ApplyOutcome::Applied(batch))
            }
            Err(err) => {
                self.raise("Set desired versions", &err);
                self.publish();
                Ok(ApplyOutcome::Failed(err.0))
            }
        }
    }

    /// Dismiss the banner
    pub fn dismiss_error(&mut self) {
        self.banner.clear();
        self.publish();
    }

    /// Discard all state; results of requests still in flight are ignored
    pub fn unmount(&mut self) {
        debug!("{}: unmounted", self.config.title);
        self.mounted = false;
        self.generation += 1;
        self.edits.cancel();
        self.staged.clear();
        self.desired = None;
        self.history = None;
        self.reference = None;
        self.store.clear();
        self.banner.clear();
        self.publish();
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn accept(&mut self, ticket: FeedTicket, feed: Feed) -> bool {
        let state = &mut self.feeds[feed.index()];
        if !self.mounted
            || ticket.feed != feed
            || ticket.generation != self.generation
            || ticket.seq < state.applied
        {
            warn!(
                "{}: discarding stale {} result {}",
                self.config.title,
                feed.name(),
                ticket.seq
            );
            return false;
        }
        state.applied = ticket.seq;
        true
    }

    fn feed_loaded(&mut self, feed: Feed) {
        let state = &mut self.feeds[feed.index()];
        state.loaded = true;
        state.failed = false;
    }

    fn feed_failed(&mut self, feed: Feed, err: &FeedError) {
        self.feeds[feed.index()].failed = true;
        self.raise(&format!("Query {}", feed.name()), err);
        self.publish();
    }

    fn server_version(&self, service: &str) -> Option<&V> {
        self.desired
            .as_ref()?
            .iter()
            .find(|d| d.service == service)
            .map(|d| &d.version)
    }

    fn stage(&mut self, service: String, version: V) {
        if self.server_version(&service) == Some(&version) {
            self.staged.remove(&service);
        } else {
            self.staged.insert(service, version);
        }
    }

    fn wrap(&self, service: &str, version: V, modified: bool) -> VersionWrap<V> {
        let info = self
            .reference
            .as_ref()
            .and_then(|r| r.iter().find(|i| i.service == service));
        VersionWrap {
            service: service.to_string(),
            version,
            reference_loaded: self.reference.is_some(),
            build: info.map(|i| i.build_info.clone()),
            install: info.and_then(|i| i.install_info.clone()),
            modified,
        }
    }

    fn derive_rows(&self) -> Vec<(VersionWrap<V>, CellMap)> {
        let Some(desired) = &self.desired else {
            return Vec::new();
        };
        let mut wraps: Vec<VersionWrap<V>> = desired
            .iter()
            .map(|d| match self.staged.get(&d.service) {
                Some(staged) => self.wrap(&d.service, staged.clone(), true),
                None => self.wrap(&d.service, d.version.clone(), false),
            })
            .collect();
        for (service, version) in &self.staged {
            if !desired.iter().any(|d| &d.service == service) {
                wraps.push(self.wrap(service, version.clone(), true));
            }
        }
        wraps
            .into_iter()
            .map(|wrap| {
                let cells = (self.config.mapper)(&wrap);
                (wrap, cells)
            })
            .collect()
    }

    fn rederive(&mut self) {
        if let Some(desired) = &self.desired {
            self.staged.retain(|service, version| {
                desired
                    .iter()
                    .find(|d| &d.service == service)
                    .map_or(true, |d| &d.version != version)
            });
        }

        let install = &self.config.install_column;
        if self.reference.is_some() && !self.store.columns().contains(&install.name) {
            let extended = self.store.columns().with_column(install.clone());
            match extended.and_then(|columns| self.store.set_columns(columns)) {
                Ok(()) => debug!("{}: added {} column", self.config.title, INSTALL_TIME),
                Err(err) => warn!("{}: cannot extend columns: {}", self.config.title, err),
            }
        }

        let rows = self.derive_rows();
        if let Err(err) = self.store.replace_all(rows) {
            self.raise("Build rows", err);
        }

        let lost = match self.edits.session().map(|s| s.target()) {
            Some(EditTarget::Row(key)) => self.store.find(key).is_none(),
            _ => false,
        };
        if lost {
            debug!("{}: edited row disappeared, discarding draft", self.config.title);
            self.edits.cancel();
        }
        debug!(
            "{}: {} rows, {} staged",
            self.config.title,
            self.store.len(),
            self.staged.len()
        );
        self.publish();
    }

    fn raise(&mut self, context: &str, err: impl fmt::Display) {
        let message = self.banner.set(context, err).to_string();
        if let Some(sink) = &self.config.on_error {
            sink(&message);
        }
    }

    fn ensure_mounted(&self) -> Result<(), GridError> {
        if self.mounted {
            Ok(())
        } else {
            Err(GridError::Unmounted)
        }
    }

    fn publish(&mut self) {
        let view = render(
            &self.config.title,
            &self.store,
            &self.edits,
            &self.banner,
            |w: &VersionWrap<V>| w.modified,
        );
        self.publisher.publish(view);
    }
}

impl<V: VersionScheme> fmt::Debug for DesiredVersionsView<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DesiredVersionsView")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("staged", &self.staged)
            .field("edits", &self.edits)
            .field("banner", &self.banner)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

fn parse_service(values: &CellMap) -> Result<String, GridError> {
    values
        .get(SERVICE)
        .and_then(CellValue::as_text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .ok_or_else(|| GridError::Validation {
            columns: vec![SERVICE.to_string()],
        })
}

fn parse_version<V: VersionScheme>(values: &CellMap) -> Result<V, GridError> {
    values
        .get(VERSION)
        .and_then(CellValue::as_text)
        .and_then(|text| text.parse::<V>().ok())
        .ok_or_else(|| GridError::Validation {
            columns: vec![VERSION.to_string()],
        })
}
