// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Render-ready grid views and the generic single-feed editable grid

use crate::column::{ColumnSet, ValueType};
use crate::edit::{Completion, EditController, EditMode, EditTarget, MutationKind};
use crate::error::{FeedError, GridError, MutationError};
use crate::row::{CellMap, KeyFn, OrderFn, RowStore};
use crate::source::{ErrorSink, RowFeed, RowMutations};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Builds the cells of a row from its source record
pub type RowMapper<W> = Arc<dyn Fn(&W) -> CellMap + Send + Sync>;

/// The single engine-level error message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorBanner {
    message: Option<String>,
}

impl ErrorBanner {
    /// Replace the message with `"<context> error <err>"`
    pub fn set(&mut self, context: &str, err: impl fmt::Display) -> &str {
        let message = format!("{context} error {err}");
        warn!("{}", message);
        self.message.insert(message)
    }

    /// Dismiss the message
    pub fn clear(&mut self) {
        self.message = None;
    }

    /// Current message
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Column header as handed to the render surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnHeader {
    /// Column name
    pub name: String,
    /// Display label
    pub header: String,
    /// Declared type
    pub value_type: ValueType,
    /// Whether existing rows may edit it
    pub editable: bool,
}

/// One row as display strings in column order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedRow {
    /// Domain key, empty for the new row
    pub key: String,
    /// Edit mode of the row
    pub mode: EditMode,
    /// Display text per column
    pub cells: Vec<String>,
    /// Columns flagged invalid in the draft
    pub invalid: Vec<String>,
    /// Screen-defined highlight, e.g. a staged change
    pub marked: bool,
}

/// Everything the render surface needs for one pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridView {
    /// Increases with every published view
    pub revision: u64,
    /// Grid title
    pub title: String,
    /// Headers in display order
    pub columns: Vec<ColumnHeader>,
    /// Rows in store order
    pub rows: Vec<RenderedRow>,
    /// The pending new row, while adding
    pub new_row: Option<RenderedRow>,
    /// Error banner
    pub error: Option<String>,
}

impl GridView {
    /// An empty view
    #[must_use]
    pub fn empty(title: &str) -> Self {
        Self {
            revision: 0,
            title: title.to_string(),
            columns: Vec::new(),
            rows: Vec::new(),
            new_row: None,
            error: None,
        }
    }

    /// Index of a column by name
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Display text of a cell
    #[must_use]
    pub fn cell(&self, key: &str, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows
            .iter()
            .find(|r| r.key == key)
            .and_then(|r| r.cells.get(index))
            .map(String::as_str)
    }
}

fn headers(columns: &ColumnSet) -> Vec<ColumnHeader> {
    columns
        .iter()
        .map(|c| ColumnHeader {
            name: c.name.clone(),
            header: c.header.clone(),
            value_type: c.value_type,
            editable: c.editable,
        })
        .collect()
}

fn display_cells(columns: &ColumnSet, cells: &CellMap) -> Vec<String> {
    columns
        .iter()
        .map(|c| cells.get(&c.name).map(|v| c.display(v)).unwrap_or_default())
        .collect()
}

/// Build a view from store, edit state and banner
pub fn render<W>(
    title: &str,
    store: &RowStore<W>,
    edits: &EditController,
    banner: &ErrorBanner,
    marked: impl Fn(&W) -> bool,
) -> GridView {
    let columns = store.columns();
    let session = edits.session();
    let rows = store
        .rows()
        .iter()
        .map(|row| {
            let mode = edits.mode_of(row.key());
            let (cells, invalid) = match session {
                Some(s) if mode == EditMode::Editing => (
                    display_cells(columns, s.draft()),
                    s.invalid_columns().into_iter().map(String::from).collect(),
                ),
                _ => (display_cells(columns, row.cells()), Vec::new()),
            };
            RenderedRow {
                key: row.key().to_string(),
                mode,
                cells,
                invalid,
                marked: marked(row.source()),
            }
        })
        .collect();
    let new_row = session
        .filter(|s| *s.target() == EditTarget::NewRow)
        .map(|s| RenderedRow {
            key: String::new(),
            mode: EditMode::Adding,
            cells: display_cells(columns, s.draft()),
            invalid: s.invalid_columns().into_iter().map(String::from).collect(),
            marked: false,
        });
    GridView {
        revision: 0,
        title: title.to_string(),
        columns: headers(columns),
        rows,
        new_row,
        error: banner.message().map(String::from),
    }
}

/// Publishes views to subscribers
#[derive(Debug)]
pub struct ViewPublisher {
    tx: watch::Sender<Arc<GridView>>,
    revision: u64,
}

impl ViewPublisher {
    /// Start with an empty view
    #[must_use]
    pub fn new(title: &str) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(GridView::empty(title)));
        Self { tx, revision: 0 }
    }

    /// Stamp and publish a view
    pub fn publish(&mut self, mut view: GridView) {
        self.revision += 1;
        view.revision = self.revision;
        self.tx.send_replace(Arc::new(view));
    }

    /// Latest published view
    #[must_use]
    pub fn current(&self) -> Arc<GridView> {
        self.tx.borrow().clone()
    }

    /// Receive every future view
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<GridView>> {
        self.tx.subscribe()
    }
}

/// Tags a load with the grid identity it was issued against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    seq: u64,
}

/// Editable table over one query: rows, the edit session and an error banner.
///
/// Writes go through [`RowMutations`]; after a successful write the grid
/// reloads from its [`RowFeed`] instead of patching rows locally.
pub struct EditableGrid<W> {
    title: String,
    store: RowStore<W>,
    mapper: RowMapper<W>,
    edits: EditController,
    banner: ErrorBanner,
    on_error: Option<ErrorSink>,
    generation: u64,
    issued: u64,
    applied: u64,
    mounted: bool,
    publisher: ViewPublisher,
}

impl<W: Send> EditableGrid<W> {
    /// Create an empty grid
    pub fn new(
        title: impl Into<String>,
        columns: ColumnSet,
        key_fn: KeyFn<W>,
        order: OrderFn<W>,
        mapper: RowMapper<W>,
    ) -> Self {
        let title = title.into();
        let publisher = ViewPublisher::new(&title);
        Self {
            title,
            store: RowStore::new(columns, key_fn, order),
            mapper,
            edits: EditController::new(),
            banner: ErrorBanner::default(),
            on_error: None,
            generation: 1,
            issued: 0,
            applied: 0,
            mounted: true,
            publisher,
        }
    }

    /// Forward every banner message to a screen-level sink
    #[must_use]
    pub fn with_error_sink(mut self, sink: ErrorSink) -> Self {
        self.on_error = Some(sink);
        self
    }

    /// Row store
    #[must_use]
    pub fn store(&self) -> &RowStore<W> {
        &self.store
    }

    /// Edit state
    #[must_use]
    pub fn edits(&self) -> &EditController {
        &self.edits
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

    /// Issue a ticket for a load about to start
    pub fn begin_load(&mut self) -> LoadTicket {
        self.issued += 1;
        LoadTicket {
            generation: self.generation,
            seq: self.issued,
        }
    }

    /// Apply a load result; returns whether it was used
    pub fn complete_load(&mut self, ticket: LoadTicket, result: Result<Vec<W>, FeedError>) -> bool {
        if !self.mounted || ticket.generation != self.generation || ticket.seq < self.applied {
            warn!("{}: discarding stale load {}", self.title, ticket.seq);
            return false;
        }
        self.applied = ticket.seq;
        match result {
            Ok(records) => {
                let rows = records
                    .into_iter()
                    .map(|record| {
                        let cells = (self.mapper)(&record);
                        (record, cells)
                    })
                    .collect();
                match self.store.replace_all(rows) {
                    Ok(()) => {
                        debug!("{}: loaded {} rows", self.title, self.store.len());
                        self.banner.clear();
                    }
                    Err(err) => self.raise("Query rows", err),
                }
            }
            Err(err) => self.raise("Query rows", err),
        }
        self.publish();
        true
    }

    /// Fetch and apply the rows
    pub async fn reload(&mut self, feed: &dyn RowFeed<W>) {
        let ticket = self.begin_load();
        let result = feed.fetch_rows().await;
        self.complete_load(ticket, result);
    }

    /// Start editing a row
    pub fn begin_edit(&mut self, key: &str) -> Result<(), GridError> {
        self.ensure_mounted()?;
        self.edits.begin_edit(&self.store, key)?;
        self.publish();
        Ok(())
    }

    /// Start adding a row
    pub fn begin_add(&mut self) -> Result<(), GridError> {
        self.ensure_mounted()?;
        self.edits.begin_add(&self.store)?;
        self.publish();
        Ok(())
    }

    /// Change a draft value from operator text
    pub fn set_input(&mut self, column: &str, input: &str) -> Result<bool, GridError> {
        let valid = self.edits.set_input(&self.store, column, input)?;
        self.publish();
        Ok(valid)
    }

    /// Discard the open session
    pub fn cancel(&mut self) {
        if self.edits.cancel() {
            self.publish();
        }
    }

    /// Validate and write the open session, then reload on success
    pub async fn commit(
        &mut self,
        mutations: &dyn RowMutations,
        feed: &dyn RowFeed<W>,
    ) -> Result<Completion, GridError> {
        let pending = match self.edits.commit(&self.store) {
            Ok(Some(pending)) => pending,
            Ok(None) => {
                self.publish();
                return Ok(Completion::Applied);
            }
            Err(err) => {
                self.publish();
                return Err(err);
            }
        };
        self.publish();
        let (context, result) = match &pending.kind {
            MutationKind::Add { values } => ("Add row", mutations.add_row(values).await),
            MutationKind::Change {
                key,
                new_values,
                old_values,
            } => (
                "Change row",
                mutations.change_row(key, new_values, old_values).await,
            ),
        };
        let completion = self.edits.finish(pending.ticket, result);
        self.settle(context, &completion, feed).await;
        Ok(completion)
    }

    /// Delete a row remotely, then reload on success
    pub async fn remove(
        &mut self,
        key: &str,
        mutations: &dyn RowMutations,
        feed: &dyn RowFeed<W>,
    ) -> Result<Completion, GridError> {
        self.ensure_mounted()?;
        if self.store.find(key).is_none() {
            return Err(GridError::RowNotFound(key.to_string()));
        }
        if self.edits.mode_of(key) != EditMode::Viewing {
            return Err(GridError::EditInProgress);
        }
        let completion = match mutations.remove_row(key).await {
            Ok(()) => Completion::Applied,
            Err(MutationError(message)) => Completion::Failed(message),
        };
        self.settle("Remove row", &completion, feed).await;
        Ok(completion)
    }

    /// Dismiss the banner
    pub fn dismiss_error(&mut self) {
        self.banner.clear();
        self.publish();
    }

    /// Drop all state; later load results are ignored
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.generation += 1;
        self.edits.cancel();
        self.store.clear();
        self.banner.clear();
        self.publish();
    }

    async fn settle(&mut self, context: &str, completion: &Completion, feed: &dyn RowFeed<W>) {
        match completion {
            Completion::Applied => {
                info!("{}: {} succeeded", self.title, context.to_lowercase());
                self.banner.clear();
                self.reload(feed).await;
            }
            Completion::Failed(message) => {
                self.raise(context, message);
                self.publish();
            }
            Completion::Stale => {}
        }
    }

    fn raise(&mut self, context: &str, err: impl fmt::Display) {
        let message = self.banner.set(context, err).to_string();
        if let Some(sink) = &self.on_error {
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
        let view = render(&self.title, &self.store, &self.edits, &self.banner, |_| false);
        self.publisher.publish(view);
    }
}

impl<W> fmt::Debug for EditableGrid<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditableGrid")
            .field("title", &self.title)
            .field("store", &self.store)
            .field("edits", &self.edits)
            .field("banner", &self.banner)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
