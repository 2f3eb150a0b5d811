// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Cell edit state machine
//!
//! A grid has at most one open [`EditSession`]: either an existing row being
//! edited or a pending new row being added. Drafts never touch the row store.
//! A commit validates the whole draft and hands back a [`PendingMutation`];
//! the store only changes after the caller's remote write succeeds and the
//! rows are reloaded.
//!
//! ```text
//! row:     viewing -> editing -> submitting -> viewing
//!                        ^           |  (write failed)
//!                        +-----------+
//! new row: hidden  -> adding  -> submitting -> hidden
//! ```
//! Cancellation from any state discards the draft.

use crate::column::{CellValue, Column, ValidationContext};
use crate::error::{GridError, MutationError};
use crate::row::{CellMap, RowStore};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// What an edit session is attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    /// An existing row, by domain key
    Row(String),
    /// The pending new row
    NewRow,
}

/// Edit mode of a row as seen by the render surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    /// Showing committed values
    Viewing,
    /// Showing a draft of an existing row
    Editing,
    /// Showing the draft of a new row
    Adding,
}

/// Progress of an open session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPhase {
    /// Operator is changing the draft
    Drafting,
    /// Draft passed validation; waiting for the remote write
    Submitting,
}

/// Transient draft state for one row or the new row
#[derive(Debug, Clone, PartialEq)]
pub struct EditSession {
    target: EditTarget,
    phase: EditPhase,
    draft: CellMap,
    original: CellMap,
    validity: BTreeMap<String, bool>,
    ticket: u64,
}

impl EditSession {
    /// What the session edits
    #[must_use]
    pub fn target(&self) -> &EditTarget {
        &self.target
    }

    /// Editing or adding
    #[must_use]
    pub fn mode(&self) -> EditMode {
        match self.target {
            EditTarget::Row(_) => EditMode::Editing,
            EditTarget::NewRow => EditMode::Adding,
        }
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> EditPhase {
        self.phase
    }

    /// Draft values
    #[must_use]
    pub fn draft(&self) -> &CellMap {
        &self.draft
    }

    /// Committed values at the time the session opened
    #[must_use]
    pub fn original(&self) -> &CellMap {
        &self.original
    }

    /// Whether the last evaluation of this column passed
    #[must_use]
    pub fn is_valid(&self, column: &str) -> bool {
        self.validity.get(column).copied().unwrap_or(true)
    }

    /// Columns currently flagged invalid
    #[must_use]
    pub fn invalid_columns(&self) -> Vec<&str> {
        self.validity
            .iter()
            .filter(|(_, valid)| !**valid)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Columns whose draft differs from the original
    #[must_use]
    pub fn changed_columns(&self) -> Vec<&str> {
        self.draft
            .iter()
            .filter(|(name, value)| self.original.get(*name) != Some(*value))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    fn row_key(&self) -> Option<&str> {
        match &self.target {
            EditTarget::Row(key) => Some(key),
            EditTarget::NewRow => None,
        }
    }
}

/// Validated change, ready to be written remotely
#[derive(Debug, Clone, PartialEq)]
pub enum MutationKind {
    /// Existing row changed
    Change {
        /// Domain key of the row
        key: String,
        /// Draft values
        new_values: CellMap,
        /// Values before the edit
        old_values: CellMap,
    },
    /// New row added
    Add {
        /// Draft values
        values: CellMap,
    },
}

/// A mutation tagged with the session it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMutation {
    /// Matches the session that produced it
    pub ticket: u64,
    /// What to write
    pub kind: MutationKind,
}

/// Result of reporting a remote write back to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Write succeeded, session closed
    Applied,
    /// Write failed, session back to drafting with its draft intact
    Failed(String),
    /// The session that issued the write is gone; nothing changed
    Stale,
}

/// Owner of the single edit session of a grid
#[derive(Debug, Default)]
pub struct EditController {
    session: Option<EditSession>,
    next_ticket: u64,
}

impl EditController {
    /// Create an idle controller
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The open session, if any
    #[must_use]
    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    /// Whether no session is open
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.session.is_none()
    }

    /// Mode of the row with this key
    #[must_use]
    pub fn mode_of(&self, key: &str) -> EditMode {
        match self.session.as_ref().and_then(EditSession::row_key) {
            Some(k) if k == key => EditMode::Editing,
            _ => EditMode::Viewing,
        }
    }

    /// Start editing an existing row
    pub fn begin_edit<W>(&mut self, store: &RowStore<W>, key: &str) -> Result<(), GridError> {
        if self.session.is_some() {
            return Err(GridError::EditInProgress);
        }
        let row = store
            .find(key)
            .ok_or_else(|| GridError::RowNotFound(key.to_string()))?;
        let mut session = EditSession {
            target: EditTarget::Row(key.to_string()),
            phase: EditPhase::Drafting,
            draft: row.cells().clone(),
            original: row.cells().clone(),
            validity: BTreeMap::new(),
            ticket: 0,
        };
        for column in store.columns().iter().filter(|c| c.editable) {
            let valid = evaluate(store, &session, column);
            session.validity.insert(column.name.clone(), valid);
        }
        debug!("editing row {}", key);
        self.session = Some(session);
        Ok(())
    }

    /// Start drafting a new row
    pub fn begin_add<W>(&mut self, store: &RowStore<W>) -> Result<(), GridError> {
        if self.session.is_some() {
            return Err(GridError::EditInProgress);
        }
        let draft: CellMap = store
            .columns()
            .iter()
            .map(|c| (c.name.clone(), CellValue::Empty))
            .collect();
        debug!("adding new row");
        self.session = Some(EditSession {
            target: EditTarget::NewRow,
            phase: EditPhase::Drafting,
            original: draft.clone(),
            draft,
            validity: BTreeMap::new(),
            ticket: 0,
        });
        Ok(())
    }

    /// Change one draft value; returns whether it passes validation
    pub fn set_draft<W>(
        &mut self,
        store: &RowStore<W>,
        column: &str,
        value: CellValue,
    ) -> Result<bool, GridError> {
        let session = self.session.as_mut().ok_or(GridError::NoEditSession)?;
        if session.phase == EditPhase::Submitting {
            return Err(GridError::Submitting);
        }
        let col = store
            .columns()
            .get(column)
            .ok_or_else(|| GridError::UnknownColumn(column.to_string()))?;
        let allowed = match session.target {
            EditTarget::Row(_) => col.editable,
            EditTarget::NewRow => col.accepts_input(),
        };
        if !allowed {
            return Err(GridError::NotEditable(column.to_string()));
        }
        session.draft.insert(column.to_string(), value);
        let valid = evaluate(store, session, col);
        session.validity.insert(column.to_string(), valid);
        Ok(valid)
    }

    /// Change one draft value from operator text
    pub fn set_input<W>(
        &mut self,
        store: &RowStore<W>,
        column: &str,
        input: &str,
    ) -> Result<bool, GridError> {
        let value_type = store
            .columns()
            .get(column)
            .map(|c| c.value_type)
            .ok_or_else(|| GridError::UnknownColumn(column.to_string()))?;
        self.set_draft(store, column, CellValue::from_input(value_type, input))
    }

    /// Put one column of the draft back to its original value
    pub fn revert_draft<W>(&mut self, store: &RowStore<W>, column: &str) -> Result<bool, GridError> {
        let original = self
            .session
            .as_ref()
            .ok_or(GridError::NoEditSession)?
            .original
            .get(column)
            .cloned()
            .unwrap_or(CellValue::Empty);
        self.set_draft(store, column, original)
    }

    /// Validate the whole draft.
    ///
    /// On failure the session stays in drafting with the failing columns
    /// flagged. An edit that changes nothing closes the session and yields
    /// `None`. Otherwise the session moves to submitting and the mutation is
    /// returned for the caller to write.
    pub fn commit<W>(&mut self, store: &RowStore<W>) -> Result<Option<PendingMutation>, GridError> {
        let session = self.session.as_mut().ok_or(GridError::NoEditSession)?;
        if session.phase == EditPhase::Submitting {
            return Err(GridError::Submitting);
        }
        if let Some(key) = session.row_key() {
            if store.find(key).is_none() {
                return Err(GridError::RowNotFound(key.to_string()));
            }
        }

        let adding = session.target == EditTarget::NewRow;
        let mut invalid = Vec::new();
        for column in store
            .columns()
            .iter()
            .filter(|c| if adding { c.accepts_input() } else { c.editable })
        {
            let valid = evaluate(store, session, column);
            session.validity.insert(column.name.clone(), valid);
            if !valid {
                invalid.push(column.name.clone());
            }
        }
        if !invalid.is_empty() {
            debug!("commit rejected, invalid columns: {:?}", invalid);
            return Err(GridError::Validation { columns: invalid });
        }

        let kind = match &session.target {
            EditTarget::Row(key) => {
                if session.draft == session.original {
                    debug!("no changes to row {}", key);
                    self.session = None;
                    return Ok(None);
                }
                MutationKind::Change {
                    key: key.clone(),
                    new_values: session.draft.clone(),
                    old_values: session.original.clone(),
                }
            }
            EditTarget::NewRow => MutationKind::Add {
                values: session.draft.clone(),
            },
        };
        self.next_ticket += 1;
        session.ticket = self.next_ticket;
        session.phase = EditPhase::Submitting;
        Ok(Some(PendingMutation {
            ticket: session.ticket,
            kind,
        }))
    }

    /// Report the outcome of the remote write for a pending mutation
    pub fn finish(&mut self, ticket: u64, result: Result<(), MutationError>) -> Completion {
        let live = self
            .session
            .as_ref()
            .is_some_and(|s| s.phase == EditPhase::Submitting && s.ticket == ticket);
        if !live {
            warn!("ignoring result of stale mutation {}", ticket);
            return Completion::Stale;
        }
        match result {
            Ok(()) => {
                self.session = None;
                Completion::Applied
            }
            Err(err) => {
                if let Some(session) = self.session.as_mut() {
                    session.phase = EditPhase::Drafting;
                }
                Completion::Failed(err.0)
            }
        }
    }

    /// Discard the open session; returns whether there was one
    pub fn cancel(&mut self) -> bool {
        let had = self.session.take().is_some();
        if had {
            debug!("edit cancelled");
        }
        had
    }
}

fn evaluate<W>(store: &RowStore<W>, session: &EditSession, column: &Column) -> bool {
    let value = session.draft.get(&column.name).unwrap_or(&CellValue::Empty);
    let peers = store.column_values(&column.name);
    let ctx = ValidationContext {
        row_index: session.row_key().and_then(|key| store.position(key)),
        peers: &peers,
    };
    value.conforms_to(column.value_type) && column.is_valid(value, &ctx)
}
