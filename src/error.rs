// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Error types for the grid engine

use thiserror::Error;

/// Errors raised by local grid operations.
///
/// None of these reach the error banner: they are returned to the caller
/// (usually a screen) which decides whether to flag a cell or ignore the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    /// Two columns in one column set share a name
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),
    /// A column name is not part of the current column set
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    /// A row with this domain key already exists
    #[error("duplicate row key: {0}")]
    DuplicateKey(String),
    /// No row with this domain key
    #[error("row not found: {0}")]
    RowNotFound(String),
    /// A cell value does not match its column's declared type
    #[error("column {column} expects {expected}")]
    TypeMismatch {
        /// Column name
        column: String,
        /// Declared value type
        expected: String,
    },
    /// Another row is already being edited or added
    #[error("another edit is in progress")]
    EditInProgress,
    /// The operation needs an open edit session
    #[error("no edit in progress")]
    NoEditSession,
    /// The edit session is waiting for its mutation to resolve
    #[error("edit is being submitted")]
    Submitting,
    /// The column cannot be edited in the current mode
    #[error("column is not editable: {0}")]
    NotEditable(String),
    /// One or more draft values failed validation
    #[error("invalid value in: {}", .columns.join(", "))]
    Validation {
        /// Columns whose draft value failed validation
        columns: Vec<String>,
    },
    /// No snapshot at this history position
    #[error("history snapshot {0} not available")]
    SnapshotNotFound(usize),
    /// The snapshot does not mention this row
    #[error("snapshot {index} has no entry for {key}")]
    SnapshotMissingRow {
        /// History position
        index: usize,
        /// Row domain key
        key: String,
    },
    /// Apply refused because an input feed is missing or failed since it last loaded
    #[error("cannot apply with stale feeds: {}", .feeds.join(", "))]
    StaleFeeds {
        /// Names of the stale feeds
        feeds: Vec<String>,
    },
    /// The view was unmounted
    #[error("view is unmounted")]
    Unmounted,
}

/// A failed query against one of the input feeds
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct FeedError(pub String);

impl FeedError {
    /// Create a feed error from any displayable message
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A rejected remote write (add, change, remove, apply)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct MutationError(pub String);

impl MutationError {
    /// Create a mutation error from any displayable message
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Version text that does not match its scheme
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionParseError {
    /// Empty input
    #[error("empty version")]
    Empty,
    /// A build segment is not a non-negative integer
    #[error("invalid build segment '{segment}' in '{input}'")]
    InvalidSegment {
        /// Offending segment
        segment: String,
        /// Whole input
        input: String,
    },
    /// Distribution prefix missing
    #[error("missing distribution in '{0}'")]
    MissingDistribution(String),
}
