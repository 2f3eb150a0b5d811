// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Row store: ordered, keyed collection of normalized rows

use crate::column::{CellValue, ColumnSet};
use crate::error::GridError;
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Cell values keyed by column name
pub type CellMap = BTreeMap<String, CellValue>;

/// Extracts the domain key (e.g. service name) from a source record
pub type KeyFn<W> = Arc<dyn Fn(&W) -> String + Send + Sync>;

/// Total order over source records
pub type OrderFn<W> = Arc<dyn Fn(&W, &W) -> Ordering + Send + Sync>;

/// One grid row: the record it was built from plus its cells
#[derive(Debug, Clone, PartialEq)]
pub struct Row<W> {
    key: String,
    source: W,
    cells: CellMap,
}

impl<W> Row<W> {
    /// Domain key
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Record this row was built from
    #[must_use]
    pub fn source(&self) -> &W {
        &self.source
    }

    /// All cells
    #[must_use]
    pub fn cells(&self) -> &CellMap {
        &self.cells
    }

    /// Cell for a column
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column)
    }
}

/// Ordered collection of rows.
///
/// Every stored row has a cell for every declared column, and the rows are
/// kept sorted by the comparator after every mutation.
#[derive(Clone)]
pub struct RowStore<W> {
    columns: ColumnSet,
    rows: Vec<Row<W>>,
    key_fn: KeyFn<W>,
    order: OrderFn<W>,
}

impl<W> fmt::Debug for RowStore<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowStore")
            .field("columns", &self.columns.names())
            .field("rows", &self.rows.len())
            .finish_non_exhaustive()
    }
}

impl<W> RowStore<W> {
    /// Create an empty store
    pub fn new(columns: ColumnSet, key_fn: KeyFn<W>, order: OrderFn<W>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            key_fn,
            order,
        }
    }

    /// Current column set
    #[must_use]
    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    /// Rows in order
    #[must_use]
    pub fn rows(&self) -> &[Row<W>] {
        &self.rows
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Domain key of a record
    pub fn key_of(&self, source: &W) -> String {
        (self.key_fn)(source)
    }

    /// Find a row by domain key
    #[must_use]
    pub fn find(&self, key: &str) -> Option<&Row<W>> {
        self.rows.iter().find(|r| r.key == key)
    }

    /// Position of a row by domain key
    #[must_use]
    pub fn position(&self, key: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.key == key)
    }

    /// Committed values of one column, in row order
    #[must_use]
    pub fn column_values(&self, column: &str) -> Vec<CellValue> {
        self.rows
            .iter()
            .map(|r| r.cells.get(column).cloned().unwrap_or(CellValue::Empty))
            .collect()
    }

    /// Append a row, then re-sort
    pub fn insert(&mut self, source: W, cells: CellMap) -> Result<(), GridError> {
        let row = self.make_row(source, cells)?;
        if self.find(&row.key).is_some() {
            return Err(GridError::DuplicateKey(row.key));
        }
        self.rows.push(row);
        self.sort();
        Ok(())
    }

    /// Replace the row with this key, then re-sort
    pub fn replace(&mut self, key: &str, source: W, cells: CellMap) -> Result<(), GridError> {
        let pos = self
            .position(key)
            .ok_or_else(|| GridError::RowNotFound(key.to_string()))?;
        let row = self.make_row(source, cells)?;
        if row.key != key && self.find(&row.key).is_some() {
            return Err(GridError::DuplicateKey(row.key));
        }
        self.rows[pos] = row;
        self.sort();
        Ok(())
    }

    /// Remove the row with this key
    pub fn remove(&mut self, key: &str) -> Option<Row<W>> {
        let pos = self.position(key)?;
        Some(self.rows.remove(pos))
    }

    /// Replace every row at once. On error the store is left untouched.
    pub fn replace_all(&mut self, rows: Vec<(W, CellMap)>) -> Result<(), GridError> {
        let mut built: Vec<Row<W>> = Vec::with_capacity(rows.len());
        for (source, cells) in rows {
            let row = self.make_row(source, cells)?;
            if built.iter().any(|r| r.key == row.key) {
                return Err(GridError::DuplicateKey(row.key));
            }
            built.push(row);
        }
        self.rows = built;
        self.sort();
        Ok(())
    }

    /// Drop every row
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Swap in a new column set and re-normalize every row.
    ///
    /// On error the store keeps its previous columns and rows.
    pub fn set_columns(&mut self, columns: ColumnSet) -> Result<(), GridError> {
        let normalized = self
            .rows
            .iter()
            .map(|row| normalize(&columns, row.cells.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        for (row, cells) in self.rows.iter_mut().zip(normalized) {
            row.cells = cells;
        }
        self.columns = columns;
        Ok(())
    }

    /// SHA-256 over keys and cells in row and column order
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for column in self.columns.iter() {
            hasher.update(column.name.as_bytes());
            hasher.update([0u8]);
        }
        for row in &self.rows {
            hasher.update(row.key.as_bytes());
            hasher.update([1u8]);
            for column in self.columns.iter() {
                let value = row.cells.get(&column.name).unwrap_or(&CellValue::Empty);
                hasher.update(serde_json::to_string(value).unwrap_or_default().as_bytes());
                hasher.update([2u8]);
            }
        }
        hex::encode(hasher.finalize())
    }

    fn make_row(&self, source: W, cells: CellMap) -> Result<Row<W>, GridError> {
        let key = (self.key_fn)(&source);
        let cells = normalize(&self.columns, cells)?;
        Ok(Row { key, source, cells })
    }

    fn sort(&mut self) {
        let order = Arc::clone(&self.order);
        self.rows.sort_by(|a, b| order(&a.source, &b.source));
    }
}

/// Give the cells exactly one entry per declared column
fn normalize(columns: &ColumnSet, mut cells: CellMap) -> Result<CellMap, GridError> {
    let mut normalized = CellMap::new();
    for column in columns.iter() {
        let value = cells.remove(&column.name).unwrap_or(CellValue::Empty);
        if !value.conforms_to(column.value_type) {
            return Err(GridError::TypeMismatch {
                column: column.name.clone(),
                expected: column.value_type.name().to_string(),
            });
        }
        normalized.insert(column.name.clone(), value);
    }
    if !cells.is_empty() {
        tracing::trace!("dropping undeclared cells: {:?}", cells.keys().collect::<Vec<_>>());
    }
    Ok(normalized)
}
