// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Column model: declarative, typed description of a grid column

use crate::error::GridError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Declared type of the values in a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Free text
    Text,
    /// Numeric value
    Number,
    /// Point in time
    Date,
    /// Opaque list of per-row action elements
    Elements,
}

impl ValueType {
    /// Short name used in messages
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
            Self::Elements => "elements",
        }
    }
}

/// An opaque action element rendered inside a cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// Action identifier, e.g. `delete`
    pub id: String,
    /// Display label
    pub label: String,
}

/// Value held by one cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    /// Text value
    Text(String),
    /// Numeric value
    Number(f64),
    /// Timestamp
    Date(DateTime<Utc>),
    /// Action elements
    Elements(Vec<Element>),
    /// Known to have no value
    Empty,
    /// The feed supplying this value has not arrived yet
    NotLoaded,
}

impl CellValue {
    /// Text cell from anything string-like
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Text cell, or `Empty` for `None`
    pub fn opt_text(value: Option<impl Into<String>>) -> Self {
        value.map_or(Self::Empty, |v| Self::Text(v.into()))
    }

    /// Date cell, or `Empty` for `None`
    #[must_use]
    pub fn opt_date(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(Self::Empty, Self::Date)
    }

    /// Convert operator input to a cell of the given type.
    ///
    /// Surrounding whitespace is dropped. Number input that does not parse
    /// stays `Text` so that a number validator can reject it.
    #[must_use]
    pub fn from_input(value_type: ValueType, input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        match value_type {
            ValueType::Number => trimmed
                .parse::<f64>()
                .map_or_else(|_| Self::Text(trimmed.to_string()), Self::Number),
            ValueType::Date => DateTime::parse_from_rfc3339(trimmed).map_or_else(
                |_| Self::Text(trimmed.to_string()),
                |d| Self::Date(d.with_timezone(&Utc)),
            ),
            ValueType::Text | ValueType::Elements => Self::Text(trimmed.to_string()),
        }
    }

    /// Whether the cell holds no value (either empty or not loaded)
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty | Self::NotLoaded => true,
            Self::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Text content, if this is a text cell
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Whether the value may be stored in a column of this type
    #[must_use]
    pub fn conforms_to(&self, value_type: ValueType) -> bool {
        matches!(
            (self, value_type),
            (Self::Empty | Self::NotLoaded, _)
                | (Self::Text(_), ValueType::Text)
                | (Self::Number(_), ValueType::Number)
                | (Self::Date(_), ValueType::Date)
                | (Self::Elements(_), ValueType::Elements)
        )
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
            Self::Elements(elements) => {
                let labels: Vec<&str> = elements.iter().map(|e| e.label.as_str()).collect();
                f.write_str(&labels.join(" "))
            }
            Self::Empty | Self::NotLoaded => Ok(()),
        }
    }
}

/// Read-only context handed to a validator
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    /// Position of the row being validated, `None` for a new row
    pub row_index: Option<usize>,
    /// Committed values of this column, in row order
    pub peers: &'a [CellValue],
}

/// Pure validation rule for a candidate value
pub type Validator = Arc<dyn Fn(&CellValue, &ValidationContext<'_>) -> bool + Send + Sync>;

/// Custom display for a cell value
pub type Renderer = Arc<dyn Fn(&CellValue) -> String + Send + Sync>;

/// Declarative description of one column
#[derive(Clone)]
pub struct Column {
    /// Identifier, unique within a column set
    pub name: String,
    /// Display label
    pub header: String,
    /// Declared value type
    pub value_type: ValueType,
    /// Whether existing rows may edit this column
    pub editable: bool,
    validate: Option<Validator>,
    render: Option<Renderer>,
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("header", &self.header)
            .field("value_type", &self.value_type)
            .field("editable", &self.editable)
            .field("validate", &self.validate.is_some())
            .field("render", &self.render.is_some())
            .finish()
    }
}

impl Column {
    /// New read-only column
    pub fn new(name: impl Into<String>, header: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            header: header.into(),
            value_type,
            editable: false,
            validate: None,
            render: None,
        }
    }

    /// Text column
    pub fn text(name: impl Into<String>, header: impl Into<String>) -> Self {
        Self::new(name, header, ValueType::Text)
    }

    /// Number column
    pub fn number(name: impl Into<String>, header: impl Into<String>) -> Self {
        Self::new(name, header, ValueType::Number)
    }

    /// Date column
    pub fn date(name: impl Into<String>, header: impl Into<String>) -> Self {
        Self::new(name, header, ValueType::Date)
    }

    /// Action elements column
    pub fn elements(name: impl Into<String>, header: impl Into<String>) -> Self {
        Self::new(name, header, ValueType::Elements)
    }

    /// Allow editing of existing rows
    #[must_use]
    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    /// Attach a validation rule
    #[must_use]
    pub fn validate(mut self, rule: Validator) -> Self {
        self.validate = Some(rule);
        self
    }

    /// Attach a custom renderer
    #[must_use]
    pub fn render_with(mut self, renderer: Renderer) -> Self {
        self.render = Some(renderer);
        self
    }

    /// Whether this column carries a validation rule
    #[must_use]
    pub fn has_validator(&self) -> bool {
        self.validate.is_some()
    }

    /// Whether the column can hold operator input at all
    #[must_use]
    pub fn accepts_input(&self) -> bool {
        self.value_type != ValueType::Elements
    }

    /// Run the validation rule; columns without one accept anything
    #[must_use]
    pub fn is_valid(&self, value: &CellValue, ctx: &ValidationContext<'_>) -> bool {
        self.validate.as_ref().map_or(true, |rule| rule(value, ctx))
    }

    /// Display text for a value
    #[must_use]
    pub fn display(&self, value: &CellValue) -> String {
        match &self.render {
            Some(render) => render(value),
            None => value.to_string(),
        }
    }
}

/// Immutable, ordered set of uniquely named columns.
///
/// Cloning is cheap. A change of columns builds a new set.
#[derive(Debug, Clone)]
pub struct ColumnSet {
    columns: Arc<[Column]>,
}

impl ColumnSet {
    /// Build a column set, rejecting duplicate names
    pub fn new(columns: Vec<Column>) -> Result<Self, GridError> {
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(GridError::DuplicateColumn(column.name.clone()));
            }
        }
        Ok(Self {
            columns: columns.into(),
        })
    }

    /// A new set with one more column at the end
    pub fn with_column(&self, column: Column) -> Result<Self, GridError> {
        let mut columns = self.columns.to_vec();
        columns.push(column);
        Self::new(columns)
    }

    /// Look up a column by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Whether a column with this name exists
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Columns in display order
    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    /// Column names in display order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Number of columns
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the set has no columns
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Whether two handles point at the same column set
    #[must_use]
    pub fn same_set(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.columns, &other.columns)
    }
}

/// Built-in validation rules
pub mod validators {
    use super::{CellValue, ValidationContext, Validator};
    use crate::version::VersionScheme;
    use std::sync::Arc;

    /// Value must not be blank
    #[must_use]
    pub fn non_empty() -> Validator {
        Arc::new(|value: &CellValue, _: &ValidationContext<'_>| !value.is_blank())
    }

    /// Value must be an absolute URL
    #[must_use]
    pub fn url() -> Validator {
        Arc::new(|value: &CellValue, _: &ValidationContext<'_>| {
            value
                .as_text()
                .is_some_and(|text| !text.trim().is_empty() && reqwest::Url::parse(text.trim()).is_ok())
        })
    }

    /// Value must be a finite number, or text that parses as one.
    /// A blank value passes; combine with [`non_empty`] to require one.
    #[must_use]
    pub fn number() -> Validator {
        Arc::new(|value: &CellValue, _: &ValidationContext<'_>| match value {
            CellValue::Empty | CellValue::NotLoaded => true,
            CellValue::Number(n) => n.is_finite(),
            CellValue::Text(text) => text.trim().parse::<f64>().is_ok_and(f64::is_finite),
            _ => false,
        })
    }

    /// Value must not appear in any other row of the same column.
    /// Text is compared without surrounding whitespace.
    #[must_use]
    pub fn unique() -> Validator {
        Arc::new(|value: &CellValue, ctx: &ValidationContext<'_>| {
            !ctx.peers
                .iter()
                .enumerate()
                .any(|(i, peer)| Some(i) != ctx.row_index && same_value(peer, value))
        })
    }

    fn same_value(a: &CellValue, b: &CellValue) -> bool {
        match (a, b) {
            (CellValue::Text(a), CellValue::Text(b)) => a.trim() == b.trim(),
            _ => a == b,
        }
    }

    /// Value must parse as version scheme `V`
    #[must_use]
    pub fn parses_as<V: VersionScheme>() -> Validator {
        Arc::new(|value: &CellValue, _: &ValidationContext<'_>| {
            value.as_text().is_some_and(|text| text.parse::<V>().is_ok())
        })
    }

    /// Every rule must accept the value
    #[must_use]
    pub fn all_of(rules: Vec<Validator>) -> Validator {
        Arc::new(move |value: &CellValue, ctx: &ValidationContext<'_>| {
            rules.iter().all(|rule| rule(value, ctx))
        })
    }
}
