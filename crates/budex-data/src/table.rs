//! In-memory tables filled by adapters

use budex_core::{ColumnKind, ColumnMeta, Row, Value};
use convert_case::{Boundary, split};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use strum::Display;

/// Display caption for a column name.
///
/// Short names (under five characters) are upper-cased; longer ones are
/// split at word boundaries with each word's letters kept, so
/// `ProgramAreaCode` reads `Program Area Code` and `FundBOC` reads `Fund BOC`.
pub fn caption_for(name: &str) -> String {
    if name.chars().count() < 5 {
        return name.to_uppercase();
    }
    split(&name, &CAPTION_BOUNDARIES)
        .into_iter()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

const CAPTION_BOUNDARIES: [Boundary; 7] = [
    Boundary::UNDERSCORE,
    Boundary::HYPHEN,
    Boundary::SPACE,
    Boundary::LOWER_UPPER,
    Boundary::ACRONYM,
    Boundary::LOWER_DIGIT,
    Boundary::DIGIT_UPPER,
];

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Change state of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum RowState {
    /// Filled and not yet accepted
    Added,
    /// Matches what the engine returned
    Unchanged,
}

/// A column of a [`DataTable`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataColumn {
    pub name: String,
    /// Display-only; recomputed on every fill
    pub caption: String,
    /// Declared type as reported by the engine
    pub data_type: String,
    pub kind: ColumnKind,
    pub ordinal: usize,
}

impl DataColumn {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, kind: ColumnKind) -> Self {
        let name = name.into();
        Self {
            caption: caption_for(&name),
            name,
            data_type: data_type.into(),
            kind,
            ordinal: 0,
        }
    }

    pub(crate) fn from_meta(name: &str, meta: &ColumnMeta) -> Self {
        Self::new(name, meta.data_type.clone(), meta.kind())
    }
}

/// One row of a [`DataTable`]
#[derive(Debug, Clone, PartialEq)]
pub struct DataRow {
    columns: Arc<[String]>,
    values: Vec<Value>,
    state: RowState,
}

impl DataRow {
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn state(&self) -> RowState {
        self.state
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Value of a column, matched exactly first and then ignoring case
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        column_position(&self.columns, name).and_then(|idx| self.values.get(idx))
    }

    /// Text rendition of a column; `None` for NULL or unknown columns
    pub fn text(&self, name: &str) -> Option<String> {
        self.get_by_name(name).and_then(Value::to_text)
    }

    /// Column → value, in column order
    pub fn to_map(&self) -> IndexMap<String, Value> {
        self.columns
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect()
    }

    pub fn to_row(&self) -> Row {
        Row::new(self.columns.to_vec(), self.values.clone())
    }
}

fn column_position(columns: &[String], name: &str) -> Option<usize> {
    columns
        .iter()
        .position(|c| c == name)
        .or_else(|| columns.iter().position(|c| c.eq_ignore_ascii_case(name)))
}

/// One key column value, hashable. NULL never becomes part of a key.
#[derive(Debug, Clone, PartialEq)]
struct KeyPart(Value);

impl Eq for KeyPart {}

impl Hash for KeyPart {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(&self.0).hash(state);
        match &self.0 {
            Value::Null => {}
            Value::Bool(v) => v.hash(state),
            Value::Int16(v) => v.hash(state),
            Value::Int32(v) => v.hash(state),
            Value::Int64(v) => v.hash(state),
            // 0.0 and -0.0 compare equal
            Value::Float32(v) => (if *v == 0.0 { 0.0f32 } else { *v }).to_bits().hash(state),
            Value::Float64(v) => (if *v == 0.0 { 0.0f64 } else { *v }).to_bits().hash(state),
            Value::Decimal(v) | Value::String(v) => v.hash(state),
            Value::Bytes(v) => v.hash(state),
            Value::Uuid(v) => v.hash(state),
            Value::Date(v) => v.hash(state),
            Value::Time(v) => v.hash(state),
            Value::DateTime(v) => v.hash(state),
            Value::DateTimeUtc(v) => v.hash(state),
        }
    }
}

type RowKey = Vec<KeyPart>;

/// Rows and columns materialized from one table
#[derive(Debug, Clone)]
pub struct DataTable {
    name: String,
    columns: Vec<DataColumn>,
    column_names: Arc<[String]>,
    rows: Vec<DataRow>,
    primary_key: Vec<String>,
    key_ordinals: Vec<usize>,
    // first row holding each complete key
    key_index: HashMap<RowKey, usize>,
}

impl DataTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            column_names: Arc::from(Vec::new()),
            rows: Vec::new(),
            primary_key: Vec::new(),
            key_ordinals: Vec::new(),
            key_index: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[DataColumn] {
        &self.columns
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn column(&self, name: &str) -> Option<&DataColumn> {
        self.column_index(name).map(|idx| &self.columns[idx])
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        column_position(&self.column_names, name)
    }

    pub fn rows(&self) -> &[DataRow] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&DataRow> {
        self.rows.get(index)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Names of the key columns, empty when the table has no key
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    /// Ordinals of the key columns
    pub fn primary_key_ordinals(&self) -> Vec<usize> {
        self.key_ordinals.clone()
    }

    /// Use `columns` as the key. Rejected unless every column exists.
    pub fn set_primary_key(&mut self, columns: Vec<String>) -> bool {
        let ordinals: Option<Vec<usize>> = columns.iter().map(|c| self.column_index(c)).collect();
        match ordinals {
            Some(ordinals) => {
                self.primary_key = columns;
                self.key_ordinals = ordinals;
                self.rebuild_key_index();
                true
            }
            None => false,
        }
    }

    fn row_key(&self, values: &[Value]) -> Option<RowKey> {
        if self.key_ordinals.is_empty() {
            return None;
        }
        self.key_ordinals
            .iter()
            .map(|&idx| match values.get(idx) {
                Some(value) if !value.is_null() => Some(KeyPart(value.clone())),
                _ => None,
            })
            .collect()
    }

    fn rebuild_key_index(&mut self) {
        let mut index = HashMap::with_capacity(self.rows.len());
        for (position, row) in self.rows.iter().enumerate() {
            if let Some(key) = self.row_key(&row.values) {
                index.entry(key).or_insert(position);
            }
        }
        self.key_index = index;
    }

    /// Append a column; existing rows get NULL in it. Returns its ordinal.
    pub fn add_column(&mut self, mut column: DataColumn) -> usize {
        let ordinal = self.columns.len();
        column.ordinal = ordinal;
        self.columns.push(column);
        self.column_names = self.columns.iter().map(|c| c.name.clone()).collect();
        for row in &mut self.rows {
            row.values.push(Value::Null);
            row.columns = self.column_names.clone();
        }
        ordinal
    }

    /// Append a row. Missing trailing values are NULL, extra ones dropped.
    pub fn push_row(&mut self, mut values: Vec<Value>, state: RowState) {
        values.resize(self.columns.len(), Value::Null);
        if let Some(key) = self.row_key(&values) {
            self.key_index.entry(key).or_insert(self.rows.len());
        }
        self.rows.push(DataRow {
            columns: self.column_names.clone(),
            values,
            state,
        });
    }

    /// Index of the row whose key columns equal those in `values`
    pub fn find_by_key(&self, values: &[Value]) -> Option<usize> {
        self.row_key(values)
            .and_then(|key| self.key_index.get(&key).copied())
    }

    /// Replace the values of an existing row
    pub fn replace_row(&mut self, index: usize, mut values: Vec<Value>, state: RowState) {
        values.resize(self.columns.len(), Value::Null);
        let Some(old) = self.rows.get(index).map(|row| self.row_key(&row.values)) else {
            return;
        };
        let new = self.row_key(&values);
        if let Some(row) = self.rows.get_mut(index) {
            row.values = values;
            row.state = state;
        }
        if old != new {
            // Keys may repeat across rows; recompute the first holder of each
            self.rebuild_key_index();
        }
    }

    /// Mark every row as unchanged
    pub fn accept_changes(&mut self) {
        for row in &mut self.rows {
            row.state = RowState::Unchanged;
        }
    }

    /// Recompute every column caption from its name
    pub fn refresh_captions(&mut self) {
        for column in &mut self.columns {
            column.caption = caption_for(&column.name);
        }
    }

    /// Drop all rows, keeping the columns
    pub fn clear(&mut self) {
        self.rows.clear();
        self.key_index.clear();
    }
}
