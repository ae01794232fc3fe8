//! Reading flat files into typed rows

use budex_core::{BudexError, ColumnKind, Value};
use calamine::{Data, Reader, open_workbook_auto};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Errors raised while reading a flat file
#[derive(Debug, thiserror::Error)]
pub enum FileStagingError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel error: {0}")]
    Excel(String),

    #[error("Worksheet '{0}' not found and workbook has no sheets")]
    NoSheet(String),

    #[error("File has no header row: {0}")]
    NoHeader(PathBuf),
}

impl From<FileStagingError> for BudexError {
    fn from(err: FileStagingError) -> Self {
        match err {
            FileStagingError::NotFound(_) => BudexError::NotFound(err.to_string()),
            FileStagingError::NoSheet(_) | FileStagingError::NoHeader(_) => {
                BudexError::Schema(err.to_string())
            }
            FileStagingError::Csv(_) | FileStagingError::Excel(_) => {
                BudexError::Driver(err.to_string())
            }
        }
    }
}

impl From<calamine::Error> for FileStagingError {
    fn from(err: calamine::Error) -> Self {
        FileStagingError::Excel(err.to_string())
    }
}

/// A column of a staged table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedColumn {
    pub name: String,
    pub kind: ColumnKind,
}

impl StagedColumn {
    /// Declared SQLite type used when the table is created
    pub fn declared_type(&self) -> &'static str {
        match self.kind {
            ColumnKind::Integer => "INTEGER",
            ColumnKind::Real => "REAL",
            ColumnKind::Boolean => "BOOLEAN",
            ColumnKind::DateTime => "DATETIME",
            ColumnKind::Binary => "BLOB",
            ColumnKind::String | ColumnKind::Guid | ColumnKind::Unknown => "TEXT",
        }
    }
}

/// Rows read from a flat file, ready to be loaded
#[derive(Debug, Clone, Default)]
pub struct StagedTable {
    pub columns: Vec<StagedColumn>,
    pub rows: Vec<Vec<Value>>,
    /// Records that could not be read and were skipped
    pub warnings: Vec<String>,
}

impl StagedTable {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// `CREATE TABLE` statement for `table`
    pub fn create_sql(&self, table: &str) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| format!("{} {}", quote_identifier(&c.name), c.declared_type()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE {} ({})", quote_identifier(table), columns)
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Make header names usable as column names: blanks get a positional name,
/// duplicates get a numeric suffix.
pub(crate) fn normalize_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    headers
        .enumerate()
        .map(|(idx, raw)| {
            let base = match raw.trim() {
                "" => format!("Column{}", idx + 1),
                name => name.to_string(),
            };
            let mut name = base.clone();
            let mut suffix = 2;
            while !seen.insert(name.to_ascii_lowercase()) {
                name = format!("{}_{}", base, suffix);
                suffix += 1;
            }
            name
        })
        .collect()
}

/// Whether a CSV field reads as an integer without losing information.
///
/// Codes with leading zeros ("0100") stay text.
fn is_integer_text(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    let leading_zero = digits.len() > 1 && digits.starts_with('0');
    !leading_zero && value.parse::<i64>().is_ok()
}

fn is_real_text(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    let leading_zero = digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.");
    !leading_zero && value.parse::<f64>().is_ok_and(f64::is_finite)
}

/// Infer a column kind from its text values; empty fields are ignored
pub(crate) fn infer_text_kind<'a>(values: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut is_int = true;
    let mut is_real = true;
    let mut any = false;

    for value in values.filter(|v| !v.is_empty()) {
        any = true;
        if is_int && !is_integer_text(value) {
            is_int = false;
        }
        if is_real && !is_real_text(value) {
            is_real = false;
        }
        if !is_int && !is_real {
            break;
        }
    }

    match (any, is_int, is_real) {
        (false, _, _) => ColumnKind::String,
        (true, true, _) => ColumnKind::Integer,
        (true, false, true) => ColumnKind::Real,
        (true, false, false) => ColumnKind::String,
    }
}

fn text_to_value(text: &str, kind: ColumnKind) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    match kind {
        ColumnKind::Integer => text
            .parse::<i64>()
            .map(Value::Int64)
            .unwrap_or_else(|_| Value::String(text.to_string())),
        ColumnKind::Real => text
            .parse::<f64>()
            .map(Value::Float64)
            .unwrap_or_else(|_| Value::String(text.to_string())),
        _ => Value::String(text.to_string()),
    }
}

/// Read a CSV file with a header row.
///
/// Records whose field count differs from the header, or that cannot be
/// decoded, are skipped and described in `warnings`.
pub fn stage_csv(path: &Path) -> Result<StagedTable, FileStagingError> {
    if !path.exists() {
        return Err(FileStagingError::NotFound(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(FileStagingError::NoHeader(path.to_path_buf()));
    }
    let names = normalize_headers(headers.iter());

    let mut records: Vec<Vec<String>> = Vec::new();
    let mut warnings = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // Line 1 is the header
        let line = idx + 2;
        match result {
            Ok(record) if record.len() == names.len() => {
                records.push(record.iter().map(str::to_string).collect());
            }
            Ok(record) => {
                tracing::warn!(line, fields = record.len(), expected = names.len(), "skipping malformed CSV record");
                warnings.push(format!(
                    "line {}: expected {} fields, found {}",
                    line,
                    names.len(),
                    record.len()
                ));
            }
            Err(e) => {
                tracing::warn!(line, error = %e, "skipping unreadable CSV record");
                warnings.push(format!("line {}: {}", line, e));
            }
        }
    }

    let columns: Vec<StagedColumn> = names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| StagedColumn {
            name,
            kind: infer_text_kind(records.iter().map(|r| r[idx].as_str())),
        })
        .collect();

    let rows = records
        .iter()
        .map(|record| {
            record
                .iter()
                .zip(&columns)
                .map(|(text, column)| text_to_value(text, column.kind))
                .collect()
        })
        .collect();

    tracing::debug!(path = %path.display(), columns = columns.len(), skipped = warnings.len(), "CSV staged");
    Ok(StagedTable {
        columns,
        rows,
        warnings,
    })
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) if s.is_empty() => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::Int64(*i),
        Data::Float(f) => Value::Float64(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => Value::DateTime(naive),
            None => Value::Float64(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(_) => Value::Null,
    }
}

fn infer_value_kind<'a>(values: impl Iterator<Item = &'a Value>) -> ColumnKind {
    let mut kind: Option<ColumnKind> = None;
    for value in values.filter(|v| !v.is_null()) {
        let current = ColumnKind::from_value(value);
        kind = Some(match (kind, current) {
            (None, k) => k,
            (Some(a), b) if a == b => a,
            (Some(ColumnKind::Integer), ColumnKind::Real)
            | (Some(ColumnKind::Real), ColumnKind::Integer) => ColumnKind::Real,
            _ => return ColumnKind::String,
        });
    }
    kind.unwrap_or(ColumnKind::String)
}

/// Read one worksheet of a workbook. The sheet named `table` is used when it
/// exists, otherwise the first sheet. The first row holds the headers.
pub fn stage_excel(path: &Path, table: &str) -> Result<StagedTable, FileStagingError> {
    if !path.exists() {
        return Err(FileStagingError::NotFound(path.to_path_buf()));
    }

    let mut workbook = open_workbook_auto(path)?;
    let sheet_names = workbook.sheet_names();
    let sheet = sheet_names
        .iter()
        .find(|name| name.eq_ignore_ascii_case(table))
        .or_else(|| sheet_names.first())
        .cloned()
        .ok_or_else(|| FileStagingError::NoSheet(table.to_string()))?;

    let range = workbook.worksheet_range(&sheet)?;
    let mut rows_iter = range.rows();
    let header_cells = rows_iter
        .next()
        .ok_or_else(|| FileStagingError::NoHeader(path.to_path_buf()))?;
    let header_text: Vec<String> = header_cells.iter().map(|c| c.to_string()).collect();
    let names = normalize_headers(header_text.iter().map(String::as_str));

    let mut rows: Vec<Vec<Value>> = Vec::new();
    let mut warnings = Vec::new();
    for (idx, cells) in rows_iter.enumerate() {
        if cells.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        if cells.iter().any(|c| matches!(c, Data::Error(_))) {
            warnings.push(format!("row {}: cell error read as NULL", idx + 2));
        }
        let mut values: Vec<Value> = cells.iter().map(cell_to_value).collect();
        values.resize(names.len(), Value::Null);
        rows.push(values);
    }

    let columns: Vec<StagedColumn> = names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| StagedColumn {
            name,
            kind: infer_value_kind(rows.iter().map(|r| &r[idx])),
        })
        .collect();

    // Mixed columns are stored as text so every value keeps its rendering
    for row in &mut rows {
        for (value, column) in row.iter_mut().zip(&columns) {
            if column.kind == ColumnKind::String && !value.is_null() && value.as_str().is_none() {
                *value = Value::String(value.to_string());
            }
        }
    }

    tracing::debug!(path = %path.display(), sheet = %sheet, columns = columns.len(), "worksheet staged");
    Ok(StagedTable {
        columns,
        rows,
        warnings,
    })
}
