//! Terminal and JSON rendering of filled tables

use budex_data::{DataRow, DataTable, Value};
use clap::ValueEnum;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use indexmap::{IndexMap, IndexSet};

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Table,
    Json,
}

/// Render up to `limit` rows with column captions as headers
pub fn render_table(table: &DataTable, limit: Option<usize>) -> Table {
    let mut out = Table::new();
    out.load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            table
                .columns()
                .iter()
                .map(|c| c.caption.clone())
                .collect::<Vec<_>>(),
        );

    for row in table.rows().iter().take(limit.unwrap_or(usize::MAX)) {
        out.add_row(row.values().iter().map(cell_text).collect::<Vec<_>>());
    }
    out
}

/// Rows as an array of objects keyed by column name, in column order
pub fn rows_to_json(rows: &[DataRow], limit: Option<usize>) -> serde_json::Value {
    serde_json::Value::Array(
        rows.iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|row| {
                let object: serde_json::Map<String, serde_json::Value> = row
                    .to_map()
                    .into_iter()
                    .map(|(name, value)| (name, json_value(&value)))
                    .collect();
                serde_json::Value::Object(object)
            })
            .collect(),
    )
}

/// Program elements as `{ column: [values...] }`
pub fn elements_to_json(elements: &IndexMap<String, IndexSet<String>>) -> serde_json::Value {
    let object: serde_json::Map<String, serde_json::Value> = elements
        .iter()
        .map(|(name, values)| {
            let values = values.iter().cloned().map(serde_json::Value::String).collect();
            (name.clone(), serde_json::Value::Array(values))
        })
        .collect();
    serde_json::Value::Object(object)
}

/// Program elements, one line per column
pub fn render_elements(elements: &IndexMap<String, IndexSet<String>>) -> Table {
    let mut out = Table::new();
    out.load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Column", "Count", "Values"]);
    for (name, values) in elements {
        let joined = values.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
        out.add_row(vec![name.clone(), values.len().to_string(), joined]);
    }
    out
}

/// Plain table with fixed headers
pub fn render_listing(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut out = Table::new();
    out.load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.to_vec());
    for row in rows {
        out.add_row(row);
    }
    out
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn json_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(v) => serde_json::Value::Bool(*v),
        Value::Int16(v) => (*v).into(),
        Value::Int32(v) => (*v).into(),
        Value::Int64(v) => (*v).into(),
        Value::Float32(v) => serde_json::Number::from_f64(f64::from(*v))
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Float64(v) => serde_json::Number::from_f64(*v)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        other => serde_json::Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use budex_data::{ColumnKind, DataColumn, RowState};
    use pretty_assertions::assert_eq;

    fn accounts() -> DataTable {
        let mut table = DataTable::new("Accounts");
        table.add_column(DataColumn::new("Code", "TEXT", ColumnKind::String));
        table.add_column(DataColumn::new("ProgramAreaCode", "TEXT", ColumnKind::String));
        table.add_column(DataColumn::new("Amount", "REAL", ColumnKind::Real));
        table.push_row(
            vec![Value::from("6100"), Value::Null, Value::Float64(1500.5)],
            RowState::Unchanged,
        );
        table.push_row(
            vec![Value::from("6200"), Value::from("OA"), Value::Float64(20.0)],
            RowState::Unchanged,
        );
        table
    }

    #[test]
    fn table_headers_use_captions() {
        let rendered = render_table(&accounts(), None).to_string();
        assert!(rendered.contains("Program Area Code"));
        assert!(rendered.contains("CODE"));
        assert!(rendered.contains("1500.5"));
        assert!(!rendered.contains("NULL"));
    }

    #[test]
    fn limit_caps_the_rows() {
        let rendered = render_table(&accounts(), Some(1)).to_string();
        assert!(rendered.contains("6100"));
        assert!(!rendered.contains("6200"));
    }

    #[test]
    fn json_keeps_column_order_and_types() {
        let table = accounts();
        let json = rows_to_json(table.rows(), None);
        assert_eq!(
            json[0],
            serde_json::json!({"Code": "6100", "ProgramAreaCode": null, "Amount": 1500.5})
        );
        let keys: Vec<&String> = json[1].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["Code", "ProgramAreaCode", "Amount"]);
    }

    #[test]
    fn elements_render_as_lists() {
        let mut elements = IndexMap::new();
        elements.insert(
            "FundCode".to_string(),
            IndexSet::from(["B".to_string(), "F".to_string()]),
        );
        assert_eq!(
            elements_to_json(&elements),
            serde_json::json!({"FundCode": ["B", "F"]})
        );
        assert!(render_elements(&elements).to_string().contains("B, F"));
    }
}
