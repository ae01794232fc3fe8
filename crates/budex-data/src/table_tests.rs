//! Tests for in-memory tables

use crate::{DataColumn, DataTable, RowState, caption_for};
use budex_core::{ColumnKind, Value};
use pretty_assertions::assert_eq;
use rstest::rstest;

#[rstest]
#[case("ID", "ID")]
#[case("Code", "CODE")]
#[case("ProgramAreaCode", "Program Area Code")]
#[case("FiscalYear", "Fiscal Year")]
#[case("Amount", "Amount")]
#[case("FundBOC", "Fund BOC")]
#[case("BOCCode", "BOC Code")]
#[case("fund_code", "Fund Code")]
#[case("Fiscal Year", "Fiscal Year")]
fn test_caption_for(#[case] name: &str, #[case] expected: &str) {
    assert_eq!(caption_for(name), expected);
}

fn accounts() -> DataTable {
    let mut table = DataTable::new("Accounts");
    table.add_column(DataColumn::new("Code", "TEXT", ColumnKind::String));
    table.add_column(DataColumn::new("Name", "TEXT", ColumnKind::String));
    table.push_row(vec!["6100".into(), "Payroll".into()], RowState::Added);
    table.push_row(vec!["6200".into()], RowState::Added);
    table
}

#[test]
fn test_captions_are_stable_across_refreshes() {
    let mut table = DataTable::new("Accounts");
    table.add_column(DataColumn::new("ID", "INTEGER", ColumnKind::Integer));
    table.add_column(DataColumn::new("ProgramAreaCode", "TEXT", ColumnKind::String));

    let first: Vec<String> = table.columns().iter().map(|c| c.caption.clone()).collect();
    table.refresh_captions();
    table.refresh_captions();
    let second: Vec<String> = table.columns().iter().map(|c| c.caption.clone()).collect();

    assert_eq!(first, vec!["ID", "Program Area Code"]);
    assert_eq!(first, second);
}

#[test]
fn test_rows_pad_and_follow_new_columns() {
    let mut table = accounts();
    assert_eq!(table.row(1).unwrap().get_by_name("Name"), Some(&Value::Null));

    let ordinal = table.add_column(DataColumn::new("Amount", "REAL", ColumnKind::Real));
    assert_eq!(ordinal, 2);
    assert_eq!(table.column("amount").unwrap().ordinal, 2);

    let row = table.row(0).unwrap();
    assert_eq!(row.columns(), &["Code", "Name", "Amount"]);
    assert_eq!(row.get_by_name("Amount"), Some(&Value::Null));
    assert_eq!(row.text("code"), Some("6100".to_string()));
    assert_eq!(
        row.to_map().keys().cloned().collect::<Vec<_>>(),
        vec!["Code", "Name", "Amount"]
    );
}

#[test]
fn test_primary_key_lookup() {
    let mut table = accounts();
    assert!(!table.set_primary_key(vec!["Missing".into()]));
    assert!(table.primary_key().is_empty());
    assert_eq!(table.find_by_key(&["6100".into(), "x".into()]), None);

    assert!(table.set_primary_key(vec!["Code".into()]));
    assert_eq!(table.primary_key_ordinals(), vec![0]);
    assert_eq!(table.find_by_key(&["6200".into(), Value::Null]), Some(1));
    assert_eq!(table.find_by_key(&["6300".into(), Value::Null]), None);

    table.replace_row(1, vec!["6200".into(), "Travel".into()], RowState::Unchanged);
    assert_eq!(table.row(1).unwrap().text("Name"), Some("Travel".to_string()));
    assert_eq!(table.row(1).unwrap().state(), RowState::Unchanged);

    table.accept_changes();
    assert!(table.rows().iter().all(|r| r.state() == RowState::Unchanged));
}

#[test]
fn test_key_index_follows_replacements() {
    let mut table = accounts();
    table.push_row(vec![Value::from("6200"), Value::from("Duplicate")], RowState::Added);
    assert!(table.set_primary_key(vec!["Code".into()]));

    // The first holder of a repeated key wins
    assert_eq!(table.find_by_key(&[Value::from("6200")]), Some(1));

    table.replace_row(1, vec!["6900".into(), "Moved".into()], RowState::Added);
    assert_eq!(table.find_by_key(&[Value::from("6900")]), Some(1));
    assert_eq!(table.find_by_key(&[Value::from("6200")]), Some(2));

    table.clear();
    assert_eq!(table.find_by_key(&[Value::from("6100")]), None);
    table.push_row(vec!["6100".into()], RowState::Added);
    assert_eq!(table.find_by_key(&[Value::from("6100")]), Some(0));
}

#[test]
fn test_keyed_fill_scales_linearly() {
    let mut table = DataTable::new("Obligations");
    table.add_column(DataColumn::new("ID", "INTEGER", ColumnKind::Integer));
    table.add_column(DataColumn::new("Amount", "REAL", ColumnKind::Real));
    assert!(table.set_primary_key(vec!["ID".into()]));

    // Same loop shape as a keyed adapter fill, twice over the same keys
    for _ in 0..2 {
        for id in 0..50_000i64 {
            let values = vec![Value::Int64(id), Value::Float64(id as f64)];
            match table.find_by_key(&values) {
                Some(existing) => table.replace_row(existing, values, RowState::Unchanged),
                None => table.push_row(values, RowState::Unchanged),
            }
        }
    }
    assert_eq!(table.row_count(), 50_000);
    assert_eq!(table.find_by_key(&[Value::Int64(49_999)]), Some(49_999));
    assert_eq!(table.find_by_key(&[Value::Float64(1.0)]), None);
}
