//! Tests for flat-file staging and the file driver

use crate::staging::{infer_text_kind, normalize_headers, stage_csv};
use crate::FileDriver;
use budex_core::{BudexError, ColumnKind, Connection, ConnectionConfig, DatabaseDriver, Provider, Value};
use pretty_assertions::assert_eq;
use std::path::Path;

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_infer_text_kind() {
    assert_eq!(infer_text_kind(["1", "22", ""].into_iter()), ColumnKind::Integer);
    assert_eq!(infer_text_kind(["1", "2.5"].into_iter()), ColumnKind::Real);
    assert_eq!(infer_text_kind(["1", "abc"].into_iter()), ColumnKind::String);
    // Budget codes keep their leading zeros
    assert_eq!(infer_text_kind(["0100", "0200"].into_iter()), ColumnKind::String);
    assert_eq!(infer_text_kind(["0.5", "0"].into_iter()), ColumnKind::Real);
    assert_eq!(infer_text_kind(std::iter::empty()), ColumnKind::String);
}

#[test]
fn test_normalize_headers() {
    let names = normalize_headers(["Code", "", "code", "Name"].into_iter());
    assert_eq!(names, vec!["Code", "Column2", "code_2", "Name"]);
}

#[test]
fn test_stage_csv_skips_malformed_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "Accounts.csv",
        "Code,Name,Amount\n0100,Payroll,10.5\n0200,Travel\n0300,Supplies,7\n",
    );

    let staged = stage_csv(&path).unwrap();
    assert_eq!(staged.column_names(), vec!["Code", "Name", "Amount"]);
    assert_eq!(staged.columns[0].kind, ColumnKind::String);
    assert_eq!(staged.columns[2].kind, ColumnKind::Real);
    assert_eq!(staged.rows.len(), 2);
    assert_eq!(staged.warnings.len(), 1);
    assert!(staged.warnings[0].starts_with("line 3"));
    assert_eq!(staged.rows[1][2], Value::Float64(7.0));
}

#[test]
fn test_stage_missing_file() {
    let err = stage_csv(Path::new("/nonexistent/Accounts.csv")).unwrap_err();
    assert!(matches!(BudexError::from(err), BudexError::NotFound(_)));
}

#[tokio::test]
async fn test_csv_connection_answers_sql() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "Divisions.csv",
        "Code,Name\nA1,Region 1\nB2,Region 2\nbad\n",
    );

    let config = ConnectionConfig::new(
        Provider::Csv,
        format!(
            "Provider=Microsoft.ACE.OLEDB.12.0;Data Source={};Extended Properties=\"text;HDR=YES;FMT=Delimited\";",
            dir.path().display()
        ),
    )
    .with_table("Divisions");

    let conn = FileDriver::new().connect(&config).await.unwrap();
    let result = conn
        .query(
            "SELECT * FROM \"Divisions\" WHERE \"Code\" = ?",
            &[Value::from("B2")],
        )
        .await
        .unwrap();
    assert_eq!(result.row_count(), 1);
    assert_eq!(result.rows[0].get_by_name("Name"), Some(&Value::from("Region 2")));
    assert_eq!(result.columns[0].kind(), ColumnKind::String);

    let lenient = conn.query_lenient("SELECT * FROM \"Divisions\"", &[]).await.unwrap();
    assert_eq!(lenient.row_count(), 2);
    assert_eq!(lenient.warnings.len(), 1);

    let err = conn
        .execute("DELETE FROM \"Divisions\"", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, BudexError::NotSupported(_)));

    let schema = conn.as_schema_introspection().unwrap();
    assert!(schema.get_primary_key("Divisions").await.unwrap().is_none());
}

#[tokio::test]
async fn test_access_is_not_supported() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "Data.accdb", "");
    let config = ConnectionConfig::new(
        Provider::Access,
        format!("Provider=Microsoft.ACE.OLEDB.12.0;Data Source={};", path.display()),
    )
    .with_table("Accounts");

    let err = FileDriver::new().connect(&config).await.err().unwrap();
    assert!(matches!(err, BudexError::NotSupported(_)));
}

#[tokio::test]
async fn test_other_engines_are_rejected() {
    let config = ConnectionConfig::new(Provider::Sqlite, "Data Source=:memory:;");
    let err = FileDriver::new().connect(&config).await.err().unwrap();
    assert!(matches!(err, BudexError::Configuration(_)));
}
