//! Tests for the SQLite connection

use crate::{SqliteConnection, SqliteDriver};
use budex_core::{
    BudexError, ColumnKind, Connection, ConnectionConfig, DatabaseDriver, Provider, Value,
};

async fn accounts_db() -> SqliteConnection {
    let conn = SqliteConnection::open_in_memory().expect("Failed to open in-memory db");
    conn.execute_batch(
        "CREATE TABLE Accounts (Code TEXT PRIMARY KEY, Name VARCHAR(80), Amount REAL);
         INSERT INTO Accounts VALUES ('6100', 'Payroll', 1200.5);
         INSERT INTO Accounts VALUES ('6200', 'Travel', 300.0);",
    )
    .expect("Failed to seed");
    conn
}

#[tokio::test]
async fn test_query_with_bound_parameters() {
    let conn = accounts_db().await;
    let result = conn
        .query(
            "SELECT * FROM \"Accounts\" WHERE \"Code\" = ?",
            &[Value::from("6100")],
        )
        .await
        .unwrap();

    assert_eq!(result.row_count(), 1);
    assert_eq!(result.column_names(), vec!["Code", "Name", "Amount"]);
    assert_eq!(result.rows[0].get_by_name("Name"), Some(&Value::from("Payroll")));
    assert_eq!(result.columns[1].kind(), ColumnKind::String);
    assert_eq!(result.columns[2].kind(), ColumnKind::Real);
}

#[tokio::test]
async fn test_empty_result_keeps_columns() {
    let conn = accounts_db().await;
    let result = conn
        .query("SELECT * FROM Accounts WHERE Code = ?", &[Value::from("0000")])
        .await
        .unwrap();
    assert!(!result.has_rows());
    assert_eq!(result.column_count(), 3);
}

#[tokio::test]
async fn test_missing_table_is_query_error() {
    let conn = accounts_db().await;
    let err = conn.query("SELECT * FROM Nope", &[]).await.unwrap_err();
    assert!(matches!(err, BudexError::Query(_)));
}

#[tokio::test]
async fn test_execute_reports_affected_rows() {
    let conn = accounts_db().await;
    let result = conn
        .execute("DELETE FROM Accounts WHERE Amount < ?", &[Value::Float64(1000.0)])
        .await
        .unwrap();
    assert_eq!(result.affected_rows, 1);
}

#[tokio::test]
async fn test_close_is_idempotent_and_final() {
    let conn = accounts_db().await;
    assert!(!conn.is_closed());
    conn.close().await.unwrap();
    conn.close().await.unwrap();
    assert!(conn.is_closed());

    let err = conn.query("SELECT 1", &[]).await.unwrap_err();
    assert!(matches!(err, BudexError::InvalidState(_)));
}

#[tokio::test]
async fn test_primary_key_introspection() {
    let conn = accounts_db().await;
    let schema = conn.as_schema_introspection().unwrap();

    let pk = schema.get_primary_key("Accounts").await.unwrap().unwrap();
    assert_eq!(pk.columns, vec!["Code".to_string()]);

    conn.execute_batch("CREATE TABLE Notes (Body TEXT)").unwrap();
    assert!(schema.get_primary_key("Notes").await.unwrap().is_none());

    let tables = schema.list_tables().await.unwrap();
    let names: Vec<_> = tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Accounts", "Notes"]);
}

#[tokio::test]
async fn test_load_rows_in_one_transaction() {
    let conn = SqliteConnection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE Funds (Code TEXT, Title TEXT)").unwrap();
    let loaded = conn
        .load_rows(
            "Funds",
            &["Code".to_string(), "Title".to_string()],
            &[
                vec![Value::from("0100"), Value::from("General")],
                vec![Value::from("0200"), Value::Null],
            ],
        )
        .unwrap();
    assert_eq!(loaded, 2);

    let result = conn.query("SELECT COUNT(*) FROM Funds", &[]).await.unwrap();
    assert_eq!(result.rows[0].get(0).and_then(|v| v.as_i64()), Some(2));
}

#[tokio::test]
async fn test_driver_requires_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let driver = SqliteDriver::new();

    let missing = dir.path().join("Data.db");
    let config = ConnectionConfig::new(
        Provider::Sqlite,
        format!("Data Source={};Version=3;", missing.display()),
    );
    assert!(matches!(
        driver.connect(&config).await,
        Err(BudexError::Connection(_))
    ));

    let created = SqliteConnection::open_or_create(&missing).unwrap();
    created.execute_batch("CREATE TABLE Accounts (Code TEXT)").unwrap();
    created.close().await.unwrap();
    driver.test_connection(&config).await.unwrap();
}

#[tokio::test]
async fn test_driver_requires_data_source() {
    let driver = SqliteDriver::new();
    let config = ConnectionConfig::new(Provider::Sqlite, "Version=3;");
    assert!(matches!(
        driver.connect(&config).await,
        Err(BudexError::Configuration(_))
    ));
}

#[tokio::test]
async fn test_unknown_quoted_column_is_an_error() {
    let conn = accounts_db().await;
    // Bound to its own name, a string-literal fallback would match every row
    let err = conn
        .query(
            "SELECT * FROM \"Accounts\" WHERE \"NoSuchColumn\" = ?",
            &[Value::from("NoSuchColumn")],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BudexError::Query(ref msg) if msg.contains("no such column")));
}
