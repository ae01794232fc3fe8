//! Shared fixtures for the pipeline tests

#![allow(dead_code)]

use budex_data::{CollectingSink, DataConfig, DataContext, FilterArgs, Value};
use budex_drivers::sqlite::SqliteConnection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A data directory with a SQLite store and a context observing errors
pub struct Fixture {
    pub dir: TempDir,
    pub sink: Arc<CollectingSink>,
    pub ctx: DataContext,
}

impl Fixture {
    pub fn data_dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.dir.path().join("sqlite").join("Data.db")
    }

    /// Write `content` to `csv/<name>.csv`
    pub fn write_csv(&self, name: &str, content: &str) -> PathBuf {
        let dir = self.dir.path().join("csv");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{}.csv", name));
        std::fs::write(&path, content).unwrap();
        path
    }
}

/// Fixture whose SQLite store holds the tables created by `schema`
pub fn fixture_with(schema: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let sqlite_dir = dir.path().join("sqlite");
    std::fs::create_dir_all(&sqlite_dir).unwrap();

    let conn = SqliteConnection::open_or_create(&sqlite_dir.join("Data.db")).unwrap();
    conn.execute_batch(schema).unwrap();
    drop(conn);

    let sink = Arc::new(CollectingSink::new());
    let ctx = DataContext::new(DataConfig::with_data_dir(dir.path())).with_sink(sink.clone());
    Fixture { dir, sink, ctx }
}

pub const BUDGET_SCHEMA: &str = r#"
CREATE TABLE Accounts (
    Code TEXT PRIMARY KEY,
    Name TEXT NOT NULL,
    ProgramAreaCode TEXT,
    Amount REAL
);
INSERT INTO Accounts VALUES ('6100', 'Payroll', 'OA', 1500.0);

CREATE TABLE Obligations (
    ID INTEGER PRIMARY KEY,
    FundCode TEXT NOT NULL,
    BOC TEXT,
    FiscalYear INTEGER NOT NULL,
    Amount REAL NOT NULL
);
INSERT INTO Obligations VALUES (1, 'B', '10', 2024, 100.0);
INSERT INTO Obligations VALUES (2, 'B', '21', 2024, 50.0);
INSERT INTO Obligations VALUES (3, 'F', '10', 2024, 25.0);
INSERT INTO Obligations VALUES (4, 'F', '', 2025, 10.0);
INSERT INTO Obligations VALUES (5, 'B', NULL, 2025, 5.0);
"#;

/// Fixture with the budget tables
pub fn budget_fixture() -> Fixture {
    fixture_with(BUDGET_SCHEMA)
}

pub fn args(pairs: &[(&str, &str)]) -> FilterArgs {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::from(*v)))
        .collect()
}
