//! MS SQL Server connection implementation using tiberius

use async_trait::async_trait;
use budex_core::{
    BudexError, ColumnMeta, Connection, QueryResult, Result, Row, SchemaIntrospection,
    StatementResult, Value,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::sync::atomic::{AtomicBool, Ordering};
use tiberius::{Client, ColumnData, Config, Row as TiberiusRow};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

/// MS SQL Server connection errors
#[derive(Debug, thiserror::Error)]
pub enum MssqlConnectionError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),

    #[error("Type conversion error: {0}")]
    TypeConversion(String),

    #[error("Connection is closed")]
    ConnectionClosed,

    #[error("Tiberius error: {0}")]
    Tiberius(#[from] tiberius::error::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MssqlConnectionError> for BudexError {
    fn from(err: MssqlConnectionError) -> Self {
        match err {
            MssqlConnectionError::InvalidConnectionString(_) => {
                BudexError::Configuration(err.to_string())
            }
            MssqlConnectionError::ConnectionClosed => BudexError::InvalidState(err.to_string()),
            MssqlConnectionError::ConnectionFailed(_) | MssqlConnectionError::Io(_) => {
                BudexError::Connection(err.to_string())
            }
            MssqlConnectionError::TypeConversion(_) | MssqlConnectionError::Tiberius(_) => {
                BudexError::Driver(err.to_string())
            }
        }
    }
}

type MssqlClient = Client<Compat<TcpStream>>;

/// MS SQL Server connection using tiberius
pub struct MssqlConnection {
    client: Mutex<Option<MssqlClient>>,
    closed: AtomicBool,
    server: String,
}

impl MssqlConnection {
    /// Connect using an ADO.NET connection string
    #[tracing::instrument(skip(connection_string))]
    pub async fn connect(
        connection_string: &str,
    ) -> std::result::Result<Self, MssqlConnectionError> {
        let config = Config::from_ado_string(connection_string)
            .map_err(|e| MssqlConnectionError::InvalidConnectionString(e.to_string()))?;
        let server = config.get_addr();
        tracing::debug!(server = %server, "connecting to MS SQL Server");

        let tcp = TcpStream::connect(server.as_str())
            .await
            .map_err(|e| MssqlConnectionError::ConnectionFailed(e.to_string()))?;
        tcp.set_nodelay(true)?;

        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| MssqlConnectionError::ConnectionFailed(e.to_string()))?;

        tracing::debug!("successfully connected to MS SQL Server");
        Ok(Self {
            client: Mutex::new(Some(client)),
            closed: AtomicBool::new(false),
            server,
        })
    }

    fn ensure_not_closed(&self) -> std::result::Result<(), MssqlConnectionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(MssqlConnectionError::ConnectionClosed);
        }
        Ok(())
    }

    async fn run_query(&self, sql: &str, params: &[Value], lenient: bool) -> Result<QueryResult> {
        self.ensure_not_closed()?;
        let start = std::time::Instant::now();

        let mut guard = self.client.lock().await;
        let client = guard
            .as_mut()
            .ok_or(MssqlConnectionError::ConnectionClosed)?;

        let tiberius_params = values_to_tiberius_params(params)?;
        let param_refs: Vec<&dyn tiberius::ToSql> = tiberius_params
            .iter()
            .map(|p| p as &dyn tiberius::ToSql)
            .collect();

        let mut stream = client.query(sql, &param_refs[..]).await.map_err(|e| {
            tracing::error!(error = %e, "query failed");
            BudexError::Query(e.to_string())
        })?;

        // Column metadata arrives before the first row, so empty results still have columns
        let columns: Vec<ColumnMeta> = stream
            .columns()
            .await
            .map_err(|e| BudexError::Query(e.to_string()))?
            .map(|cols| {
                cols.iter()
                    .enumerate()
                    .map(|(idx, col)| tiberius_column_to_meta(col, idx))
                    .collect()
            })
            .unwrap_or_default();

        let tib_rows = stream
            .into_first_result()
            .await
            .map_err(|e| BudexError::Query(e.to_string()))?;

        let column_names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
        let mut rows: Vec<Row> = Vec::with_capacity(tib_rows.len());
        let mut warnings = Vec::new();
        for (index, tib_row) in tib_rows.into_iter().enumerate() {
            match tiberius_row_to_values(tib_row) {
                Ok(values) => rows.push(Row::new(column_names.clone(), values)),
                Err(e) if lenient => {
                    tracing::warn!(row = index, error = %e, "skipping unreadable row");
                    warnings.push(format!("row {}: {}", index, e));
                }
                Err(e) => return Err(e),
            }
        }

        let execution_time_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            row_count = rows.len(),
            duration_ms = execution_time_ms,
            "query completed"
        );

        Ok(QueryResult {
            columns,
            rows,
            affected_rows: 0,
            execution_time_ms,
            warnings,
        })
    }
}

#[async_trait]
impl Connection for MssqlConnection {
    fn driver_name(&self) -> &str {
        "mssql"
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        self.ensure_not_closed()?;
        let start = std::time::Instant::now();

        let mut guard = self.client.lock().await;
        let client = guard
            .as_mut()
            .ok_or(MssqlConnectionError::ConnectionClosed)?;

        let tiberius_params = values_to_tiberius_params(params)?;
        let param_refs: Vec<&dyn tiberius::ToSql> = tiberius_params
            .iter()
            .map(|p| p as &dyn tiberius::ToSql)
            .collect();

        match client.execute(sql, &param_refs[..]).await {
            Ok(exec_result) => {
                let affected_rows = exec_result.rows_affected().iter().sum::<u64>();
                tracing::debug!(
                    affected_rows = affected_rows,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "execute completed"
                );
                Ok(StatementResult { affected_rows })
            }
            Err(e) => {
                tracing::error!(error = %e, "execute failed");
                Err(BudexError::Query(e.to_string()))
            }
        }
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.run_query(sql, params, false).await
    }

    async fn query_lenient(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.run_query(sql, params, true).await
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let client = self.client.lock().await.take();
        if let Some(client) = client {
            client
                .close()
                .await
                .map_err(|e| BudexError::Connection(e.to_string()))?;
        }
        tracing::debug!(server = %self.server, "MS SQL Server connection closed");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn as_schema_introspection(&self) -> Option<&dyn SchemaIntrospection> {
        Some(self)
    }
}

/// Convert a tiberius column to ColumnMeta
fn tiberius_column_to_meta(col: &tiberius::Column, ordinal: usize) -> ColumnMeta {
    ColumnMeta::new(col.name(), format!("{:?}", col.column_type()), ordinal)
}

/// Convert a tiberius row to a vector of Values by consuming the row
fn tiberius_row_to_values(row: TiberiusRow) -> Result<Vec<Value>> {
    row.into_iter().map(column_data_to_value).collect()
}

fn base_date(year: i32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(|| {
        BudexError::from(MssqlConnectionError::TypeConversion(format!(
            "invalid base year {}",
            year
        )))
    })
}

fn time_from_increments(increments: u64) -> NaiveTime {
    NaiveTime::from_num_seconds_from_midnight_opt(
        (increments / 10_000_000) as u32,
        ((increments % 10_000_000) * 100) as u32,
    )
    .unwrap_or_default()
}

/// Convert tiberius ColumnData to a budex Value
pub(crate) fn column_data_to_value(col_data: ColumnData<'static>) -> Result<Value> {
    match col_data {
        ColumnData::Bit(None) => Ok(Value::Null),
        ColumnData::Bit(Some(v)) => Ok(Value::Bool(v)),
        ColumnData::U8(None) => Ok(Value::Null),
        ColumnData::U8(Some(v)) => Ok(Value::Int32(v as i32)),
        ColumnData::I16(None) => Ok(Value::Null),
        ColumnData::I16(Some(v)) => Ok(Value::Int16(v)),
        ColumnData::I32(None) => Ok(Value::Null),
        ColumnData::I32(Some(v)) => Ok(Value::Int32(v)),
        ColumnData::I64(None) => Ok(Value::Null),
        ColumnData::I64(Some(v)) => Ok(Value::Int64(v)),
        ColumnData::F32(None) => Ok(Value::Null),
        ColumnData::F32(Some(v)) => Ok(Value::Float32(v)),
        ColumnData::F64(None) => Ok(Value::Null),
        ColumnData::F64(Some(v)) => Ok(Value::Float64(v)),
        ColumnData::String(None) => Ok(Value::Null),
        ColumnData::String(Some(v)) => Ok(Value::String(v.into_owned())),
        ColumnData::Guid(None) => Ok(Value::Null),
        ColumnData::Guid(Some(v)) => Ok(Value::Uuid(v)),
        ColumnData::Binary(None) => Ok(Value::Null),
        ColumnData::Binary(Some(v)) => Ok(Value::Bytes(v.into_owned())),
        ColumnData::Numeric(None) => Ok(Value::Null),
        ColumnData::Numeric(Some(v)) => Ok(Value::Decimal(v.to_string())),
        ColumnData::DateTime(None) => Ok(Value::Null),
        ColumnData::DateTime(Some(v)) => {
            // 1/300 second ticks since 1900-01-01
            let dt = NaiveDateTime::new(
                base_date(1900)? + chrono::Duration::days(v.days() as i64),
                NaiveTime::from_num_seconds_from_midnight_opt(
                    (v.seconds_fragments() as f64 / 300.0) as u32,
                    0,
                )
                .unwrap_or_default(),
            );
            Ok(Value::DateTime(dt))
        }
        ColumnData::SmallDateTime(None) => Ok(Value::Null),
        ColumnData::SmallDateTime(Some(v)) => {
            let dt = NaiveDateTime::new(
                base_date(1900)? + chrono::Duration::days(v.days() as i64),
                NaiveTime::from_num_seconds_from_midnight_opt(
                    (v.seconds_fragments() as u32) * 60,
                    0,
                )
                .unwrap_or_default(),
            );
            Ok(Value::DateTime(dt))
        }
        ColumnData::DateTime2(None) => Ok(Value::Null),
        ColumnData::DateTime2(Some(v)) => {
            let dt = NaiveDateTime::new(
                base_date(1)? + chrono::Duration::days(v.date().days() as i64),
                time_from_increments(v.time().increments()),
            );
            Ok(Value::DateTime(dt))
        }
        ColumnData::DateTimeOffset(None) => Ok(Value::Null),
        ColumnData::DateTimeOffset(Some(v)) => {
            let dt2 = v.datetime2();
            let naive = NaiveDateTime::new(
                base_date(1)? + chrono::Duration::days(dt2.date().days() as i64),
                time_from_increments(dt2.time().increments()),
            );
            let utc =
                chrono::DateTime::<chrono::Utc>::from_naive_utc_and_offset(naive, chrono::Utc);
            Ok(Value::DateTimeUtc(utc))
        }
        ColumnData::Date(None) => Ok(Value::Null),
        ColumnData::Date(Some(v)) => Ok(Value::Date(
            base_date(1)? + chrono::Duration::days(v.days() as i64),
        )),
        ColumnData::Time(None) => Ok(Value::Null),
        ColumnData::Time(Some(v)) => Ok(Value::Time(time_from_increments(v.increments()))),
        ColumnData::Xml(None) => Ok(Value::Null),
        ColumnData::Xml(Some(v)) => Ok(Value::String(v.into_owned().into_string())),
    }
}

/// Container for tiberius parameter values
#[derive(Debug)]
pub(crate) enum TiberiusParam {
    Null,
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    Uuid(uuid::Uuid),
}

impl tiberius::ToSql for TiberiusParam {
    fn to_sql(&self) -> ColumnData<'_> {
        match self {
            TiberiusParam::Null => ColumnData::I32(None),
            TiberiusParam::Bool(v) => ColumnData::Bit(Some(*v)),
            TiberiusParam::I16(v) => ColumnData::I16(Some(*v)),
            TiberiusParam::I32(v) => ColumnData::I32(Some(*v)),
            TiberiusParam::I64(v) => ColumnData::I64(Some(*v)),
            TiberiusParam::F32(v) => ColumnData::F32(Some(*v)),
            TiberiusParam::F64(v) => ColumnData::F64(Some(*v)),
            TiberiusParam::String(v) => {
                ColumnData::String(Some(std::borrow::Cow::Borrowed(v.as_str())))
            }
            TiberiusParam::Bytes(v) => {
                ColumnData::Binary(Some(std::borrow::Cow::Borrowed(v.as_slice())))
            }
            TiberiusParam::Uuid(v) => ColumnData::Guid(Some(*v)),
        }
    }
}

/// Convert budex Values to tiberius parameters
pub(crate) fn values_to_tiberius_params(values: &[Value]) -> Result<Vec<TiberiusParam>> {
    Ok(values
        .iter()
        .map(|v| match v {
            Value::Null => TiberiusParam::Null,
            Value::Bool(b) => TiberiusParam::Bool(*b),
            Value::Int16(i) => TiberiusParam::I16(*i),
            Value::Int32(i) => TiberiusParam::I32(*i),
            Value::Int64(i) => TiberiusParam::I64(*i),
            Value::Float32(f) => TiberiusParam::F32(*f),
            Value::Float64(f) => TiberiusParam::F64(*f),
            Value::Decimal(d) => TiberiusParam::String(d.clone()),
            Value::String(s) => TiberiusParam::String(s.clone()),
            Value::Bytes(b) => TiberiusParam::Bytes(b.clone()),
            Value::Uuid(u) => TiberiusParam::Uuid(*u),
            Value::Date(d) => TiberiusParam::String(d.to_string()),
            Value::Time(t) => TiberiusParam::String(t.to_string()),
            Value::DateTime(dt) => TiberiusParam::String(dt.to_string()),
            Value::DateTimeUtc(dt) => TiberiusParam::String(dt.to_rfc3339()),
        })
        .collect())
}

impl std::fmt::Debug for MssqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MssqlConnection")
            .field("server", &self.server)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}
