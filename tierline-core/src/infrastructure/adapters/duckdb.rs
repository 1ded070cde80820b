// tierline-core/src/infrastructure/adapters/duckdb.rs

use async_trait::async_trait;
use duckdb::types::Value;
use duckdb::{Config, Connection, params_from_iter};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

// Imports Hexagonaux
use crate::domain::compiler::quote_table;
use crate::domain::value::SqlValue;
use crate::error::TierlineError;
use crate::infrastructure::error::{DatabaseError, InfrastructureError};
use crate::ports::connector::{ColumnSchema, Connector, SampleRow};

/// DuckDB adapter. The root connection is never used for statements:
/// each call clones its own handle and runs on tokio's blocking pool.
pub struct DuckDBConnector {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDBConnector {
    pub fn new(db_path: &str) -> Result<Self, InfrastructureError> {
        let config = Config::default();

        let conn = if db_path == ":memory:" {
            Connection::open_in_memory_with_flags(config)?
        } else {
            Connection::open_with_flags(db_path, config)?
        };

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self, InfrastructureError> {
        Self::new(":memory:")
    }

    fn acquire(&self) -> Result<Connection, TierlineError> {
        let root = self.conn.lock().map_err(|_| {
            TierlineError::Infrastructure(InfrastructureError::Io(std::io::Error::other(
                "DuckDB Mutex Poisoned",
            )))
        })?;
        Ok(root.try_clone()?)
    }

    async fn run_blocking<T, F>(&self, job: F) -> Result<T, TierlineError>
    where
        T: Send + 'static,
        F: FnOnce(Connection) -> Result<T, TierlineError> + Send + 'static,
    {
        let conn = self.acquire()?;
        tokio::task::spawn_blocking(move || job(conn))
            .await
            .map_err(|e| TierlineError::InternalError(format!("DuckDB worker failed: {}", e)))?
    }
}

fn to_duckdb(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(b) => Value::Boolean(*b),
        SqlValue::Int(i) => Value::BigInt(*i),
        SqlValue::Float(f) => Value::Double(*f),
        SqlValue::Text(s) => Value::Text(s.clone()),
    }
}

fn from_duckdb(value: Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Boolean(b) => SqlValue::Bool(b),
        Value::TinyInt(v) => SqlValue::Int(v.into()),
        Value::SmallInt(v) => SqlValue::Int(v.into()),
        Value::Int(v) => SqlValue::Int(v.into()),
        Value::BigInt(v) => SqlValue::Int(v),
        Value::UTinyInt(v) => SqlValue::Int(v.into()),
        Value::USmallInt(v) => SqlValue::Int(v.into()),
        Value::UInt(v) => SqlValue::Int(v.into()),
        Value::HugeInt(v) => i64::try_from(v)
            .map(SqlValue::Int)
            .unwrap_or_else(|_| SqlValue::Text(v.to_string())),
        Value::UBigInt(v) => i64::try_from(v)
            .map(SqlValue::Int)
            .unwrap_or_else(|_| SqlValue::Text(v.to_string())),
        Value::Float(v) => SqlValue::Float(v.into()),
        Value::Double(v) => SqlValue::Float(v),
        Value::Decimal(d) => SqlValue::Text(d.to_string()),
        Value::Text(s) | Value::Enum(s) => SqlValue::Text(s),
        other => SqlValue::Text(format!("{:?}", other)),
    }
}

fn bind(params: &[SqlValue]) -> Vec<Value> {
    params.iter().map(to_duckdb).collect()
}

/// Types that survive as JSON scalars; everything else is sampled as text.
fn is_scalar_type(data_type: &str) -> bool {
    let t = data_type.to_ascii_uppercase();
    matches!(
        t.as_str(),
        "BOOLEAN" | "TINYINT" | "SMALLINT" | "INTEGER" | "BIGINT" | "UTINYINT" | "USMALLINT"
            | "UINTEGER" | "FLOAT" | "DOUBLE" | "VARCHAR"
    )
}

fn db_err(e: duckdb::Error) -> TierlineError {
    TierlineError::Infrastructure(InfrastructureError::Database(DatabaseError::DuckDB(e)))
}

#[async_trait]
impl Connector for DuckDBConnector {
    async fn execute(&self, query: &str, params: &[SqlValue]) -> Result<(), TierlineError> {
        debug!(query, params = params.len(), "duckdb execute");
        let sql = query.to_string();
        let values = bind(params);
        self.run_blocking(move |conn| {
            conn.execute(&sql, params_from_iter(values))
                .map(|_rows| ())
                .map_err(db_err)
        })
        .await
    }

    async fn execute_batch(&self, script: &str) -> Result<(), TierlineError> {
        debug!(len = script.len(), "duckdb execute_batch");
        let sql = script.to_string();
        self.run_blocking(move |conn| conn.execute_batch(&sql).map_err(db_err))
            .await
    }

    async fn query_row(
        &self,
        query: &str,
        params: &[SqlValue],
    ) -> Result<Vec<SqlValue>, TierlineError> {
        let sql = query.to_string();
        let values = bind(params);
        self.run_blocking(move |conn| {
            let mut stmt = conn.prepare(&sql).map_err(db_err)?;
            let mut rows = stmt.query(params_from_iter(values)).map_err(db_err)?;
            let row = rows.next().map_err(db_err)?.ok_or_else(|| {
                TierlineError::Infrastructure(InfrastructureError::Database(
                    DatabaseError::NoRow(sql.clone()),
                ))
            })?;

            let width = row.as_ref().column_count();
            (0..width)
                .map(|i| row.get::<_, Value>(i).map(from_duckdb).map_err(db_err))
                .collect()
        })
        .await
    }

    async fn fetch_columns(&self, table_name: &str) -> Result<Vec<ColumnSchema>, TierlineError> {
        let (schema, table) = match table_name.rsplit_once('.') {
            Some((s, t)) => (Some(s.to_string()), t.to_string()),
            None => (None, table_name.to_string()),
        };

        self.run_blocking(move |conn| {
            let mut sql = String::from(
                "SELECT column_name, data_type, is_nullable FROM information_schema.columns WHERE table_name = ?",
            );
            let mut values = vec![Value::Text(table)];
            if let Some(schema) = schema {
                sql.push_str(" AND table_schema = ?");
                values.push(Value::Text(schema));
            }
            sql.push_str(" ORDER BY ordinal_position");

            let mut stmt = conn.prepare(&sql).map_err(db_err)?;
            let rows = stmt
                .query_map(params_from_iter(values), |row| {
                    Ok(ColumnSchema {
                        name: row.get(0)?,
                        data_type: row.get(1)?,
                        is_nullable: row.get::<_, String>(2)? == "YES",
                    })
                })
                .map_err(db_err)?;

            let mut columns = Vec::new();
            for row in rows {
                columns.push(row.map_err(db_err)?);
            }
            Ok(columns)
        })
        .await
    }

    async fn fetch_sample_where(
        &self,
        table_name: &str,
        condition: &str,
        params: &[SqlValue],
        limit: usize,
    ) -> Result<Vec<SampleRow>, TierlineError> {
        let columns = self.fetch_columns(table_name).await?;
        if columns.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let projection = columns
            .iter()
            .map(|c| {
                let quoted = format!("\"{}\"", c.name.replace('"', "\"\""));
                if is_scalar_type(&c.data_type) {
                    quoted
                } else {
                    format!("CAST({} AS VARCHAR)", quoted)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {} FROM {} AS src WHERE {} LIMIT {}",
            projection,
            quote_table(table_name)?,
            condition,
            limit
        );
        debug!(sql, params = params.len(), "duckdb sample");
        let names: Vec<String> = columns.into_iter().map(|c| c.name).collect();
        let values = bind(params);

        self.run_blocking(move |conn| {
            let mut stmt = conn.prepare(&sql).map_err(db_err)?;
            let mut rows = stmt.query(params_from_iter(values)).map_err(db_err)?;
            let mut sample = Vec::new();
            while let Some(row) = rows.next().map_err(db_err)? {
                let mut record = SampleRow::new();
                for (i, name) in names.iter().enumerate() {
                    let value = from_duckdb(row.get::<_, Value>(i).map_err(db_err)?);
                    record.insert(name.clone(), value.to_json());
                }
                sample.push(record);
            }
            Ok(sample)
        })
        .await
    }

    async fn export_parquet(&self, table_name: &str, path: &Path) -> Result<(), TierlineError> {
        let target = path.to_str().ok_or_else(|| {
            TierlineError::InternalError(format!("Invalid snapshot path: {:?}", path))
        })?;
        // COPY does not take bound parameters for its target.
        let sql = format!(
            "COPY (SELECT * FROM {}) TO '{}' (FORMAT PARQUET)",
            quote_table(table_name)?,
            target.replace('\'', "''")
        );
        self.execute_batch(&sql).await
    }

    fn engine_name(&self) -> &str {
        "duckdb"
    }
}
