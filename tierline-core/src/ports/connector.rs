// tierline-core/src/ports/connector.rs

// This file defines what the engine needs from a tabular store, without knowing how it's done.
// Every call is one statement on its own short-lived handle: no session state is assumed.

use crate::domain::value::SqlValue;
use crate::error::TierlineError;
use crate::infrastructure::error::{DatabaseError, InfrastructureError};
use async_trait::async_trait;
use std::path::Path;

// Struct simple pour décrire une colonne (indépendant de la DB)
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
}

/// One row keyed by column name, ready to be stored as JSON.
pub type SampleRow = serde_json::Map<String, serde_json::Value>;

#[async_trait]
pub trait Connector: Send + Sync {
    /// Runs a single statement with positional `?` parameters.
    async fn execute(&self, query: &str, params: &[SqlValue]) -> Result<(), TierlineError>;

    /// Runs several `;`-separated statements without parameters.
    async fn execute_batch(&self, script: &str) -> Result<(), TierlineError>;

    /// Returns the first row of a query, every column converted to a `SqlValue`.
    async fn query_row(&self, query: &str, params: &[SqlValue])
    -> Result<Vec<SqlValue>, TierlineError>;

    async fn fetch_columns(&self, table_name: &str) -> Result<Vec<ColumnSchema>, TierlineError>;

    /// Rows matching `condition`, a boolean expression over the table aliased
    /// as `src` with positional `?` parameters.
    async fn fetch_sample_where(
        &self,
        table_name: &str,
        condition: &str,
        params: &[SqlValue],
        limit: usize,
    ) -> Result<Vec<SampleRow>, TierlineError>;

    /// Columnar export of a whole table.
    async fn export_parquet(&self, table_name: &str, path: &Path) -> Result<(), TierlineError>;

    fn engine_name(&self) -> &str;

    /// The first `limit` rows of a table.
    async fn fetch_sample(
        &self,
        table_name: &str,
        limit: usize,
    ) -> Result<Vec<SampleRow>, TierlineError> {
        self.fetch_sample_where(table_name, "TRUE", &[], limit).await
    }

    /// First column of the first row as an integer (NULL reads as 0).
    async fn query_scalar(&self, query: &str, params: &[SqlValue]) -> Result<i64, TierlineError> {
        let row = self.query_row(query, params).await?;
        match row.first() {
            Some(SqlValue::Null) => Ok(0),
            Some(value) => value.as_i64().ok_or_else(|| {
                TierlineError::InternalError(format!("Non-integer scalar returned: {}", value))
            }),
            None => Err(TierlineError::Infrastructure(InfrastructureError::Database(
                DatabaseError::NoRow(query.to_string()),
            ))),
        }
    }
}
