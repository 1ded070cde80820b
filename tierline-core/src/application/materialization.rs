// tierline-core/src/application/materialization.rs

use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, instrument};

use crate::domain::compiler::{BoundQuery, quote_table};
use crate::error::TierlineError;
use crate::ports::connector::Connector;
use crate::ports::snapshot::SnapshotWriter;

/// What a materialization left behind.
#[derive(Debug, Clone, PartialEq)]
pub struct Materialized {
    pub table: String,
    pub row_count: u64,
    pub snapshot: Option<PathBuf>,
}

pub struct Materializer;

impl Materializer {
    /// Full refresh of `output_table` from a bound SELECT.
    ///
    /// The target is dropped and recreated, counted, then (optionally)
    /// snapshotted. Running it twice on unchanged inputs yields the same table.
    /// Every failure is tagged with `unit`.
    #[instrument(skip(connector, query, snapshots), fields(params = query.params.len()))]
    pub async fn materialize(
        connector: &dyn Connector,
        unit: &str,
        output_table: &str,
        query: &BoundQuery,
        snapshots: Option<&dyn SnapshotWriter>,
    ) -> Result<Materialized, TierlineError> {
        let start = Instant::now();
        let table = quote_table(output_table).map_err(|e| TierlineError::execution(unit, e))?;

        let statements = [
            (format!("DROP TABLE IF EXISTS {}", table), Vec::new()),
            (
                format!("CREATE TABLE {} AS {}", table, query.sql),
                query.params.clone(),
            ),
        ];

        for (sql, params) in &statements {
            debug!("⚡ Executing: {}", sql);
            if let Err(e) = connector.execute(sql, params).await {
                error!("❌ '{}' failed after {:.2?}: {}", unit, start.elapsed(), e);
                return Err(TierlineError::execution(
                    unit,
                    format!("{}\n    📄 Query: {}", e, sql),
                ));
            }
        }

        let row_count = connector
            .query_scalar(&format!("SELECT COUNT(*) FROM {}", table), &[])
            .await
            .map_err(|e| TierlineError::execution(unit, e))?;
        let row_count = u64::try_from(row_count).unwrap_or_default();

        let snapshot = match snapshots {
            Some(writer) => Some(
                writer
                    .write_snapshot(connector, output_table)
                    .await
                    .map_err(|e| TierlineError::execution(unit, e))?,
            ),
            None => None,
        };

        debug!(
            "✅ '{}' materialized {} rows in {:.2?}",
            unit,
            row_count,
            start.elapsed()
        );

        Ok(Materialized {
            table: output_table.to_string(),
            row_count,
            snapshot,
        })
    }
}
