// tierline-core/src/infrastructure/adapters/parquet.rs

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use crate::domain::compiler::validate_identifier;
use crate::error::TierlineError;
use crate::ports::connector::Connector;
use crate::ports::snapshot::SnapshotWriter;

/// Writes `<dir>/<table>.parquet`. The export lands in a temporary file
/// first and is renamed into place, so a reader never sees half a snapshot.
#[derive(Debug, Clone)]
pub struct ParquetSnapshotWriter {
    dir: PathBuf,
}

impl ParquetSnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn snapshot_path(&self, table_name: &str) -> PathBuf {
        self.dir.join(format!("{}.parquet", table_name))
    }
}

#[async_trait]
impl SnapshotWriter for ParquetSnapshotWriter {
    async fn write_snapshot(
        &self,
        connector: &dyn Connector,
        table_name: &str,
    ) -> Result<PathBuf, TierlineError> {
        // The table name becomes a file name: no separators allowed
        for part in table_name.split('.') {
            validate_identifier(part)?;
        }
        std::fs::create_dir_all(&self.dir)?;

        let target = self.snapshot_path(table_name);
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", table_name, uuid::Uuid::new_v4()));

        if let Err(e) = connector.export_parquet(table_name, &tmp).await {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }
        std::fs::rename(&tmp, &target)?;

        debug!(table = table_name, path = ?target, "Snapshot written");
        Ok(target)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::DuckDBConnector;
    use anyhow::Result;

    #[tokio::test]
    async fn test_snapshot_replaces_previous() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let writer = ParquetSnapshotWriter::new(dir.path().join("snapshots"));
        let connector = DuckDBConnector::in_memory()?;

        connector
            .execute("CREATE TABLE gold AS SELECT 1 AS id", &[])
            .await?;
        let first = writer.write_snapshot(&connector, "gold").await?;

        connector
            .execute("CREATE OR REPLACE TABLE gold AS SELECT * FROM range(3) t(id)", &[])
            .await?;
        let second = writer.write_snapshot(&connector, "gold").await?;

        assert_eq!(first, second);
        assert_eq!(second, dir.path().join("snapshots").join("gold.parquet"));

        let count = connector
            .query_scalar(
                &format!("SELECT COUNT(*) FROM read_parquet('{}')", second.display()),
                &[],
            )
            .await?;
        assert_eq!(count, 3);

        // Only the final file remains
        let entries: Vec<_> = std::fs::read_dir(dir.path().join("snapshots"))?.collect();
        assert_eq!(entries.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_export_leaves_nothing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let writer = ParquetSnapshotWriter::new(dir.path());
        let connector = DuckDBConnector::in_memory()?;

        assert!(writer.write_snapshot(&connector, "missing").await.is_err());
        assert!(writer.write_snapshot(&connector, "../escape").await.is_err());
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }
}
