// tierline-core/src/ports/snapshot.rs

use crate::error::TierlineError;
use crate::ports::connector::Connector;
use async_trait::async_trait;
use std::path::PathBuf;

/// Sink for immutable columnar copies of materialized tables.
/// Downstream tiers read the snapshot, never the live table.
#[async_trait]
pub trait SnapshotWriter: Send + Sync {
    async fn write_snapshot(
        &self,
        connector: &dyn Connector,
        table_name: &str,
    ) -> Result<PathBuf, TierlineError>;
}
