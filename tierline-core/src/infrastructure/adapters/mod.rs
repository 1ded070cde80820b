// tierline-core/src/infrastructure/adapters/mod.rs

pub mod duckdb;
pub mod parquet;
pub mod quarantine;

pub use self::duckdb::DuckDBConnector;
pub use parquet::ParquetSnapshotWriter;
pub use quarantine::{InMemoryQuarantineRepository, JsonFileQuarantineRepository};
