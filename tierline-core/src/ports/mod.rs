// tierline-core/src/ports/mod.rs

pub mod connector;
pub mod snapshot;

pub use connector::{ColumnSchema, Connector, SampleRow};
pub use snapshot::SnapshotWriter;
