pub mod calculation;
pub mod compiler;
pub mod contract;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod ports;
pub mod quality;
pub mod quarantine;
pub mod value;

// Re-exports pratiques pour simplifier les imports ailleurs
pub use calculation::{CalculationDefinition, DetectionModel, Layer};
pub use contract::{DataContract, QualityRule, RuleKind, RuleResult, Sla, ValidationResult};
pub use error::DomainError;
pub use pipeline::{
    PipelineRunResult, PipelineStage, RunStatus, StageResult, StageStatus, StageStep, Transformation,
};
pub use quality::{
    ColumnProfile, DimensionScore, EntityProfile, EntityQualityScore, QualityDimension,
    QualityStatus, ScoreMethod, Thresholds,
};
pub use quarantine::{
    NewQuarantineRecord, QuarantineFilter, QuarantineRecord, QuarantineStatus, QuarantineSummary,
};
pub use value::SqlValue;
