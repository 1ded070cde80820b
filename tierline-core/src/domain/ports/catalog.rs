use crate::domain::calculation::{CalculationDefinition, DetectionModel};
use crate::domain::contract::DataContract;
use crate::domain::error::DomainError;
use crate::domain::pipeline::{PipelineStage, Transformation};
use crate::domain::quality::QualityDimension;

/// Read-only registry of definitions. The engine never mutates it.
pub trait Catalog: Send + Sync {
    fn list_calculations(&self) -> Result<Vec<CalculationDefinition>, DomainError>;

    fn load_pipeline_stages(&self) -> Result<Vec<PipelineStage>, DomainError>;

    fn load_data_contract(&self, id: &str) -> Result<Option<DataContract>, DomainError>;

    fn load_quality_dimensions(&self) -> Result<Vec<QualityDimension>, DomainError>;

    fn load_transformation(&self, id: &str) -> Result<Option<Transformation>, DomainError>;

    fn list_detection_models(&self) -> Result<Vec<DetectionModel>, DomainError>;
}
