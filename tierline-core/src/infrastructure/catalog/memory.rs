// tierline-core/src/infrastructure/catalog/memory.rs

use std::collections::BTreeMap;

use crate::domain::calculation::{CalculationDefinition, DetectionModel};
use crate::domain::contract::DataContract;
use crate::domain::error::DomainError;
use crate::domain::pipeline::{PipelineStage, Transformation};
use crate::domain::ports::Catalog;
use crate::domain::quality::QualityDimension;

/// Catalog held entirely in memory. Built by hand in tests, or filled by
/// the YAML loader.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    calculations: Vec<CalculationDefinition>,
    detection_models: Vec<DetectionModel>,
    stages: Vec<PipelineStage>,
    transformations: BTreeMap<String, Transformation>,
    contracts: BTreeMap<String, DataContract>,
    dimensions: Vec<QualityDimension>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_calculation(mut self, calc: CalculationDefinition) -> Self {
        self.calculations.push(calc);
        self
    }

    pub fn with_detection_model(mut self, model: DetectionModel) -> Self {
        self.detection_models.push(model);
        self
    }

    pub fn with_stage(mut self, stage: PipelineStage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn with_transformation(mut self, transformation: Transformation) -> Self {
        self.transformations
            .insert(transformation.id.clone(), transformation);
        self
    }

    pub fn with_contract(mut self, contract: DataContract) -> Self {
        self.contracts.insert(contract.id.clone(), contract);
        self
    }

    pub fn with_dimension(mut self, dimension: QualityDimension) -> Self {
        self.dimensions.push(dimension);
        self
    }

    pub(crate) fn calculations_mut(&mut self) -> &mut Vec<CalculationDefinition> {
        &mut self.calculations
    }

    pub(crate) fn detection_models_mut(&mut self) -> &mut Vec<DetectionModel> {
        &mut self.detection_models
    }

    pub(crate) fn stages_mut(&mut self) -> &mut Vec<PipelineStage> {
        &mut self.stages
    }

    pub(crate) fn transformations_mut(&mut self) -> &mut BTreeMap<String, Transformation> {
        &mut self.transformations
    }

    pub(crate) fn contracts_mut(&mut self) -> &mut BTreeMap<String, DataContract> {
        &mut self.contracts
    }

    pub(crate) fn dimensions_mut(&mut self) -> &mut Vec<QualityDimension> {
        &mut self.dimensions
    }

    pub fn contract_ids(&self) -> Vec<String> {
        self.contracts.keys().cloned().collect()
    }
}

impl Catalog for InMemoryCatalog {
    fn list_calculations(&self) -> Result<Vec<CalculationDefinition>, DomainError> {
        Ok(self.calculations.clone())
    }

    fn load_pipeline_stages(&self) -> Result<Vec<PipelineStage>, DomainError> {
        Ok(self.stages.clone())
    }

    fn load_data_contract(&self, id: &str) -> Result<Option<DataContract>, DomainError> {
        Ok(self.contracts.get(id).cloned())
    }

    fn load_quality_dimensions(&self) -> Result<Vec<QualityDimension>, DomainError> {
        Ok(self.dimensions.clone())
    }

    fn load_transformation(&self, id: &str) -> Result<Option<Transformation>, DomainError> {
        Ok(self.transformations.get(id).cloned())
    }

    fn list_detection_models(&self) -> Result<Vec<DetectionModel>, DomainError> {
        Ok(self.detection_models.clone())
    }
}
