// tierline-core/src/infrastructure/catalog/yaml.rs

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use validator::Validate;
use walkdir::WalkDir;

use crate::domain::calculation::{CalculationDefinition, DetectionModel};
use crate::domain::contract::DataContract;
use crate::domain::error::DomainError;
use crate::domain::pipeline::{PipelineStage, Transformation};
use crate::domain::ports::Catalog;
use crate::domain::quality::QualityDimension;
use crate::infrastructure::catalog::memory::InMemoryCatalog;
use crate::infrastructure::error::InfrastructureError;

/// One catalog file. Every section is optional, so definitions can be split
/// across files however the project likes.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFragment {
    #[serde(default)]
    pub calculations: Vec<CalculationDefinition>,
    #[serde(default)]
    pub detection_models: Vec<DetectionModel>,
    #[serde(default)]
    pub transformations: Vec<Transformation>,
    #[serde(default)]
    pub stages: Vec<PipelineStage>,
    #[serde(default)]
    pub contracts: Vec<DataContract>,
    #[serde(default)]
    pub dimensions: Vec<QualityDimension>,
}

/// Catalog backed by `*.yml` / `*.yaml` fragments found under the catalog directories.
#[derive(Debug, Clone)]
pub struct YamlCatalog {
    inner: InMemoryCatalog,
    files: Vec<PathBuf>,
}

impl YamlCatalog {
    #[instrument(skip(dirs), fields(dirs = dirs.len()))]
    pub fn load(dirs: &[PathBuf]) -> Result<Self, InfrastructureError> {
        let mut catalog = InMemoryCatalog::new();
        let mut files = Vec::new();

        for dir in dirs {
            if !dir.exists() {
                warn!(path = ?dir, "Catalog directory not found, skipping");
                continue;
            }

            // Sorted walk: merge order does not depend on the filesystem
            let walker = WalkDir::new(dir).follow_links(true).sort_by_file_name();
            for entry in walker.into_iter().filter_map(|e| e.ok()) {
                let path = entry.path();
                let is_yaml = path
                    .extension()
                    .is_some_and(|ext| ext == "yml" || ext == "yaml");
                if !entry.file_type().is_file() || !is_yaml {
                    continue;
                }

                let fragment = load_fragment(path)?;
                debug!(path = ?path, "Catalog fragment loaded");
                merge(&mut catalog, fragment, path)?;
                files.push(path.to_path_buf());
            }
        }

        info!(files = files.len(), "📚 Catalog loaded");
        Ok(Self {
            inner: catalog,
            files,
        })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn contract_ids(&self) -> Vec<String> {
        self.inner.contract_ids()
    }
}

fn load_fragment(path: &Path) -> Result<CatalogFragment, InfrastructureError> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog fragment at {:?}", path))?;
    if content.trim().is_empty() {
        return Ok(CatalogFragment::default());
    }
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse catalog fragment at {:?}", path))
        .map_err(Into::into)
}

fn merge(
    catalog: &mut InMemoryCatalog,
    fragment: CatalogFragment,
    path: &Path,
) -> Result<(), InfrastructureError> {
    // Duplicate calculation ids are left to the DAG builder, which names them.
    catalog.calculations_mut().extend(fragment.calculations);
    catalog.detection_models_mut().extend(fragment.detection_models);

    for stage in fragment.stages {
        if catalog.stages_mut().iter().any(|s| s.id == stage.id) {
            return Err(duplicate("stage", &stage.id, path));
        }
        catalog.stages_mut().push(stage);
    }

    for transformation in fragment.transformations {
        if catalog.transformations_mut().contains_key(&transformation.id) {
            return Err(duplicate("transformation", &transformation.id, path));
        }
        catalog
            .transformations_mut()
            .insert(transformation.id.clone(), transformation);
    }

    for contract in fragment.contracts {
        if catalog.contracts_mut().contains_key(&contract.id) {
            return Err(duplicate("contract", &contract.id, path));
        }
        catalog.contracts_mut().insert(contract.id.clone(), contract);
    }

    for dimension in fragment.dimensions {
        dimension.validate()?;
        if catalog.dimensions_mut().iter().any(|d| d.id == dimension.id) {
            return Err(duplicate("dimension", &dimension.id, path));
        }
        catalog.dimensions_mut().push(dimension);
    }

    Ok(())
}

fn duplicate(what: &str, id: &str, path: &Path) -> InfrastructureError {
    InfrastructureError::ConfigError(format!(
        "Duplicate {} '{}' declared in {:?}",
        what, id, path
    ))
}

impl Catalog for YamlCatalog {
    fn list_calculations(&self) -> Result<Vec<CalculationDefinition>, DomainError> {
        self.inner.list_calculations()
    }

    fn load_pipeline_stages(&self) -> Result<Vec<PipelineStage>, DomainError> {
        self.inner.load_pipeline_stages()
    }

    fn load_data_contract(&self, id: &str) -> Result<Option<DataContract>, DomainError> {
        self.inner.load_data_contract(id)
    }

    fn load_quality_dimensions(&self) -> Result<Vec<QualityDimension>, DomainError> {
        self.inner.load_quality_dimensions()
    }

    fn load_transformation(&self, id: &str) -> Result<Option<Transformation>, DomainError> {
        self.inner.load_transformation(id)
    }

    fn list_detection_models(&self) -> Result<Vec<DetectionModel>, DomainError> {
        self.inner.list_detection_models()
    }
}
