// tierline/src/commands/project.rs
//
// Wiring shared by the commands: config, catalog and adapters.

use anyhow::{Context, anyhow};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use tierline_core::application::{OrchestratorSettings, QuarantineStore};
use tierline_core::domain::DataContract;
use tierline_core::domain::ports::Catalog;
use tierline_core::infrastructure::adapters::{
    DuckDBConnector, JsonFileQuarantineRepository, ParquetSnapshotWriter,
};
use tierline_core::infrastructure::catalog::YamlCatalog;
use tierline_core::infrastructure::config::{ProjectConfig, load_project_config};

pub struct Project {
    pub root: PathBuf,
    pub config: ProjectConfig,
    pub catalog: YamlCatalog,
}

impl Project {
    pub fn load(root: PathBuf) -> anyhow::Result<Self> {
        let config = load_project_config(&root).with_context(|| {
            format!("Failed to load project configuration from {:?}", root)
        })?;
        println!("⚙️  Project: {} (v{})", config.name, config.version);

        let catalog = YamlCatalog::load(&config.catalog_dirs(&root))
            .with_context(|| format!("Failed to load catalog for {:?}", root))?;
        debug!(files = catalog.files().len(), "Catalog loaded");

        Ok(Self {
            root,
            config,
            catalog,
        })
    }

    pub fn connector(&self) -> anyhow::Result<DuckDBConnector> {
        let location = self.config.database_location(&self.root);
        if location != ":memory:"
            && let Some(parent) = Path::new(&location).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        DuckDBConnector::new(&location)
            .with_context(|| format!("Failed to initialize DuckDB at {}", location))
    }

    pub fn snapshots(&self) -> ParquetSnapshotWriter {
        ParquetSnapshotWriter::new(self.config.snapshot_dir(&self.root))
    }

    pub fn quarantine(&self) -> anyhow::Result<QuarantineStore> {
        let path = self.config.quarantine_path(&self.root);
        QuarantineStore::open(Arc::new(JsonFileQuarantineRepository::new(&path)))
            .with_context(|| format!("Failed to open quarantine store at {:?}", path))
    }

    pub fn settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            max_parallel_stages: self.config.max_parallel_stages,
            quarantine_sample_size: self.config.quarantine_sample_size,
            ..Default::default()
        }
        .with_tier_tables(&self.config.tier_tables)
    }

    pub fn contract(&self, id: &str) -> anyhow::Result<DataContract> {
        self.catalog
            .load_data_contract(id)?
            .ok_or_else(|| {
                anyhow!(
                    "Contract '{}' not found. Known contracts: {}",
                    id,
                    self.catalog.contract_ids().join(", ")
                )
            })
    }

    /// `--table`, or the table published for the contract's target tier.
    pub fn resolve_table(&self, contract: &DataContract, table: Option<String>) -> String {
        table.unwrap_or_else(|| {
            self.settings()
                .table_for(&contract.target_tier, &contract.entity)
        })
    }
}
