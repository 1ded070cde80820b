// tierline-core/src/infrastructure/config/project.rs

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};
use validator::Validate;

use crate::domain::value::SqlValue;
use crate::infrastructure::error::InfrastructureError;

pub const CONFIG_CANDIDATES: [&str; 2] = ["tierline.yaml", "tierline_project.yaml"];

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct ProjectConfig {
    #[validate(length(min = 1, message = "Project name cannot be empty"))]
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    /// DuckDB file, relative to the project root, or `:memory:`.
    #[serde(default = "default_database")]
    #[validate(length(min = 1))]
    pub database: String,

    #[serde(rename = "catalog-paths", default = "default_catalog_paths")]
    pub catalog_paths: Vec<String>,

    #[serde(rename = "target-path", default = "default_target_path")]
    pub target_path: String,

    #[serde(rename = "snapshot-dir", default = "default_snapshot_dir")]
    pub snapshot_dir: String,

    #[serde(rename = "quarantine-file", default = "default_quarantine_file")]
    pub quarantine_file: String,

    #[serde(rename = "clean-targets", default = "default_clean_targets")]
    pub clean_targets: Vec<String>,

    /// Run-level placeholder values; they win over a calculation's defaults.
    #[serde(default)]
    pub parameters: BTreeMap<String, SqlValue>,

    #[serde(rename = "tier-tables", default)]
    pub tier_tables: HashMap<String, String>,

    #[serde(rename = "max-parallel-stages", default = "default_max_parallel")]
    #[validate(range(min = 1, max = 64))]
    pub max_parallel_stages: usize,

    #[serde(rename = "quarantine-sample-size", default = "default_sample_size")]
    #[validate(range(max = 1000))]
    pub quarantine_sample_size: usize,
}

fn default_version() -> String {
    "0.1.0".to_string()
}
fn default_database() -> String {
    "tierline.duckdb".to_string()
}
fn default_catalog_paths() -> Vec<String> {
    vec!["catalog".to_string()]
}
fn default_target_path() -> String {
    "target".to_string()
}
fn default_snapshot_dir() -> String {
    "snapshots".to_string()
}
fn default_quarantine_file() -> String {
    "quarantine.json".to_string()
}
fn default_clean_targets() -> Vec<String> {
    vec!["target".to_string()]
}
fn default_max_parallel() -> usize {
    4
}
fn default_sample_size() -> usize {
    10
}

impl ProjectConfig {
    pub fn target_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.target_path)
    }

    pub fn snapshot_dir(&self, root: &Path) -> PathBuf {
        self.target_dir(root).join(&self.snapshot_dir)
    }

    pub fn quarantine_path(&self, root: &Path) -> PathBuf {
        self.target_dir(root).join(&self.quarantine_file)
    }

    pub fn run_results_path(&self, root: &Path) -> PathBuf {
        self.target_dir(root).join("run_results.json")
    }

    pub fn catalog_dirs(&self, root: &Path) -> Vec<PathBuf> {
        self.catalog_paths.iter().map(|p| root.join(p)).collect()
    }

    /// Connection string for the DuckDB adapter.
    pub fn database_location(&self, root: &Path) -> String {
        if self.database == ":memory:" {
            return self.database.clone();
        }
        root.join(&self.database).to_string_lossy().into_owned()
    }
}

// --- LOADER ---

#[instrument(skip(project_dir))]
pub fn load_project_config(project_dir: &Path) -> Result<ProjectConfig, InfrastructureError> {
    let config_path = find_main_config(project_dir)?;
    info!(path = ?config_path, "Loading project manifest");

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read project config at {:?}", config_path))?;
    let mut config: ProjectConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse project config YAML at {:?}", config_path))?;

    // Layering: le fichier, puis l'environnement
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    config.validate()?;
    Ok(config)
}

fn find_main_config(root: &Path) -> Result<PathBuf, InfrastructureError> {
    for filename in CONFIG_CANDIDATES {
        let p = root.join(filename);
        if p.exists() {
            return Ok(p);
        }
    }
    Err(InfrastructureError::ConfigNotFound(format!(
        "No configuration file found in {:?}. Checked: {:?}",
        root, CONFIG_CANDIDATES
    )))
}

/// `TIERLINE_TARGET_PATH=/tmp/build tierline run`
pub fn apply_env_overrides<F>(config: &mut ProjectConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("TIERLINE_TARGET_PATH") {
        info!(old = ?config.target_path, new = ?val, "Overriding target path via ENV");
        config.target_path = val;
    }
    if let Some(val) = lookup("TIERLINE_DATABASE") {
        info!(old = ?config.database, new = ?val, "Overriding database via ENV");
        config.database = val;
    }
}
