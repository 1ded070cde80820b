// tierline-core/src/application/orchestrator.rs

use chrono::Utc;
use futures::StreamExt;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::application::engine::{CalculationEngine, CalculationOutcome};
use crate::application::quarantine::QuarantineStore;
use crate::application::validation::ContractValidator;
use crate::domain::compiler::is_executable;
use crate::domain::contract::{DataContract, ValidationResult};
use crate::domain::error::DomainError;
use crate::domain::pipeline::{
    PipelineRunResult, PipelineStage, RunStatus, StageResult, StageRun, StageStep, StepKind,
    StepStatus,
};
use crate::domain::ports::Catalog;
use crate::domain::quarantine::NewQuarantineRecord;
use crate::error::TierlineError;
use crate::ports::connector::Connector;

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Tier → published table. Tiers not listed resolve to `<tier>_<entity>`.
    pub tier_tables: HashMap<String, String>,
    pub max_parallel_stages: usize,
    pub quarantine_sample_size: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            tier_tables: HashMap::from([("gold".to_string(), "gold_published".to_string())]),
            max_parallel_stages: 4,
            quarantine_sample_size: 10,
        }
    }
}

impl OrchestratorSettings {
    /// Project mappings win over the built-in `gold` one.
    pub fn with_tier_tables(mut self, tables: &HashMap<String, String>) -> Self {
        self.tier_tables
            .extend(tables.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn output_table(&self, stage: &PipelineStage, contract: &DataContract) -> String {
        self.table_for(&stage.target_tier, &contract.entity)
    }

    pub fn table_for(&self, tier: &str, entity: &str) -> String {
        self.tier_tables
            .get(tier)
            .cloned()
            .unwrap_or_else(|| format!("{}_{}", tier, entity))
    }
}

/// Runs pipeline stages: transformation, then contract gate, then quarantine.
pub struct StageOrchestrator<'a> {
    catalog: &'a dyn Catalog,
    connector: &'a dyn Connector,
    engine: CalculationEngine<'a>,
    quarantine: Option<&'a QuarantineStore>,
    settings: OrchestratorSettings,
}

impl<'a> StageOrchestrator<'a> {
    pub fn new(catalog: &'a dyn Catalog, connector: &'a dyn Connector) -> Self {
        Self {
            catalog,
            connector,
            engine: CalculationEngine::new(catalog, connector),
            quarantine: None,
            settings: OrchestratorSettings::default(),
        }
    }

    /// Engine used on the programmatic path (snapshots, run parameters).
    pub fn with_engine(mut self, engine: CalculationEngine<'a>) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_quarantine(mut self, store: &'a QuarantineStore) -> Self {
        self.quarantine = Some(store);
        self
    }

    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Never errors: lookup and execution problems end up in the result.
    pub async fn run_stage(&self, stage_id: &str) -> StageResult {
        let stage = self.catalog.load_pipeline_stages().map(|stages| {
            stages.into_iter().find(|s| s.id == stage_id)
        });

        match stage {
            Ok(Some(stage)) => self.execute_stage(&stage).await,
            Ok(None) => {
                warn!("Stage '{}' not found", stage_id);
                let mut run = StageRun::new(stage_id);
                run.start();
                run.fail(DomainError::StageNotFound(stage_id.to_string()).to_string())
            }
            Err(e) => {
                let mut run = StageRun::new(stage_id);
                run.start();
                run.fail(e.to_string())
            }
        }
    }

    /// Every stage, by ascending `order`. Only a catalog failure is an `Err`;
    /// a failing stage makes the run partial.
    pub async fn run_all(&self) -> Result<PipelineRunResult, TierlineError> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let run_id = Uuid::new_v4().to_string();

        let mut stages = self.catalog.load_pipeline_stages()?;
        stages.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));

        let mut buckets: BTreeMap<i32, Vec<&PipelineStage>> = BTreeMap::new();
        for stage in &stages {
            buckets.entry(stage.order).or_default().push(stage);
        }

        info!(run_id = %run_id, stages = stages.len(), "🚀 Starting pipeline run");
        let mut results = Vec::with_capacity(stages.len());
        for (order, bucket) in buckets {
            results.extend(self.run_bucket(order, &bucket).await);
        }

        let status = if results.iter().all(StageResult::is_completed) {
            RunStatus::Completed
        } else {
            RunStatus::Partial
        };

        let elapsed = clock.elapsed();
        let finished_at = started_at
            + chrono::Duration::from_std(elapsed).unwrap_or_else(|_| chrono::Duration::zero());

        info!(run_id = %run_id, status = ?status, "🏁 Pipeline finished in {:.2?}", elapsed);
        Ok(PipelineRunResult {
            run_id,
            status,
            stages: results,
            started_at,
            finished_at,
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        })
    }

    /// One `order` value: the parallel batch first, then the rest one by one.
    /// Results come back in the bucket's declaration order.
    async fn run_bucket(&self, order: i32, bucket: &[&PipelineStage]) -> Vec<StageResult> {
        let (batch, sequential) = plan_bucket(bucket);
        let mut by_id: HashMap<String, StageResult> = HashMap::with_capacity(bucket.len());

        if !batch.is_empty() {
            info!(order, stages = batch.len(), "  🔹 Running parallel batch");
            let width = self.settings.max_parallel_stages.max(1);
            let results: Vec<StageResult> = futures::stream::iter(
                batch.iter().map(|stage| self.execute_stage(stage)),
            )
            .buffered(width)
            .collect()
            .await;
            by_id.extend(results.into_iter().map(|r| (r.stage_id.clone(), r)));
        }

        for stage in sequential {
            let result = self.execute_stage(stage).await;
            by_id.insert(result.stage_id.clone(), result);
        }

        bucket
            .iter()
            .filter_map(|stage| by_id.remove(&stage.id))
            .collect()
    }

    #[instrument(skip(self, stage), fields(stage = %stage.id, order = stage.order))]
    async fn execute_stage(&self, stage: &PipelineStage) -> StageResult {
        let mut run = StageRun::new(&stage.id);
        run.start();
        info!(
            "▶️  Stage '{}' ({} → {})",
            stage.id, stage.source_tier, stage.target_tier
        );

        let Some(transformation_id) = &stage.transformation else {
            run.record(
                StageStep::new("no transformation", StepKind::Skip, StepStatus::Skipped)
                    .with_detail("nothing to execute"),
            );
            return run.complete();
        };

        let transformation = match self.catalog.load_transformation(transformation_id) {
            Ok(Some(t)) => t,
            Ok(None) => {
                let err = DomainError::MissingTransformation {
                    stage: stage.id.clone(),
                    transformation: transformation_id.clone(),
                };
                error!("❌ {}", err);
                return run.fail(err.to_string());
            }
            Err(e) => return run.fail(e.to_string()),
        };

        // 1. Transformation
        let outcome = if is_executable(&transformation.sql) {
            self.run_sql(&mut run, &transformation.id, &transformation.sql)
                .await
        } else {
            self.run_programmatic(&mut run).await
        };
        if let Err(message) = outcome {
            error!("❌ Stage '{}' failed: {}", stage.id, message);
            return run.fail(message);
        }

        // 2. Contract gate
        let Some(contract_id) = &stage.contract else {
            return run.complete();
        };
        let contract = match self.catalog.load_data_contract(contract_id) {
            Ok(Some(c)) => c,
            Ok(None) => {
                let err = DomainError::MissingContract {
                    stage: stage.id.clone(),
                    contract: contract_id.clone(),
                };
                return run.fail(err.to_string());
            }
            Err(e) => return run.fail(e.to_string()),
        };

        let table = self.settings.output_table(stage, &contract);
        run.set_output_table(&table);

        let validation = ContractValidator::new(self.connector)
            .validate(&contract, &table)
            .await;
        let failed = validation.failed_rules().len();
        run.record(
            StageStep::new(
                &contract.id,
                StepKind::Validation,
                if validation.passed {
                    StepStatus::Succeeded
                } else {
                    StepStatus::Failed
                },
            )
            .with_detail(format!(
                "score {:.1}, {} rule(s) failed",
                validation.quality_score, failed
            )),
        );

        // 3. Quarantine
        if !validation.passed
            && let Some(store) = self.quarantine
        {
            self.quarantine_failure(&mut run, store, stage, &contract, &validation)
                .await;
        }

        run.attach_validation(validation);
        run.complete()
    }

    async fn run_sql(&self, run: &mut StageRun, name: &str, sql: &str) -> Result<(), String> {
        let started = Instant::now();
        match self.connector.execute_batch(sql).await {
            Ok(()) => {
                run.record(
                    StageStep::new(name, StepKind::Sql, StepStatus::Succeeded)
                        .with_detail(format!("{:.2?}", started.elapsed())),
                );
                Ok(())
            }
            Err(e) => {
                let err = TierlineError::execution(name, e);
                run.record(
                    StageStep::new(name, StepKind::Sql, StepStatus::Failed)
                        .with_detail(err.to_string()),
                );
                Err(err.to_string())
            }
        }
    }

    /// All calculations, then all detection models; one step each.
    async fn run_programmatic(&self, run: &mut StageRun) -> Result<(), String> {
        let report = self.engine.run_all().await.map_err(|e| e.to_string())?;
        for outcome in &report.outcomes {
            run.record(outcome_step(outcome, StepKind::Calculation));
        }

        let detections = self
            .engine
            .run_detection_models()
            .await
            .map_err(|e| e.to_string())?;
        for outcome in &detections {
            run.record(outcome_step(outcome, StepKind::Detection));
        }

        let failed: Vec<&str> = report
            .outcomes
            .iter()
            .chain(detections.iter())
            .filter(|o| o.is_failed())
            .map(|o| o.id.as_str())
            .collect();
        if failed.is_empty() {
            Ok(())
        } else {
            Err(format!("{} unit(s) failed: {}", failed.len(), failed.join(", ")))
        }
    }

    async fn quarantine_failure(
        &self,
        run: &mut StageRun,
        store: &QuarantineStore,
        stage: &PipelineStage,
        contract: &DataContract,
        validation: &ValidationResult,
    ) {
        let limit = self.settings.quarantine_sample_size;
        let validator = ContractValidator::new(self.connector);
        // Offending rows when a row-level rule failed, the head of the table otherwise
        let sampled = match validator.sample_violations(contract, validation, limit).await {
            Ok(Some(rows)) => Ok(rows),
            Ok(None) => self.connector.fetch_sample(&validation.table, limit).await,
            Err(e) => Err(e),
        };
        let sample = match sampled {
            Ok(rows) => rows,
            Err(e) => {
                warn!("⚠️  Could not sample '{}': {}", validation.table, e);
                Vec::new()
            }
        };

        let record = NewQuarantineRecord {
            source_tier: stage.source_tier.clone(),
            target_tier: stage.target_tier.clone(),
            entity: contract.entity.clone(),
            failed_rules: validation.failed_rules(),
            original_data: serde_json::Value::Array(
                sample.into_iter().map(serde_json::Value::Object).collect(),
            ),
            notes: Some(format!(
                "stage '{}' failed contract '{}'",
                stage.id, contract.id
            )),
        };

        match store.capture(record) {
            Ok(captured) => {
                run.record(
                    StageStep::new(&captured.id, StepKind::Quarantine, StepStatus::Succeeded)
                        .with_detail(format!("{} failed rule(s)", captured.failed_rules.len())),
                );
                run.attach_quarantine(captured.id);
            }
            Err(e) => {
                // The gate result stands even if the record could not be written
                error!("❌ Quarantine capture failed: {}", e);
                run.record(
                    StageStep::new("quarantine", StepKind::Quarantine, StepStatus::Failed)
                        .with_detail(e.to_string()),
                );
            }
        }
    }
}

fn outcome_step(outcome: &CalculationOutcome, kind: StepKind) -> StageStep {
    let mut step = StageStep::new(&outcome.id, kind, outcome.status);
    if let Some(rows) = outcome.row_count {
        step = step.with_rows(rows);
    }
    if let Some(error) = &outcome.error {
        step = step.with_detail(error.clone());
    }
    step
}

/// Splits one order bucket into a concurrent batch and a sequential rest.
///
/// A `parallel` stage joins the batch when its `depends_on` set is disjoint
/// from every member's and neither depends on the other.
pub fn plan_bucket<'s>(
    bucket: &[&'s PipelineStage],
) -> (Vec<&'s PipelineStage>, Vec<&'s PipelineStage>) {
    let mut batch: Vec<&PipelineStage> = Vec::new();
    let mut sequential = Vec::new();

    for stage in bucket {
        let deps: HashSet<&str> = stage.depends_on.iter().map(String::as_str).collect();
        let compatible = stage.parallel
            && batch.iter().all(|member| {
                member.depends_on.iter().all(|d| !deps.contains(d.as_str()))
                    && !deps.contains(member.id.as_str())
                    && !member.depends_on.contains(&stage.id)
            });

        if compatible {
            batch.push(stage);
        } else {
            sequential.push(*stage);
        }
    }

    (batch, sequential)
}
