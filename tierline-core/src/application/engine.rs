// tierline-core/src/application/engine.rs

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::application::materialization::{Materialized, Materializer};
use crate::domain::calculation::{CalculationDefinition, DetectionModel};
use crate::domain::compiler::bind_parameters;
use crate::domain::graph::GraphSolver;
use crate::domain::pipeline::StepStatus;
use crate::domain::ports::Catalog;
use crate::domain::value::SqlValue;
use crate::error::TierlineError;
use crate::ports::connector::Connector;
use crate::ports::snapshot::SnapshotWriter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationOutcome {
    pub id: String,
    pub output_table: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl CalculationOutcome {
    fn succeeded(id: &str, result: Materialized, started: Instant) -> Self {
        Self {
            id: id.to_string(),
            output_table: result.table,
            status: StepStatus::Succeeded,
            row_count: Some(result.row_count),
            snapshot: result.snapshot,
            error: None,
            duration_ms: elapsed_ms(started),
        }
    }

    fn failed(id: &str, output_table: &str, err: &TierlineError, started: Instant) -> Self {
        Self {
            id: id.to_string(),
            output_table: output_table.to_string(),
            status: StepStatus::Failed,
            row_count: None,
            snapshot: None,
            error: Some(err.to_string()),
            duration_ms: elapsed_ms(started),
        }
    }

    fn skipped(calc: &CalculationDefinition, reason: String) -> Self {
        Self {
            id: calc.id.clone(),
            output_table: calc.output_table.clone(),
            status: StepStatus::Skipped,
            row_count: None,
            snapshot: None,
            error: Some(reason),
            duration_ms: 0,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == StepStatus::Failed
    }
}

/// Outcomes in execution order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculationRunReport {
    pub outcomes: Vec<CalculationOutcome>,
}

impl CalculationRunReport {
    pub fn get(&self, id: &str) -> Option<&CalculationOutcome> {
        self.outcomes.iter().find(|o| o.id == id)
    }

    pub fn count(&self, status: StepStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Failed or skipped outcomes both mean the run did not fully succeed.
    pub fn is_success(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| o.status == StepStatus::Succeeded)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Runs calculations and detection models against one connector.
///
/// Nothing is cached between calls: every run recomputes its targets.
pub struct CalculationEngine<'a> {
    catalog: &'a dyn Catalog,
    connector: &'a dyn Connector,
    snapshots: Option<&'a dyn SnapshotWriter>,
    parameters: BTreeMap<String, SqlValue>,
}

impl<'a> CalculationEngine<'a> {
    pub fn new(catalog: &'a dyn Catalog, connector: &'a dyn Connector) -> Self {
        Self {
            catalog,
            connector,
            snapshots: None,
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_snapshots(mut self, writer: &'a dyn SnapshotWriter) -> Self {
        self.snapshots = Some(writer);
        self
    }

    /// Run-level placeholder values, applied over each definition's defaults.
    pub fn with_parameters(mut self, parameters: BTreeMap<String, SqlValue>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn build_dag(&self) -> Result<Vec<CalculationDefinition>, TierlineError> {
        let calcs = self.catalog.list_calculations()?;
        Ok(GraphSolver::build_dag(&calcs)?)
    }

    fn resolve_parameters(
        &self,
        defaults: &BTreeMap<String, SqlValue>,
    ) -> BTreeMap<String, SqlValue> {
        let mut merged = defaults.clone();
        merged.extend(
            self.parameters
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        merged
    }

    async fn materialize(
        &self,
        unit: &str,
        logic: &str,
        output_table: &str,
        defaults: &BTreeMap<String, SqlValue>,
    ) -> Result<Materialized, TierlineError> {
        let bound = bind_parameters(unit, logic, &self.resolve_parameters(defaults))?;
        Materializer::materialize(self.connector, unit, output_table, &bound, self.snapshots).await
    }

    /// Materializes one calculation and returns its row count.
    #[instrument(skip(self, calc), fields(calc = %calc.id, layer = %calc.layer))]
    pub async fn execute(&self, calc: &CalculationDefinition) -> Result<u64, TierlineError> {
        let result = self
            .materialize(&calc.id, &calc.logic, &calc.output_table, &calc.parameters)
            .await?;
        Ok(result.row_count)
    }

    /// Runs `id` and everything it depends on, dependencies first.
    pub async fn run_one(&self, id: &str) -> Result<CalculationRunReport, TierlineError> {
        let calcs = self.catalog.list_calculations()?;
        let ordered = GraphSolver::closure(&calcs, id)?;
        info!(target = id, count = ordered.len(), "🎯 Running calculation closure");
        Ok(self.run_ordered(&ordered).await)
    }

    /// Runs the whole DAG. Definition errors abort; execution errors do not.
    pub async fn run_all(&self) -> Result<CalculationRunReport, TierlineError> {
        let ordered = self.build_dag()?;
        info!(count = ordered.len(), "🧠 Running calculation DAG");
        Ok(self.run_ordered(&ordered).await)
    }

    /// `ordered` must already be topologically sorted.
    async fn run_ordered(&self, ordered: &[CalculationDefinition]) -> CalculationRunReport {
        let mut report = CalculationRunReport::default();
        let mut blocked: HashSet<String> = HashSet::new();

        for calc in ordered {
            if blocked.contains(&calc.id) {
                let cause = calc
                    .depends_on
                    .iter()
                    .find(|d| blocked.contains(*d) || report.get(d).is_some_and(|o| o.is_failed()))
                    .cloned()
                    .unwrap_or_default();
                warn!(calc = %calc.id, blocked_by = %cause, "⏭️  Skipped");
                report.outcomes.push(CalculationOutcome::skipped(
                    calc,
                    format!("blocked by failed dependency '{}'", cause),
                ));
                continue;
            }

            let started = Instant::now();
            match self
                .materialize(&calc.id, &calc.logic, &calc.output_table, &calc.parameters)
                .await
            {
                Ok(result) => {
                    info!(calc = %calc.id, rows = result.row_count, "✅ Calculation done");
                    report
                        .outcomes
                        .push(CalculationOutcome::succeeded(&calc.id, result, started));
                }
                Err(e) => {
                    error!(calc = %calc.id, "❌ Calculation failed: {}", e);
                    blocked.extend(GraphSolver::dependents_of(ordered, &calc.id));
                    report.outcomes.push(CalculationOutcome::failed(
                        &calc.id,
                        &calc.output_table,
                        &e,
                        started,
                    ));
                }
            }
        }

        report
    }

    /// Materializes one detection model like a calculation. Never returns an error:
    /// the outcome carries it.
    #[instrument(skip(self, model), fields(model = %model.id))]
    pub async fn run_detection(&self, model: &DetectionModel) -> CalculationOutcome {
        let started = Instant::now();
        match self
            .materialize(&model.id, &model.logic, &model.output_table, &model.parameters)
            .await
        {
            Ok(result) => CalculationOutcome::succeeded(&model.id, result, started),
            Err(e) => {
                error!("❌ Detection model '{}' failed: {}", model.id, e);
                CalculationOutcome::failed(&model.id, &model.output_table, &e, started)
            }
        }
    }

    pub async fn run_detection_models(&self) -> Result<Vec<CalculationOutcome>, TierlineError> {
        let models = self.catalog.list_detection_models()?;
        let mut outcomes = Vec::with_capacity(models.len());
        for model in &models {
            outcomes.push(self.run_detection(model).await);
        }
        Ok(outcomes)
    }
}
