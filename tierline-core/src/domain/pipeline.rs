// tierline-core/src/domain/pipeline.rs

use crate::domain::contract::ValidationResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStage {
    pub id: String,
    pub source_tier: String,
    pub target_tier: String,
    pub order: i32,

    #[serde(default)]
    pub depends_on: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,

    /// Eligible for the bounded concurrent batch of its `order` bucket.
    #[serde(default)]
    pub parallel: bool,
}

/// SQL attached to a stage. Empty or comment-only SQL selects the programmatic path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transformation {
    pub id: String,
    #[serde(default)]
    pub sql: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl StageStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StageStatus::Completed | StageStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Skip,
    Sql,
    Calculation,
    Detection,
    Validation,
    Quarantine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Failed,
    Skipped,
}

/// One line of a stage's step log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageStep {
    pub name: String,
    pub kind: StepKind,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl StageStep {
    pub fn new(name: impl Into<String>, kind: StepKind, status: StepStatus) -> Self {
        Self {
            name: name.into(),
            kind,
            status,
            row_count: None,
            detail: None,
        }
    }

    pub fn with_rows(mut self, rows: u64) -> Self {
        self.row_count = Some(rows);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub stage_id: String,
    pub status: StageStatus,
    pub steps: Vec<StageStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quarantine_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl StageResult {
    pub fn is_completed(&self) -> bool {
        self.status == StageStatus::Completed
    }
}

/// Mutable record of a stage while it runs: pending → running → {completed, failed}.
#[derive(Debug)]
pub struct StageRun {
    stage_id: String,
    status: StageStatus,
    steps: Vec<StageStep>,
    output_table: Option<String>,
    validation: Option<ValidationResult>,
    quarantine_id: Option<String>,
    started_at: DateTime<Utc>,
    clock: Instant,
}

impl StageRun {
    pub fn new(stage_id: impl Into<String>) -> Self {
        Self {
            stage_id: stage_id.into(),
            status: StageStatus::Pending,
            steps: Vec::new(),
            output_table: None,
            validation: None,
            quarantine_id: None,
            started_at: Utc::now(),
            clock: Instant::now(),
        }
    }

    /// Moves to `running` and pins both clocks.
    pub fn start(&mut self) {
        self.status = StageStatus::Running;
        self.started_at = Utc::now();
        self.clock = Instant::now();
    }

    pub fn status(&self) -> StageStatus {
        self.status
    }

    pub fn record(&mut self, step: StageStep) {
        self.steps.push(step);
    }

    pub fn set_output_table(&mut self, table: impl Into<String>) {
        self.output_table = Some(table.into());
    }

    pub fn attach_validation(&mut self, validation: ValidationResult) {
        self.validation = Some(validation);
    }

    pub fn attach_quarantine(&mut self, id: impl Into<String>) {
        self.quarantine_id = Some(id.into());
    }

    pub fn complete(self) -> StageResult {
        self.finish(StageStatus::Completed, None)
    }

    pub fn fail(self, error: impl Into<String>) -> StageResult {
        self.finish(StageStatus::Failed, Some(error.into()))
    }

    fn finish(self, status: StageStatus, error: Option<String>) -> StageResult {
        // Monotonic elapsed time is the single source for both fields below.
        let elapsed = self.clock.elapsed();
        let finished_at = self.started_at
            + chrono::Duration::from_std(elapsed).unwrap_or_else(|_| chrono::Duration::zero());

        StageResult {
            stage_id: self.stage_id,
            status,
            steps: self.steps,
            output_table: self.output_table,
            validation: self.validation,
            quarantine_id: self.quarantine_id,
            error,
            started_at: self.started_at,
            finished_at,
            duration_ms: elapsed.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Partial,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRunResult {
    pub run_id: String,
    pub status: RunStatus,
    pub stages: Vec<StageResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl PipelineRunResult {
    pub fn completed_stages(&self) -> usize {
        self.stages.iter().filter(|s| s.is_completed()).count()
    }

    pub fn failed_stages(&self) -> Vec<&StageResult> {
        self.stages
            .iter()
            .filter(|s| s.status == StageStatus::Failed)
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_run_lifecycle() {
        let mut run = StageRun::new("bronze_to_silver");
        assert_eq!(run.status(), StageStatus::Pending);

        run.start();
        assert_eq!(run.status(), StageStatus::Running);
        run.record(StageStep::new("noop", StepKind::Skip, StepStatus::Skipped));

        let result = run.fail("boom");
        assert!(result.status.is_terminal());
        assert_eq!(result.error.as_deref(), Some("boom"));
        assert_eq!(result.steps.len(), 1);
    }

    #[test]
    fn test_duration_is_derived_from_timestamps() {
        let mut run = StageRun::new("s");
        run.start();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let result = run.complete();

        let span = (result.finished_at - result.started_at).num_milliseconds();
        assert_eq!(span as u64, result.duration_ms);
        assert!(result.duration_ms >= 5);
    }

    #[test]
    fn test_stage_defaults() {
        let yaml = "id: s1\nsource_tier: bronze\ntarget_tier: silver\norder: 2\n";
        let stage: PipelineStage = serde_yaml::from_str(yaml).unwrap();
        assert!(stage.depends_on.is_empty());
        assert!(stage.transformation.is_none());
        assert!(!stage.parallel);
    }
}
