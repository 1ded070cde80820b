// tierline-core/src/domain/quality.rs

use crate::domain::contract::{RuleKind, RuleResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

pub const COMPLETENESS: &str = "completeness";
pub const ACCURACY: &str = "accuracy";
pub const VALIDITY: &str = "validity";
pub const UNIQUENESS: &str = "uniqueness";
pub const CONSISTENCY: &str = "consistency";
pub const TIMELINESS: &str = "timeliness";

/// Fixed rule kind → dimension mapping. Unmapped kinds land in `consistency`.
pub fn dimension_for(kind: RuleKind) -> &'static str {
    match kind {
        RuleKind::NotNull => COMPLETENESS,
        RuleKind::RangeCheck => ACCURACY,
        RuleKind::EnumCheck | RuleKind::RegexMatch => VALIDITY,
        RuleKind::Unique => UNIQUENESS,
        RuleKind::Freshness => TIMELINESS,
        RuleKind::ReferentialIntegrity => CONSISTENCY,
        _ => CONSISTENCY,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMethod {
    #[default]
    Ratio,
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub good: f64,
    pub warning: f64,
    pub critical: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            good: 95.0,
            warning: 80.0,
            critical: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct QualityDimension {
    #[validate(length(min = 1, message = "Dimension id cannot be empty"))]
    pub id: String,

    #[validate(range(min = 0.0, message = "Weight must be positive"))]
    pub weight: f64,

    #[serde(default)]
    pub score_method: ScoreMethod,

    #[serde(default)]
    #[validate(custom(function = "validate_thresholds"))]
    pub thresholds: Thresholds,
}

fn validate_thresholds(thresholds: &Thresholds) -> Result<(), ValidationError> {
    if thresholds.good >= thresholds.warning && thresholds.warning >= thresholds.critical {
        Ok(())
    } else {
        Err(ValidationError::new("thresholds_order")
            .with_message("Expected good >= warning >= critical".into()))
    }
}

impl QualityDimension {
    pub fn new(id: &str, weight: f64, score_method: ScoreMethod) -> Self {
        Self {
            id: id.to_string(),
            weight,
            score_method,
            thresholds: Thresholds::default(),
        }
    }

    /// Built-in set used when the catalog declares no dimensions.
    pub fn default_set() -> Vec<QualityDimension> {
        vec![
            Self::new(COMPLETENESS, 0.25, ScoreMethod::Ratio),
            Self::new(ACCURACY, 0.20, ScoreMethod::Ratio),
            Self::new(VALIDITY, 0.20, ScoreMethod::Ratio),
            Self::new(UNIQUENESS, 0.15, ScoreMethod::Binary),
            Self::new(CONSISTENCY, 0.10, ScoreMethod::Ratio),
            Self::new(TIMELINESS, 0.10, ScoreMethod::Binary),
        ]
    }

    /// Scores the rules that fall in this dimension.
    /// Nothing evaluated means no evidence of a problem: 100.
    pub fn score(&self, results: &[&RuleResult]) -> DimensionScore {
        let evaluated = results.len();
        let passed = results.iter().filter(|r| r.passed).count();

        let score = match self.score_method {
            ScoreMethod::Binary => {
                if passed == evaluated {
                    100.0
                } else {
                    0.0
                }
            }
            ScoreMethod::Ratio => {
                if evaluated == 0 {
                    100.0
                } else {
                    100.0 * passed as f64 / evaluated as f64
                }
            }
        };

        DimensionScore {
            dimension: self.id.clone(),
            weight: self.weight,
            score_method: self.score_method,
            score,
            status: self.status_for(score),
            rules_evaluated: evaluated,
            rules_passed: passed,
        }
    }

    pub fn status_for(&self, score: f64) -> QualityStatus {
        if score >= self.thresholds.good {
            QualityStatus::Good
        } else if score >= self.thresholds.warning {
            QualityStatus::Warning
        } else {
            QualityStatus::Critical
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityStatus {
    Good,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub dimension: String,
    pub weight: f64,
    pub score_method: ScoreMethod,
    pub score: f64,
    pub status: QualityStatus,
    pub rules_evaluated: usize,
    pub rules_passed: usize,
}

impl DimensionScore {
    pub fn is_covered(&self) -> bool {
        self.rules_evaluated > 0
    }
}

/// Σ(score × weight) / Σ(weight) over dimensions with rule coverage; 0 without weight.
pub fn weighted_overall(scores: &[DimensionScore]) -> f64 {
    let (weighted, weights) = scores
        .iter()
        .filter(|d| d.is_covered())
        .fold((0.0, 0.0), |(acc, w), d| (acc + d.score * d.weight, w + d.weight));

    if weights > 0.0 { weighted / weights } else { 0.0 }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityQualityScore {
    pub contract_id: String,
    pub entity: String,
    pub table: String,
    pub overall_score: f64,
    pub dimensions: Vec<DimensionScore>,
    /// Completeness score against the contract's SLA completeness %.
    pub sla_met: bool,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub column: String,
    pub data_type: String,
    pub total_count: u64,
    pub null_count: u64,
    pub distinct_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,
}

impl ColumnProfile {
    pub fn null_ratio(&self) -> f64 {
        if self.total_count == 0 {
            0.0
        } else {
            self.null_count as f64 / self.total_count as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EntityProfile {
    pub table: String,
    pub row_count: u64,
    pub columns: Vec<ColumnProfile>,
}

impl EntityProfile {
    pub fn empty(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn result(kind: RuleKind, passed: bool) -> RuleResult {
        RuleResult {
            kind,
            field: None,
            passed,
            violation_count: u64::from(!passed),
            total_count: 10,
            details: None,
        }
    }

    fn covered(dimension: &str, weight: f64, score: f64) -> DimensionScore {
        DimensionScore {
            dimension: dimension.into(),
            weight,
            score_method: ScoreMethod::Ratio,
            score,
            status: QualityStatus::Good,
            rules_evaluated: 1,
            rules_passed: 1,
        }
    }

    #[test]
    fn test_binary_dimension_with_one_failure_scores_zero() {
        let dim = QualityDimension::new(UNIQUENESS, 1.0, ScoreMethod::Binary);
        let ok = result(RuleKind::Unique, true);
        let ko = result(RuleKind::Unique, false);
        let score = dim.score(&[&ok, &ko]);
        assert_eq!(score.score, 0.0);
        assert_eq!(score.status, QualityStatus::Critical);
    }

    #[test]
    fn test_ratio_dimension_all_passing_scores_hundred() {
        let dim = QualityDimension::new(COMPLETENESS, 1.0, ScoreMethod::Ratio);
        let a = result(RuleKind::NotNull, true);
        let b = result(RuleKind::NotNull, true);
        assert_eq!(dim.score(&[&a, &b]).score, 100.0);
    }

    #[test]
    fn test_ratio_dimension_without_rules_is_healthy() {
        let dim = QualityDimension::new(ACCURACY, 1.0, ScoreMethod::Ratio);
        let score = dim.score(&[]);
        assert_eq!(score.score, 100.0);
        assert!(!score.is_covered());
    }

    #[test]
    fn test_weighted_overall() {
        let scores = vec![
            covered("a", 0.3, 100.0),
            covered("b", 0.3, 0.0),
            covered("c", 0.2, 100.0),
            covered("d", 0.2, 100.0),
        ];
        let overall = weighted_overall(&scores);
        assert!((overall - 70.0).abs() < 0.5, "got {}", overall);
    }

    #[test]
    fn test_weighted_overall_ignores_uncovered_and_zero_weight() {
        let mut uncovered = covered("a", 0.5, 100.0);
        uncovered.rules_evaluated = 0;
        assert_eq!(weighted_overall(&[uncovered]), 0.0);
        assert_eq!(weighted_overall(&[covered("b", 0.0, 100.0)]), 0.0);
    }

    #[test]
    fn test_status_thresholds() {
        let dim = QualityDimension::new(VALIDITY, 1.0, ScoreMethod::Ratio);
        assert_eq!(dim.status_for(95.0), QualityStatus::Good);
        assert_eq!(dim.status_for(85.0), QualityStatus::Warning);
        assert_eq!(dim.status_for(60.0), QualityStatus::Critical);
        assert_eq!(dim.status_for(10.0), QualityStatus::Critical);
    }

    #[test]
    fn test_unmapped_kind_defaults_to_consistency() {
        assert_eq!(dimension_for(RuleKind::CustomSql), CONSISTENCY);
        assert_eq!(dimension_for(RuleKind::Unknown), CONSISTENCY);
        assert_eq!(dimension_for(RuleKind::NotNull), COMPLETENESS);
    }

    #[test]
    fn test_threshold_validation() {
        let mut dim = QualityDimension::new(VALIDITY, 1.0, ScoreMethod::Ratio);
        assert!(dim.validate().is_ok());
        dim.thresholds.warning = 99.0;
        assert!(dim.validate().is_err());
        dim.thresholds = Thresholds::default();
        dim.weight = -1.0;
        assert!(dim.validate().is_err());
    }
}
