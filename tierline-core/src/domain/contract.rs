// tierline-core/src/domain/contract.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataContract {
    pub id: String,
    pub source_tier: String,
    pub target_tier: String,
    pub entity: String,

    #[serde(default)]
    pub rules: Vec<QualityRule>,

    #[serde(default)]
    pub sla: Sla,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sla {
    #[serde(default = "default_freshness_minutes")]
    pub freshness_minutes: u64,
    #[serde(default = "default_completeness_pct")]
    pub completeness_pct: f64,
}

impl Default for Sla {
    fn default() -> Self {
        Self {
            freshness_minutes: default_freshness_minutes(),
            completeness_pct: default_completeness_pct(),
        }
    }
}

fn default_freshness_minutes() -> u64 {
    1440
}
fn default_completeness_pct() -> f64 {
    95.0
}

/// Declarative quality rule, tagged by `kind`.
///
/// Any kind this build does not know deserializes to `Unknown` and passes,
/// so contracts written for newer rule kinds keep validating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QualityRule {
    NotNull {
        fields: Vec<String>,
    },
    RangeCheck {
        field: String,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    EnumCheck {
        field: String,
        #[serde(default)]
        allowed: Vec<String>,
    },
    Unique {
        field: String,
    },
    RegexMatch {
        field: String,
        pattern: String,
    },
    ReferentialIntegrity {
        field: String,
        /// `table.column`
        reference: String,
    },
    Freshness {
        field: String,
        #[serde(default)]
        max_age_minutes: Option<u64>,
    },
    CustomSql {
        #[serde(default)]
        expression: Option<String>,
        #[serde(default)]
        description: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl QualityRule {
    pub fn kind(&self) -> RuleKind {
        match self {
            QualityRule::NotNull { .. } => RuleKind::NotNull,
            QualityRule::RangeCheck { .. } => RuleKind::RangeCheck,
            QualityRule::EnumCheck { .. } => RuleKind::EnumCheck,
            QualityRule::Unique { .. } => RuleKind::Unique,
            QualityRule::RegexMatch { .. } => RuleKind::RegexMatch,
            QualityRule::ReferentialIntegrity { .. } => RuleKind::ReferentialIntegrity,
            QualityRule::Freshness { .. } => RuleKind::Freshness,
            QualityRule::CustomSql { .. } => RuleKind::CustomSql,
            QualityRule::Unknown => RuleKind::Unknown,
        }
    }

    /// Target field as reported in results (`a,b` for multi-field rules).
    pub fn field_label(&self) -> Option<String> {
        match self {
            QualityRule::NotNull { fields } => Some(fields.join(",")),
            QualityRule::RangeCheck { field, .. }
            | QualityRule::EnumCheck { field, .. }
            | QualityRule::Unique { field }
            | QualityRule::RegexMatch { field, .. }
            | QualityRule::ReferentialIntegrity { field, .. }
            | QualityRule::Freshness { field, .. } => Some(field.clone()),
            QualityRule::CustomSql { .. } | QualityRule::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    NotNull,
    RangeCheck,
    EnumCheck,
    Unique,
    RegexMatch,
    ReferentialIntegrity,
    Freshness,
    CustomSql,
    Unknown,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::NotNull => "not_null",
            RuleKind::RangeCheck => "range_check",
            RuleKind::EnumCheck => "enum_check",
            RuleKind::Unique => "unique",
            RuleKind::RegexMatch => "regex_match",
            RuleKind::ReferentialIntegrity => "referential_integrity",
            RuleKind::Freshness => "freshness",
            RuleKind::CustomSql => "custom_sql",
            RuleKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    pub kind: RuleKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub passed: bool,
    pub violation_count: u64,
    pub total_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl RuleResult {
    pub fn from_counts(rule: &QualityRule, violations: u64, total: u64) -> Self {
        Self {
            kind: rule.kind(),
            field: rule.field_label(),
            passed: violations == 0,
            violation_count: violations,
            total_count: total,
            details: None,
        }
    }

    /// A rule that could not be evaluated counts as failed, with the reason attached.
    pub fn errored(rule: &QualityRule, reason: impl Into<String>) -> Self {
        Self {
            kind: rule.kind(),
            field: rule.field_label(),
            passed: false,
            violation_count: 0,
            total_count: 0,
            details: Some(reason.into()),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub contract_id: String,
    pub entity: String,
    pub table: String,
    pub passed: bool,
    pub quality_score: f64,
    pub rule_results: Vec<RuleResult>,
    pub validated_at: DateTime<Utc>,
}

impl ValidationResult {
    /// Unweighted: 100 × passed / total, 100 with no rules.
    pub fn from_results(contract: &DataContract, table: &str, rule_results: Vec<RuleResult>) -> Self {
        let total = rule_results.len();
        let passed_count = rule_results.iter().filter(|r| r.passed).count();
        let quality_score = if total == 0 {
            100.0
        } else {
            100.0 * passed_count as f64 / total as f64
        };

        Self {
            contract_id: contract.id.clone(),
            entity: contract.entity.clone(),
            table: table.to_string(),
            passed: passed_count == total,
            quality_score,
            rule_results,
            validated_at: Utc::now(),
        }
    }

    pub fn failed_rules(&self) -> Vec<RuleResult> {
        self.rule_results
            .iter()
            .filter(|r| !r.passed)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_deserialization_with_every_kind() {
        let yaml = r#"
id: orders_silver
source_tier: bronze
target_tier: silver
entity: orders
sla:
  freshness_minutes: 60
rules:
  - kind: not_null
    fields: [order_id, customer_id]
  - kind: range_check
    field: amount
    min: 0
  - kind: enum_check
    field: status
    allowed: [open, shipped]
  - kind: unique
    field: order_id
  - kind: regex_match
    field: email
    pattern: "^[^@]+@[^@]+$"
  - kind: referential_integrity
    field: customer_id
    reference: customers.id
  - kind: freshness
    field: updated_at
  - kind: custom_sql
    expression: "SUM(CASE WHEN amount > 1e6 THEN 1 ELSE 0 END)"
  - kind: statistical_drift
    field: amount
    sigma: 3
"#;
        let contract: DataContract = serde_yaml::from_str(yaml).expect("Should deserialize");
        assert_eq!(contract.rules.len(), 9);
        assert_eq!(contract.sla.freshness_minutes, 60);
        assert_eq!(contract.sla.completeness_pct, 95.0);
        assert_eq!(contract.rules[8], QualityRule::Unknown);
        assert_eq!(
            contract.rules[1],
            QualityRule::RangeCheck {
                field: "amount".into(),
                min: Some(0.0),
                max: None
            }
        );
        assert_eq!(contract.rules[0].field_label().as_deref(), Some("order_id,customer_id"));
    }

    #[test]
    fn test_score_counts_rules_not_weights() {
        let contract = DataContract {
            id: "c".into(),
            source_tier: "bronze".into(),
            target_tier: "silver".into(),
            entity: "orders".into(),
            rules: vec![],
            sla: Sla::default(),
        };
        let rule = QualityRule::Unique { field: "id".into() };
        let results = vec![
            RuleResult::from_counts(&rule, 0, 10),
            RuleResult::from_counts(&rule, 2, 10),
        ];
        let validation = ValidationResult::from_results(&contract, "silver_orders", results);
        assert!(!validation.passed);
        assert_eq!(validation.quality_score, 50.0);
        assert_eq!(validation.failed_rules().len(), 1);

        let empty = ValidationResult::from_results(&contract, "silver_orders", vec![]);
        assert!(empty.passed);
        assert_eq!(empty.quality_score, 100.0);
    }
}
