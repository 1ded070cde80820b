// tierline-core/src/application/validation.rs

use chrono::{Duration, Utc};
use regex::Regex;
use tracing::{debug, info, instrument, warn};

// Imports Hexagonaux
use crate::domain::compiler::{parse_reference, quote_ident, quote_table, validate_expression};
use crate::domain::contract::{DataContract, QualityRule, RuleResult, ValidationResult};
use crate::domain::value::SqlValue;
use crate::error::TierlineError;
use crate::ports::connector::{Connector, SampleRow};

/// Checks a materialized table against a data contract.
///
/// Each rule is one aggregate query returning `(violations, total)`.
/// Row-level rules share their predicate with [`Self::sample_violations`].
/// A rule that cannot be evaluated is reported as failed; `validate`
/// itself never errors.
pub struct ContractValidator<'a> {
    connector: &'a dyn Connector,
}

impl<'a> ContractValidator<'a> {
    pub fn new(connector: &'a dyn Connector) -> Self {
        Self { connector }
    }

    #[instrument(skip(self, contract), fields(contract = %contract.id, rules = contract.rules.len()))]
    pub async fn validate(&self, contract: &DataContract, table: &str) -> ValidationResult {
        let mut results = Vec::with_capacity(contract.rules.len());

        for rule in &contract.rules {
            let result = match self.evaluate(rule, contract, table).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(kind = %rule.kind(), "⚠️  Rule could not be evaluated: {}", e);
                    RuleResult::errored(rule, e.to_string())
                }
            };
            debug!(
                kind = %result.kind,
                passed = result.passed,
                violations = result.violation_count,
                "Rule evaluated"
            );
            results.push(result);
        }

        let validation = ValidationResult::from_results(contract, table, results);
        info!(
            passed = validation.passed,
            score = validation.quality_score,
            "🧪 Contract '{}' checked on {}",
            contract.id,
            table
        );
        validation
    }

    /// Up to `limit` rows breaking any failed row-level rule of `validation`.
    ///
    /// `None` when no failed rule points at individual rows (unique,
    /// freshness, custom_sql, or rules that could not be evaluated).
    #[instrument(skip(self, contract, validation), fields(table = %validation.table))]
    pub async fn sample_violations(
        &self,
        contract: &DataContract,
        validation: &ValidationResult,
        limit: usize,
    ) -> Result<Option<Vec<SampleRow>>, TierlineError> {
        let mut conditions = Vec::new();
        let mut params = Vec::new();
        for (rule, result) in contract.rules.iter().zip(&validation.rule_results) {
            if result.passed || result.violation_count == 0 {
                continue;
            }
            if let Check::Rows {
                condition,
                params: bound,
            } = row_check(rule)?
            {
                conditions.push(format!("({})", condition));
                params.extend(bound);
            }
        }
        if conditions.is_empty() {
            return Ok(None);
        }

        let rows = self
            .connector
            .fetch_sample_where(&validation.table, &conditions.join(" OR "), &params, limit)
            .await?;
        debug!(rules = conditions.len(), sampled = rows.len(), "Violating rows sampled");
        Ok(Some(rows))
    }

    async fn evaluate(
        &self,
        rule: &QualityRule,
        contract: &DataContract,
        table: &str,
    ) -> Result<RuleResult, TierlineError> {
        let source = quote_table(table)?;

        match row_check(rule)? {
            Check::Invalid(reason) => return Ok(RuleResult::errored(rule, reason)),
            Check::Rows { condition, params } => {
                return self.count_where(rule, &source, &condition, &params).await;
            }
            Check::Aggregate => {}
        }

        match rule {
            QualityRule::Unique { field } => {
                let column = quote_ident(field)?;
                let sql = format!(
                    "SELECT COUNT({col}) - COUNT(DISTINCT {col}), COUNT(*) FROM {}",
                    source,
                    col = column
                );
                let (violations, total) = self.counts(&sql, &[]).await?;
                Ok(RuleResult::from_counts(rule, violations, total))
            }

            QualityRule::Freshness {
                field,
                max_age_minutes,
            } => {
                let threshold = max_age_minutes.unwrap_or(contract.sla.freshness_minutes);
                let cutoff = i64::try_from(threshold)
                    .ok()
                    .and_then(Duration::try_minutes)
                    .and_then(|age| Utc::now().checked_sub_signed(age))
                    .map(|c| c.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "0001-01-01 00:00:00".to_string());
                let column = quote_ident(field)?;
                let sql = format!(
                    "SELECT CASE WHEN MAX({col}) IS NULL \
                       OR CAST(MAX({col}) AS TIMESTAMP) < CAST(? AS TIMESTAMP) THEN 1 ELSE 0 END, \
                     COUNT(*) FROM {}",
                    source,
                    col = column
                );
                let params = [SqlValue::Text(cutoff)];
                let (stale, total) = self.counts(&sql, &params).await?;
                let result = RuleResult::from_counts(rule, stale, total);
                Ok(if result.passed {
                    result
                } else {
                    result.with_details(format!(
                        "no value of '{}' newer than {} minutes",
                        field, threshold
                    ))
                })
            }

            QualityRule::CustomSql {
                expression,
                description,
            } => {
                let Some(expression) = expression.as_deref().filter(|e| !e.trim().is_empty())
                else {
                    return Ok(RuleResult::errored(rule, "custom_sql rule has no expression"));
                };
                if let Err(e) = validate_expression(expression) {
                    return Ok(RuleResult::errored(rule, e.to_string()));
                }
                let sql = format!(
                    "SELECT CAST(({}) AS BIGINT), COUNT(*) FROM {}",
                    expression, source
                );
                let (violations, total) = self.counts(&sql, &[]).await?;
                let result = RuleResult::from_counts(rule, violations, total);
                Ok(match description {
                    Some(d) => result.with_details(d.clone()),
                    None => result,
                })
            }

            QualityRule::Unknown => {
                Ok(RuleResult::from_counts(rule, 0, 0)
                    .with_details("unrecognised rule kind, passed by default"))
            }

            // Row-level kinds were handled above
            _ => Ok(RuleResult::errored(rule, "rule has no aggregate form")),
        }
    }

    async fn count_where(
        &self,
        rule: &QualityRule,
        source: &str,
        condition: &str,
        params: &[SqlValue],
    ) -> Result<RuleResult, TierlineError> {
        let sql = format!(
            "SELECT COUNT(*) FILTER (WHERE {}), COUNT(*) FROM {} AS src",
            condition, source
        );
        let (violations, total) = self.counts(&sql, params).await?;
        Ok(RuleResult::from_counts(rule, violations, total))
    }

    /// `(violations, total)`; negative or NULL violations read as 0.
    async fn counts(&self, sql: &str, params: &[SqlValue]) -> Result<(u64, u64), TierlineError> {
        let row = self.connector.query_row(sql, params).await?;
        let read = |i: usize| {
            row.get(i)
                .and_then(SqlValue::as_i64)
                .map(|v| u64::try_from(v).unwrap_or(0))
                .unwrap_or(0)
        };
        Ok((read(0), read(1)))
    }
}

/// How a rule is counted.
enum Check {
    /// A per-row violation test over the table aliased as `src`.
    Rows {
        condition: String,
        params: Vec<SqlValue>,
    },
    /// Table-level: no single row is at fault.
    Aggregate,
    /// The rule cannot be evaluated as written.
    Invalid(String),
}

fn row_check(rule: &QualityRule) -> Result<Check, TierlineError> {
    let check = match rule {
        QualityRule::NotNull { fields } => {
            if fields.is_empty() {
                return Ok(Check::Invalid("not_null rule lists no fields".into()));
            }
            let condition = fields
                .iter()
                .map(|f| Ok(format!("{} IS NULL", quote_ident(f)?)))
                .collect::<Result<Vec<_>, TierlineError>>()?
                .join(" OR ");
            Check::Rows {
                condition,
                params: Vec::new(),
            }
        }

        QualityRule::RangeCheck { field, min, max } => {
            let column = quote_ident(field)?;
            let mut bounds = Vec::new();
            let mut params = Vec::new();
            if let Some(min) = min {
                bounds.push(format!("{} < ?", column));
                params.push(SqlValue::Float(*min));
            }
            if let Some(max) = max {
                bounds.push(format!("{} > ?", column));
                params.push(SqlValue::Float(*max));
            }
            if bounds.is_empty() {
                // No bound, nothing can be out of range
                bounds.push("FALSE".to_string());
            }
            Check::Rows {
                condition: format!("{} IS NOT NULL AND ({})", column, bounds.join(" OR ")),
                params,
            }
        }

        QualityRule::EnumCheck { field, allowed } => {
            let column = quote_ident(field)?;
            let condition = if allowed.is_empty() {
                format!("{} IS NOT NULL", column)
            } else {
                let placeholders = vec!["?"; allowed.len()].join(", ");
                format!(
                    "{col} IS NOT NULL AND CAST({col} AS VARCHAR) NOT IN ({})",
                    placeholders,
                    col = column
                )
            };
            Check::Rows {
                condition,
                params: allowed.iter().map(|v| SqlValue::Text(v.clone())).collect(),
            }
        }

        QualityRule::RegexMatch { field, pattern } => {
            if let Err(e) = Regex::new(pattern) {
                return Ok(Check::Invalid(format!(
                    "invalid pattern '{}': {}",
                    pattern, e
                )));
            }
            let column = quote_ident(field)?;
            Check::Rows {
                condition: format!(
                    "{col} IS NOT NULL AND NOT regexp_matches(CAST({col} AS VARCHAR), ?)",
                    col = column
                ),
                params: vec![SqlValue::Text(pattern.clone())],
            }
        }

        QualityRule::ReferentialIntegrity { field, reference } => {
            let (ref_table, ref_column) = match parse_reference(reference) {
                Ok(parts) => parts,
                Err(e) => return Ok(Check::Invalid(e.to_string())),
            };
            let column = quote_ident(field)?;
            Check::Rows {
                condition: format!(
                    "src.{col} IS NOT NULL AND NOT EXISTS (SELECT 1 FROM {} AS ref WHERE ref.{} = src.{col})",
                    quote_table(&ref_table)?,
                    quote_ident(&ref_column)?,
                    col = column
                ),
                params: Vec::new(),
            }
        }

        QualityRule::Unique { .. }
        | QualityRule::Freshness { .. }
        | QualityRule::CustomSql { .. }
        | QualityRule::Unknown => Check::Aggregate,
    };
    Ok(check)
}
