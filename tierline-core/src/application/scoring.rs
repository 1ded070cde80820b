// tierline-core/src/application/scoring.rs

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::application::validation::ContractValidator;
use crate::domain::compiler::{quote_ident, quote_table};
use crate::domain::contract::{DataContract, RuleResult, ValidationResult};
use crate::domain::ports::Catalog;
use crate::domain::quality::{
    COMPLETENESS, ColumnProfile, EntityProfile, EntityQualityScore, QualityDimension,
    dimension_for, weighted_overall,
};
use crate::domain::value::SqlValue;
use crate::error::TierlineError;
use crate::ports::connector::Connector;

pub struct QualityScorer<'a> {
    catalog: &'a dyn Catalog,
    connector: &'a dyn Connector,
}

impl<'a> QualityScorer<'a> {
    pub fn new(catalog: &'a dyn Catalog, connector: &'a dyn Connector) -> Self {
        Self { catalog, connector }
    }

    /// Catalog dimensions, or the built-in set when the catalog has none.
    pub fn dimensions(&self) -> Result<Vec<QualityDimension>, TierlineError> {
        let dimensions = self.catalog.load_quality_dimensions()?;
        Ok(if dimensions.is_empty() {
            QualityDimension::default_set()
        } else {
            dimensions
        })
    }

    /// Validates `table` against the contract and scores the outcome.
    #[instrument(skip(self, contract), fields(contract = %contract.id))]
    pub async fn score_entity(
        &self,
        contract: &DataContract,
        table: &str,
    ) -> Result<EntityQualityScore, TierlineError> {
        let validation = ContractValidator::new(self.connector)
            .validate(contract, table)
            .await;
        self.score_validation(contract, &validation)
    }

    /// Scores an existing validation. Recomputed on every call.
    pub fn score_validation(
        &self,
        contract: &DataContract,
        validation: &ValidationResult,
    ) -> Result<EntityQualityScore, TierlineError> {
        let dimensions = self.dimensions()?;

        let scores: Vec<_> = dimensions
            .iter()
            .map(|dim| {
                let in_dimension: Vec<&RuleResult> = validation
                    .rule_results
                    .iter()
                    .filter(|r| dimension_for(r.kind) == dim.id)
                    .collect();
                dim.score(&in_dimension)
            })
            .collect();

        let overall_score = weighted_overall(&scores);
        let completeness = scores
            .iter()
            .find(|s| s.dimension == COMPLETENESS)
            .map_or(100.0, |s| s.score);

        info!(
            overall = overall_score,
            "📊 Quality score for '{}': {:.1}", contract.entity, overall_score
        );

        Ok(EntityQualityScore {
            contract_id: contract.id.clone(),
            entity: contract.entity.clone(),
            table: validation.table.clone(),
            overall_score,
            dimensions: scores,
            sla_met: completeness >= contract.sla.completeness_pct,
            computed_at: Utc::now(),
        })
    }

    /// Per-column statistics. Any engine error yields an empty profile.
    #[instrument(skip(self))]
    pub async fn profile_entity(&self, table: &str) -> EntityProfile {
        match self.try_profile(table).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!("⚠️  Profiling of '{}' failed: {}", table, e);
                EntityProfile::empty(table)
            }
        }
    }

    async fn try_profile(&self, table: &str) -> Result<EntityProfile, TierlineError> {
        let source = quote_table(table)?;
        let columns = self.connector.fetch_columns(table).await?;
        let row_count = self
            .connector
            .query_scalar(&format!("SELECT COUNT(*) FROM {}", source), &[])
            .await?;

        let mut profiles = Vec::with_capacity(columns.len());
        for column in columns {
            let col = quote_ident(&column.name)?;
            let sql = format!(
                "SELECT COUNT(*), COUNT(*) - COUNT({c}), COUNT(DISTINCT {c}), \
                 CAST(MIN({c}) AS VARCHAR), CAST(MAX({c}) AS VARCHAR) FROM {}",
                source,
                c = col
            );
            let row = self.connector.query_row(&sql, &[]).await?;
            let count = |i: usize| {
                row.get(i)
                    .and_then(SqlValue::as_i64)
                    .and_then(|v| u64::try_from(v).ok())
                    .unwrap_or(0)
            };
            profiles.push(ColumnProfile {
                column: column.name.clone(),
                data_type: column.data_type.clone(),
                total_count: count(0),
                null_count: count(1),
                distinct_count: count(2),
                min: row.get(3).and_then(SqlValue::as_text),
                max: row.get(4).and_then(SqlValue::as_text),
            });
        }

        Ok(EntityProfile {
            table: table.to_string(),
            row_count: u64::try_from(row_count).unwrap_or(0),
            columns: profiles,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::contract::{QualityRule, Sla};
    use crate::domain::quality::{ACCURACY, QualityStatus, ScoreMethod, UNIQUENESS, VALIDITY};
    use crate::infrastructure::adapters::DuckDBConnector;
    use crate::infrastructure::catalog::InMemoryCatalog;
    use anyhow::Result;

    async fn products() -> Result<DuckDBConnector> {
        let connector = DuckDBConnector::in_memory()?;
        connector
            .execute_batch(
                "CREATE TABLE products (sku VARCHAR, price DOUBLE, category VARCHAR); \
                 INSERT INTO products VALUES \
                   ('p1', 10.0, 'food'), ('p2', -1.0, 'food'), ('p3', 30.0, 'toys'), ('p4', NULL, 'toys');",
            )
            .await?;
        Ok(connector)
    }

    fn contract() -> DataContract {
        DataContract {
            id: "products_gold".into(),
            source_tier: "silver".into(),
            target_tier: "gold".into(),
            entity: "products".into(),
            rules: vec![
                QualityRule::NotNull {
                    fields: vec!["sku".into()],
                },
                QualityRule::RangeCheck {
                    field: "price".into(),
                    min: Some(0.0),
                    max: None,
                },
                QualityRule::EnumCheck {
                    field: "category".into(),
                    allowed: vec!["food".into(), "toys".into()],
                },
                QualityRule::Unique {
                    field: "sku".into(),
                },
            ],
            sla: Sla::default(),
        }
    }

    #[tokio::test]
    async fn test_weighted_overall_seventy() -> Result<()> {
        let connector = products().await?;
        let catalog = InMemoryCatalog::new()
            .with_dimension(QualityDimension::new(COMPLETENESS, 0.3, ScoreMethod::Ratio))
            .with_dimension(QualityDimension::new(ACCURACY, 0.3, ScoreMethod::Ratio))
            .with_dimension(QualityDimension::new(VALIDITY, 0.2, ScoreMethod::Ratio))
            .with_dimension(QualityDimension::new(UNIQUENESS, 0.2, ScoreMethod::Binary));
        let scorer = QualityScorer::new(&catalog, &connector);

        let score = scorer.score_entity(&contract(), "products").await?;
        let by_dim: Vec<f64> = score.dimensions.iter().map(|d| d.score).collect();
        assert_eq!(by_dim, vec![100.0, 0.0, 100.0, 100.0]);
        assert!((score.overall_score - 70.0).abs() < 1e-9);
        assert!(score.sla_met);
        assert_eq!(score.dimensions[1].status, QualityStatus::Critical);
        Ok(())
    }

    #[tokio::test]
    async fn test_default_dimensions_when_catalog_has_none() -> Result<()> {
        let connector = products().await?;
        let catalog = InMemoryCatalog::new();
        let scorer = QualityScorer::new(&catalog, &connector);

        let score = scorer.score_entity(&contract(), "products").await?;
        assert_eq!(score.dimensions.len(), 6);
        // consistency and timeliness have no rules: excluded from the overall
        let covered: Vec<&str> = score
            .dimensions
            .iter()
            .filter(|d| d.is_covered())
            .map(|d| d.dimension.as_str())
            .collect();
        assert_eq!(covered, vec![COMPLETENESS, ACCURACY, VALIDITY, UNIQUENESS]);
        // (25 + 0 + 20 + 15) / 0.8
        assert!((score.overall_score - 75.0).abs() < 1e-9);
        Ok(())
    }

    #[tokio::test]
    async fn test_sla_not_met() -> Result<()> {
        let connector = products().await?;
        let catalog = InMemoryCatalog::new();
        let scorer = QualityScorer::new(&catalog, &connector);

        let mut contract = contract();
        contract.rules = vec![
            QualityRule::NotNull {
                fields: vec!["sku".into()],
            },
            QualityRule::NotNull {
                fields: vec!["price".into()],
            },
        ];
        let score = scorer.score_entity(&contract, "products").await?;
        assert_eq!(score.dimensions[0].score, 50.0);
        assert!(!score.sla_met);
        Ok(())
    }

    #[tokio::test]
    async fn test_profile_entity() -> Result<()> {
        let connector = products().await?;
        let catalog = InMemoryCatalog::new();
        let scorer = QualityScorer::new(&catalog, &connector);

        let profile = scorer.profile_entity("products").await;
        assert_eq!(profile.row_count, 4);
        assert_eq!(profile.columns.len(), 3);

        let price = &profile.columns[1];
        assert_eq!(price.column, "price");
        assert_eq!(price.null_count, 1);
        assert_eq!(price.distinct_count, 3);
        assert_eq!(price.min.as_deref(), Some("-1.0"));
        assert_eq!(price.null_ratio(), 0.25);

        let category = &profile.columns[2];
        assert_eq!(category.distinct_count, 2);
        assert_eq!(category.max.as_deref(), Some("toys"));
        Ok(())
    }

    #[tokio::test]
    async fn test_profile_missing_table_is_empty() -> Result<()> {
        let connector = products().await?;
        let catalog = InMemoryCatalog::new();
        let scorer = QualityScorer::new(&catalog, &connector);

        let profile = scorer.profile_entity("ghost").await;
        assert_eq!(profile, EntityProfile::empty("ghost"));
        Ok(())
    }
}
