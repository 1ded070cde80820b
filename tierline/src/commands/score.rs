// tierline/src/commands/score.rs
//
// USE CASE: Score an entity across the quality dimensions.

use std::path::PathBuf;

use tierline_core::application::QualityScorer;
use tierline_core::domain::QualityStatus;

use crate::commands::{Project, new_table};

pub async fn execute(
    project_dir: PathBuf,
    contract_id: String,
    table: Option<String>,
) -> anyhow::Result<()> {
    let project = Project::load(project_dir)?;
    let contract = project.contract(&contract_id)?;
    let table = project.resolve_table(&contract, table);
    let connector = project.connector()?;

    let score = QualityScorer::new(&project.catalog, &connector)
        .score_entity(&contract, &table)
        .await?;

    println!("📊 Quality of '{}' ({})", score.entity, score.table);
    let mut grid = new_table(["Dimension", "Weight", "Method", "Rules", "Score", "Status"]);
    for dim in &score.dimensions {
        let status = match dim.status {
            QualityStatus::Good => "🟢 good",
            QualityStatus::Warning => "🟠 warning",
            QualityStatus::Critical => "🔴 critical",
        };
        grid.add_row(vec![
            dim.dimension.clone(),
            format!("{:.2}", dim.weight),
            format!("{:?}", dim.score_method).to_lowercase(),
            format!("{}/{}", dim.rules_passed, dim.rules_evaluated),
            format!("{:.1}", dim.score),
            status.to_string(),
        ]);
    }
    println!("{grid}");
    println!("   Overall: {:.1}", score.overall_score);
    println!(
        "   SLA ({}% complete): {}",
        contract.sla.completeness_pct,
        if score.sla_met { "✅ met" } else { "❌ missed" }
    );
    Ok(())
}
