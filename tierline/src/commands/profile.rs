// tierline/src/commands/profile.rs
//
// USE CASE: Column statistics for one table.

use std::path::PathBuf;

use tierline_core::application::QualityScorer;

use crate::commands::{Project, new_table};

pub async fn execute(project_dir: PathBuf, table: String) -> anyhow::Result<()> {
    let project = Project::load(project_dir)?;
    let connector = project.connector()?;

    let profile = QualityScorer::new(&project.catalog, &connector)
        .profile_entity(&table)
        .await;

    if profile.columns.is_empty() {
        anyhow::bail!(
            "❌ Nothing to profile in '{}'\n👉 Have you run 'tierline run'?",
            table
        );
    }

    println!("\n🔍 Profile of '{}' ({} rows)", profile.table, profile.row_count);
    let mut grid = new_table(["Column", "Type", "Nulls", "Null %", "Distinct", "Min", "Max"]);
    for col in &profile.columns {
        grid.add_row(vec![
            col.column.clone(),
            col.data_type.clone(),
            col.null_count.to_string(),
            format!("{:.1}", col.null_ratio() * 100.0),
            col.distinct_count.to_string(),
            col.min.clone().unwrap_or_default(),
            col.max.clone().unwrap_or_default(),
        ]);
    }
    println!("{grid}");
    Ok(())
}
