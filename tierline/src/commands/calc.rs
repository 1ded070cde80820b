// tierline/src/commands/calc.rs
//
// USE CASE: Run calculations outside of a pipeline stage.

use std::path::PathBuf;

use tierline_core::application::CalculationEngine;
use tierline_core::domain::pipeline::StepStatus;

use crate::commands::{Project, new_table, step_icon};

pub async fn execute(project_dir: PathBuf, select: Option<String>) -> anyhow::Result<()> {
    let start = std::time::Instant::now();
    let project = Project::load(project_dir)?;
    let connector = project.connector()?;
    let snapshots = project.snapshots();

    let engine = CalculationEngine::new(&project.catalog, &connector)
        .with_snapshots(&snapshots)
        .with_parameters(project.config.parameters.clone());

    let report = match &select {
        Some(id) => engine.run_one(id).await,
        None => engine.run_all().await,
    };
    let report = match report {
        Ok(report) => report,
        Err(e) => {
            eprintln!("\n💥 {}", e);
            std::process::exit(1);
        }
    };

    let mut table = new_table(["Calculation", "Status", "Rows", "Output", "Duration"]);
    for outcome in &report.outcomes {
        table.add_row(vec![
            format!("{} {}", step_icon(outcome.status), outcome.id),
            outcome
                .error
                .clone()
                .unwrap_or_else(|| "ok".to_string()),
            outcome
                .row_count
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".into()),
            outcome.output_table.clone(),
            format!("{} ms", outcome.duration_ms),
        ]);
    }
    println!("{table}");

    if !report.is_success() {
        eprintln!(
            "\n❌ FAILURE. {} failed, {} skipped.",
            report.count(StepStatus::Failed),
            report.count(StepStatus::Skipped)
        );
        std::process::exit(1);
    }
    println!(
        "\n✨ SUCCESS! {} calculation(s) in {:.2?}",
        report.outcomes.len(),
        start.elapsed()
    );
    Ok(())
}
