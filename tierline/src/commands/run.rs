// tierline/src/commands/run.rs
//
// USE CASE: Run the pipeline stages.

use anyhow::Context;
use std::path::PathBuf;

use tierline_core::application::{CalculationEngine, StageOrchestrator};
use tierline_core::domain::pipeline::{RunStatus, StageResult, StageStatus};
use tierline_core::infrastructure::fs::write_json;

use crate::commands::{Project, new_table, step_icon};

pub async fn execute(project_dir: PathBuf, stage: Option<String>) -> anyhow::Result<()> {
    let start = std::time::Instant::now();
    let project = Project::load(project_dir)?;

    let connector = project.connector()?;
    println!("   Engine: DuckDB 🦆");
    let snapshots = project.snapshots();
    let store = project.quarantine()?;

    let engine = CalculationEngine::new(&project.catalog, &connector)
        .with_snapshots(&snapshots)
        .with_parameters(project.config.parameters.clone());
    let orchestrator = StageOrchestrator::new(&project.catalog, &connector)
        .with_engine(engine)
        .with_quarantine(&store)
        .with_settings(project.settings());

    let results_path = project.config.run_results_path(&project.root);

    let failed = match stage {
        Some(stage_id) => {
            let result = orchestrator.run_stage(&stage_id).await;
            print_stages(std::slice::from_ref(&result));
            write_json(&results_path, &result)
                .with_context(|| format!("Failed to write {:?}", results_path))?;
            !result.is_completed()
        }
        None => {
            let run = match orchestrator.run_all().await {
                Ok(run) => run,
                Err(e) => {
                    eprintln!("\n💥 CRITICAL PIPELINE ERROR: {}", e);
                    std::process::exit(1);
                }
            };
            print_stages(&run.stages);
            write_json(&results_path, &run)
                .with_context(|| format!("Failed to write {:?}", results_path))?;
            run.status == RunStatus::Partial
        }
    };

    println!("📝 Results written to {}", results_path.display());
    if failed {
        eprintln!("\n❌ FAILURE. Pipeline finished with failed stages.");
        std::process::exit(1);
    }
    println!("\n✨ SUCCESS! Pipeline finished in {:.2?}", start.elapsed());
    Ok(())
}

fn print_stages(stages: &[StageResult]) {
    let mut table = new_table(["Stage", "Status", "Steps", "Quality", "Quarantine", "Duration"]);
    for stage in stages {
        let status = match stage.status {
            StageStatus::Completed => "✅ completed",
            StageStatus::Failed => "❌ failed",
            StageStatus::Running => "running",
            StageStatus::Pending => "pending",
        };
        let steps: Vec<String> = stage
            .steps
            .iter()
            .map(|s| format!("{} {}", step_icon(s.status), s.name))
            .collect();
        let quality = stage
            .validation
            .as_ref()
            .map(|v| format!("{:.1}", v.quality_score))
            .unwrap_or_else(|| "-".into());
        table.add_row(vec![
            stage.stage_id.clone(),
            status.to_string(),
            steps.join("\n"),
            quality,
            stage.quarantine_id.clone().unwrap_or_else(|| "-".into()),
            format!("{} ms", stage.duration_ms),
        ]);
    }
    println!("{table}");

    for stage in stages {
        if let Some(error) = &stage.error {
            eprintln!("❌ {}: {}", stage.stage_id, error);
        }
    }
}
