// tierline/src/commands/dag.rs
//
// USE CASE: Show the calculation execution order.

use std::path::PathBuf;

use tierline_core::application::CalculationEngine;
use tierline_core::infrastructure::adapters::DuckDBConnector;

use crate::commands::{Project, new_table};

pub fn execute(project_dir: PathBuf) -> anyhow::Result<()> {
    let project = Project::load(project_dir)?;
    // Ordering needs no data: an in-memory connector is enough
    let connector = DuckDBConnector::in_memory()?;
    let engine = CalculationEngine::new(&project.catalog, &connector);

    let ordered = match engine.build_dag() {
        Ok(ordered) => ordered,
        Err(e) => {
            eprintln!("❌ Invalid calculation graph: {}", e);
            std::process::exit(1);
        }
    };

    println!("🧠 {} calculation(s) in execution order:", ordered.len());
    let mut table = new_table(["#", "Calculation", "Layer", "Depends on", "Output"]);
    for (i, calc) in ordered.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            calc.id.clone(),
            calc.layer.to_string(),
            calc.depends_on.join(", "),
            calc.output_table.clone(),
        ]);
    }
    println!("{table}");
    Ok(())
}
