// tierline/src/commands/validate.rs
//
// USE CASE: Check a table against a data contract.

use std::path::PathBuf;

use tierline_core::application::ContractValidator;

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

    println!("🛡️  Validating '{}' against '{}'", table, contract.id);
    let result = ContractValidator::new(&connector)
        .validate(&contract, &table)
        .await;

    let mut grid = new_table(["Rule", "Field", "Result", "Violations", "Details"]);
    for rule in &result.rule_results {
        grid.add_row(vec![
            rule.kind.to_string(),
            rule.field.clone().unwrap_or_default(),
            if rule.passed { "✅ pass" } else { "❌ fail" }.to_string(),
            format!("{} / {}", rule.violation_count, rule.total_count),
            rule.details.clone().unwrap_or_default(),
        ]);
    }
    println!("{grid}");
    println!("   Quality score: {:.1}", result.quality_score);

    if !result.passed {
        eprintln!(
            "\n❌ Contract '{}' failed: {} rule(s) violated.",
            contract.id,
            result.failed_rules().len()
        );
        std::process::exit(1);
    }
    println!("\n✨ Contract '{}' passed.", contract.id);
    Ok(())
}
