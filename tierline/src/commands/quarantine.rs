// tierline/src/commands/quarantine.rs
//
// USE CASE: Review quarantined data.

use std::path::PathBuf;

use tierline_core::application::QuarantineStore;
use tierline_core::domain::{QuarantineFilter, QuarantineRecord};

use crate::cli::QuarantineAction;
use crate::commands::{Project, new_table};

pub fn execute(project_dir: PathBuf, action: QuarantineAction) -> anyhow::Result<()> {
    let project = Project::load(project_dir)?;
    let store = project.quarantine()?;

    match action {
        QuarantineAction::List {
            entity,
            status,
            source_tier,
        } => list(
            &store,
            &QuarantineFilter {
                entity,
                status: status.map(Into::into),
                source_tier,
            },
        ),
        QuarantineAction::Retry { id } => report(&id, "🔁 Retry requested", store.retry(&id)?),
        QuarantineAction::Override { id, notes } => report(
            &id,
            "🟢 Overridden",
            store.override_record(&id, &notes)?,
        ),
        QuarantineAction::Discard { id } => report(&id, "🗑️  Discarded", store.discard(&id)?),
        QuarantineAction::Summary => summary(&store),
    }
}

fn list(store: &QuarantineStore, filter: &QuarantineFilter) -> anyhow::Result<()> {
    let records = store.list_records(filter)?;
    println!("🚧 {} quarantine record(s)", records.len());
    if records.is_empty() {
        return Ok(());
    }

    let mut grid = new_table(["Id", "Entity", "Tiers", "Status", "Retries", "Failed rules", "Created"]);
    for record in &records {
        let rules: Vec<String> = record
            .failed_rules
            .iter()
            .map(|r| match &r.field {
                Some(field) => format!("{}({})", r.kind, field),
                None => r.kind.to_string(),
            })
            .collect();
        grid.add_row(vec![
            record.id.clone(),
            record.entity.clone(),
            record.tier_transition(),
            record.status.to_string(),
            record.retry_count.to_string(),
            rules.join(", "),
            record.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }
    println!("{grid}");
    Ok(())
}

fn report(id: &str, verb: &str, record: Option<QuarantineRecord>) -> anyhow::Result<()> {
    match record {
        Some(record) => {
            println!(
                "{} '{}' ({}, now {})",
                verb, record.id, record.entity, record.status
            );
            Ok(())
        }
        None => {
            eprintln!("❌ Quarantine record '{}' not found", id);
            std::process::exit(1);
        }
    }
}

fn summary(store: &QuarantineStore) -> anyhow::Result<()> {
    let summary = store.summary()?;
    println!("🚧 {} quarantine record(s)", summary.total);

    let sections = [
        ("Entity", &summary.by_entity),
        ("Transition", &summary.by_transition),
        ("Rule kind", &summary.by_rule_kind),
        ("Status", &summary.by_status),
    ];
    for (label, counts) in sections {
        if counts.is_empty() {
            continue;
        }
        let mut grid = new_table([label, "Count"]);
        for (key, count) in counts {
            grid.add_row(vec![key.clone(), count.to_string()]);
        }
        println!("{grid}");
    }
    Ok(())
}
