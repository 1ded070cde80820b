// tierline/src/main.rs

mod cli;
mod commands;

use clap::Parser;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG=debug tierline run ... pour voir les détails
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { project_dir, stage } => commands::run::execute(project_dir, stage).await,
        Commands::Dag { project_dir } => commands::dag::execute(project_dir),
        Commands::Calc {
            project_dir,
            select,
        } => commands::calc::execute(project_dir, select).await,
        Commands::Validate {
            project_dir,
            contract,
            table,
        } => commands::validate::execute(project_dir, contract, table).await,
        Commands::Score {
            project_dir,
            contract,
            table,
        } => commands::score::execute(project_dir, contract, table).await,
        Commands::Profile { project_dir, table } => {
            commands::profile::execute(project_dir, table).await
        }
        Commands::Quarantine {
            project_dir,
            action,
        } => commands::quarantine::execute(project_dir, action),
        Commands::Clean { project_dir } => commands::clean::execute(project_dir),
    }
}
