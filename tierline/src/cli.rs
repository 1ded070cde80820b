// tierline/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use tierline_core::domain::QuarantineStatus;

#[derive(Parser)]
#[command(name = "tierline")]
#[command(about = "Tiered calculation pipelines gated by data-quality contracts", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🚀 Runs the pipeline stages (Transformation -> Contract -> Quarantine)
    Run {
        /// Project directory
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Run only a specific stage (ex: "silver_to_gold")
        #[arg(long, short)]
        stage: Option<String>,
    },

    /// 🧮 Prints the calculation execution order
    Dag {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,
    },

    /// ⚙️  Runs calculations (all, or one with its dependencies)
    Calc {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Calculation id; its dependencies run first
        #[arg(long, short)]
        select: Option<String>,
    },

    /// 🛡️  Validates a table against a data contract
    Validate {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        #[arg(long, short)]
        contract: String,

        /// Table to check (default: the table published for the contract's target tier)
        #[arg(long, short)]
        table: Option<String>,
    },

    /// 📊 Scores a table across the quality dimensions
    Score {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        #[arg(long, short)]
        contract: String,

        #[arg(long, short)]
        table: Option<String>,
    },

    /// 🔍 Profiles the columns of a table
    Profile {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        #[arg(long, short)]
        table: String,
    },

    /// 🚧 Manages quarantined data
    Quarantine {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        #[command(subcommand)]
        action: QuarantineAction,
    },

    /// 🧹 Cleans build artifacts (target/ folder)
    Clean {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum QuarantineAction {
    /// Lists records, optionally filtered
    List {
        #[arg(long)]
        entity: Option<String>,

        #[arg(long, value_enum)]
        status: Option<StatusArg>,

        #[arg(long)]
        source_tier: Option<String>,
    },
    /// Marks a record for another attempt
    Retry { id: String },
    /// Accepts a record despite its failed rules
    Override {
        id: String,

        #[arg(long)]
        notes: String,
    },
    /// Soft-deletes a record
    Discard { id: String },
    /// Counts by entity, tier transition, rule kind and status
    Summary,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Pending,
    Retried,
    Overridden,
    Discarded,
}

impl From<StatusArg> for QuarantineStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => QuarantineStatus::Pending,
            StatusArg::Retried => QuarantineStatus::Retried,
            StatusArg::Overridden => QuarantineStatus::Overridden,
            StatusArg::Discarded => QuarantineStatus::Discarded,
        }
    }
}
