// tierline/src/commands/mod.rs

pub mod calc;
pub mod clean;
pub mod dag;
pub mod profile;
pub mod quarantine;
pub mod run;
pub mod score;
pub mod validate;

mod project;

pub use project::Project;

use comfy_table::{Table, presets::UTF8_FULL};
use tierline_core::domain::pipeline::StepStatus;

/// Table preset shared by every command.
pub(crate) fn new_table<I, S>(header: I) -> Table
where
    I: IntoIterator<Item = S>,
    S: Into<comfy_table::Cell>,
{
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(header);
    table
}

pub(crate) fn step_icon(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Succeeded => "✅",
        StepStatus::Failed => "❌",
        StepStatus::Skipped => "⏭️",
    }
}
