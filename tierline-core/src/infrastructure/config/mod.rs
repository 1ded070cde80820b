pub mod project;

pub use project::{ProjectConfig, apply_env_overrides, load_project_config};
