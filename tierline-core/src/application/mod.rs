// tierline-core/src/application/mod.rs

pub mod clean;
pub mod engine;
pub mod materialization;
pub mod orchestrator;
pub mod quarantine;
pub mod scoring;
pub mod validation;

// --- RE-EXPORTS (FACADE PATTERN) ---
// `use tierline_core::application::{StageOrchestrator, QuarantineStore};`

pub use clean::clean_project;
pub use engine::{CalculationEngine, CalculationOutcome, CalculationRunReport};
pub use materialization::{Materialized, Materializer};
pub use orchestrator::{OrchestratorSettings, StageOrchestrator};
pub use quarantine::QuarantineStore;
pub use scoring::QualityScorer;
pub use validation::ContractValidator;
