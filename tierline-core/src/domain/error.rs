// tierline-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Circular dependency detected involving: {0}")]
    #[diagnostic(
        code(tierline::domain::cycle),
        help("Check the `depends_on` lists of your calculations.")
    )]
    CircularDependency(String),

    #[error("Calculation '{calculation}' depends on unknown calculation '{dependency}'")]
    #[diagnostic(code(tierline::domain::missing_dependency))]
    MissingDependency {
        calculation: String,
        dependency: String,
    },

    #[error("Calculation id '{0}' is declared more than once")]
    #[diagnostic(code(tierline::domain::duplicate_calculation))]
    DuplicateCalculation(String),

    #[error("Calculation '{0}' not found in catalog")]
    #[diagnostic(code(tierline::domain::calculation_not_found))]
    CalculationNotFound(String),

    #[error("Stage '{0}' not found")]
    #[diagnostic(code(tierline::domain::stage_not_found))]
    StageNotFound(String),

    #[error("Stage '{stage}' references unknown transformation '{transformation}'")]
    #[diagnostic(code(tierline::domain::missing_transformation))]
    MissingTransformation {
        stage: String,
        transformation: String,
    },

    #[error("Stage '{stage}' references unknown contract '{contract}'")]
    #[diagnostic(code(tierline::domain::missing_contract))]
    MissingContract { stage: String, contract: String },

    #[error("No value bound for parameter '${parameter}' in '{unit}'")]
    #[diagnostic(
        code(tierline::domain::missing_parameter),
        help("Declare a default under `parameters` or set it in tierline.yaml.")
    )]
    MissingParameter { unit: String, parameter: String },

    #[error("Invalid SQL identifier: '{0}'")]
    #[diagnostic(code(tierline::domain::identifier))]
    InvalidIdentifier(String),

    #[error("Invalid definition: {0}")]
    #[diagnostic(code(tierline::domain::definition))]
    InvalidDefinition(String),

    #[error("Overriding quarantine record '{0}' requires notes")]
    #[diagnostic(code(tierline::domain::quarantine_notes))]
    OverrideNotesRequired(String),

    #[error("Quarantine record '{id}' cannot move from '{from}' to '{to}'")]
    #[diagnostic(code(tierline::domain::quarantine_transition))]
    InvalidTransition { id: String, from: String, to: String },

    #[error("Catalog loading Error: {0}")]
    #[diagnostic(code(tierline::domain::catalog))]
    CatalogError(String),
}
