// tierline-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::{DatabaseError, InfrastructureError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TierlineError {
    // --- ERREURS DU DOMAINE (Définitions, Cycles, Quarantaine) ---
    #[error(transparent)]
    Domain(#[from] DomainError),

    // --- ERREURS D'INFRASTRUCTURE (IO, Parsing, Moteur SQL) ---
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    // --- EXÉCUTION (une unité de travail: calcul, transformation) ---
    #[error("Execution of '{unit}' failed: {message}")]
    Execution { unit: String, message: String },

    #[error("Internal Error: {0}")]
    InternalError(String),

    #[error("Unsafe path traversal detected: {0}")]
    UnsafePath(String),
}

impl TierlineError {
    /// Tags any error with the unit of work it interrupted.
    pub fn execution(unit: impl Into<String>, err: impl std::fmt::Display) -> Self {
        TierlineError::Execution {
            unit: unit.into(),
            message: err.to_string(),
        }
    }
}

// Manual implementation to avoid duplicate enum variant but keep ergonomics
impl From<std::io::Error> for TierlineError {
    fn from(err: std::io::Error) -> Self {
        TierlineError::Infrastructure(InfrastructureError::Io(err))
    }
}

impl From<duckdb::Error> for TierlineError {
    fn from(err: duckdb::Error) -> Self {
        TierlineError::Infrastructure(InfrastructureError::Database(DatabaseError::DuckDB(err)))
    }
}

impl From<serde_json::Error> for TierlineError {
    fn from(err: serde_json::Error) -> Self {
        TierlineError::Infrastructure(InfrastructureError::JsonError(err))
    }
}
