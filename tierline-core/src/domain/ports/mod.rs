// src/domain/ports/mod.rs

pub mod catalog;
pub mod quarantine;

pub use catalog::Catalog;
pub use quarantine::QuarantineRepository;
