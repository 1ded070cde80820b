// tierline-core/src/infrastructure/mod.rs

pub mod adapters;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fs;
