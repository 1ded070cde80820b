// tierline-core/src/infrastructure/catalog/mod.rs

pub mod memory;
pub mod yaml;

pub use memory::InMemoryCatalog;
pub use yaml::{CatalogFragment, YamlCatalog};
