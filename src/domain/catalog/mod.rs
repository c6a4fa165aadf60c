//! Catalog domain - published schema catalogs and their registry

mod entry;
mod registry;

pub use entry::{CatalogEntry, CATALOG_ENTRY_CLASS, DEFAULT_CATALOG_SET};
pub use registry::CatalogRegistry;
