//! Catalog infrastructure - XML marshalling, schema documents and registries

mod document;
mod factory;
mod in_memory;
mod redis;
mod xml;

pub use document::{cube_count, schema_document};
pub use factory::create_catalog_registry;
pub use in_memory::InMemoryCatalogRegistry;
pub use redis::RedisCatalogRegistry;
pub use xml::{build_schema, parse_schema};
