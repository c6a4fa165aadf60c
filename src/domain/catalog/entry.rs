//! Catalog entry published for the embedded engine

use serde::{Deserialize, Serialize};

/// Registry set listing every published catalog
pub const DEFAULT_CATALOG_SET: &str = "XmlaConnection";

/// Class tag the embedded engine uses to deserialize registry hashes
pub const CATALOG_ENTRY_CLASS: &str = "com.pangolin.olap.repository.XmlaConnection";

/// Connection and schema document registered under a catalog name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Model id, or `{id}/draft` for draft publications
    pub name: String,
    pub jdbc_driver: String,
    pub jdbc_connection_string: String,
    pub description: String,
    /// Catalog name inside the data source
    pub catalog: String,
    /// XML schema document
    pub catalog_content: String,
}

impl CatalogEntry {
    /// Registry hash key of the entry
    pub fn hash_key(&self, set_name: &str) -> String {
        format!("{}:{}", set_name, self.name)
    }

    /// Flattened hash fields as stored in the registry
    pub fn hash_fields(&self) -> Vec<(String, String)> {
        vec![
            ("_class".to_string(), CATALOG_ENTRY_CLASS.to_string()),
            ("id".to_string(), self.name.clone()),
            ("jdbcDriver".to_string(), self.jdbc_driver.clone()),
            (
                "jdbcConnectionString".to_string(),
                self.jdbc_connection_string.clone(),
            ),
            ("description".to_string(), self.description.clone()),
            ("catalog".to_string(), self.catalog.clone()),
            ("catalogContent".to_string(), self.catalog_content.clone()),
        ]
    }
}
