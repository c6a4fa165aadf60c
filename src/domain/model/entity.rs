//! Semantic model entity and related types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::validation::{validate_model_id, ModelValidationError};
use crate::domain::storage::{StorageEntity, StorageKey};

/// Suffix appended to a model ID to name its draft catalog
pub const DRAFT_CATALOG_SUFFIX: &str = "/draft";

/// Semantic model identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelId(String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Result<Self, ModelValidationError> {
        let id = id.into();
        validate_model_id(&id)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Catalog name under which the model is published
    pub fn catalog_name(&self, draft: bool) -> String {
        if draft {
            format!("{}{}", self.0, DRAFT_CATALOG_SUFFIX)
        } else {
            self.0.clone()
        }
    }
}

impl TryFrom<String> for ModelId {
    type Error = ModelValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ModelId> for String {
    fn from(id: ModelId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StorageKey for ModelId {
    fn as_str(&self) -> &str {
        &self.0
    }
}

/// Transport used to reach the engine that serves a data source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// A remote XMLA endpoint reached through a pooled runner
    Xmla,
    /// A relational source served through the embedded OLAP engine
    #[default]
    Sql,
    /// Any other declared protocol, served through the embedded OLAP engine
    #[serde(other)]
    Other,
}

impl Protocol {
    /// Only XMLA sources are forwarded to a remote endpoint
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Xmla)
    }
}

/// Kind of semantic model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    #[serde(alias = "XMLA")]
    Xmla,
    #[default]
    #[serde(alias = "SQL")]
    Sql,
}

/// Data source type descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceType {
    /// Runner type name, e.g. `xmla`, `pg`, `mysql`
    pub name: String,
    #[serde(default)]
    pub protocol: Protocol,
}

impl DataSourceType {
    pub fn new(name: impl Into<String>, protocol: Protocol) -> Self {
        Self {
            name: name.into(),
            protocol,
        }
    }
}

/// Physical data source bound to a semantic model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: DataSourceType,
    /// Runner options such as host, port or credentials
    #[serde(default)]
    pub options: Value,
}

impl DataSource {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        source_type: DataSourceType,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source_type,
            options: Value::Null,
        }
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }

    pub fn protocol(&self) -> Protocol {
        self.source_type.protocol
    }
}

/// Per-model query preferences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPreferences {
    #[serde(default)]
    pub enable_cache: bool,
    /// Cache lifetime in seconds, `None` means durable entries never go stale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<u64>,
    /// Language that overrides the caller's Accept-Language
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl ModelPreferences {
    pub fn cached() -> Self {
        Self {
            enable_cache: true,
            ..Self::default()
        }
    }

    pub fn with_expires(mut self, seconds: u64) -> Self {
        self.expires = Some(seconds);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Unpublished working copy of a model's schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
}

/// Named role with its member user IDs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleBinding {
    pub name: String,
    #[serde(default)]
    pub users: Vec<String>,
    /// Role definition merged into the published schema
    #[serde(default)]
    pub options: Value,
}

impl RoleBinding {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            users: Vec::new(),
            options: Value::Null,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.users.push(user_id.into());
        self
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }

    pub fn has_member(&self, user_id: &str) -> bool {
        self.users.iter().any(|u| u == user_id)
    }
}

/// Semantic model: a named analytical schema over a data source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticModel {
    id: ModelId,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tenant_id: Option<String>,
    #[serde(rename = "type", default)]
    model_type: ModelType,
    /// Catalog name inside a remote XMLA source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    catalog: Option<String>,
    data_source: DataSource,
    #[serde(default)]
    preferences: ModelPreferences,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    draft: Option<ModelDraft>,
    #[serde(default)]
    roles: Vec<RoleBinding>,
}

impl SemanticModel {
    pub fn new(id: ModelId, name: impl Into<String>, data_source: DataSource) -> Self {
        Self {
            id,
            name: name.into(),
            tenant_id: None,
            model_type: ModelType::default(),
            catalog: None,
            data_source,
            preferences: ModelPreferences::default(),
            schema: None,
            draft: None,
            roles: Vec::new(),
        }
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_type(mut self, model_type: ModelType) -> Self {
        self.model_type = model_type;
        self
    }

    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    pub fn with_preferences(mut self, preferences: ModelPreferences) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_draft(mut self, draft: ModelDraft) -> Self {
        self.draft = Some(draft);
        self
    }

    pub fn with_role(mut self, role: RoleBinding) -> Self {
        self.roles.push(role);
        self
    }

    // Getters

    pub fn id(&self) -> &ModelId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    pub fn catalog(&self) -> Option<&str> {
        self.catalog.as_deref()
    }

    pub fn data_source(&self) -> &DataSource {
        &self.data_source
    }

    pub fn preferences(&self) -> &ModelPreferences {
        &self.preferences
    }

    pub fn schema(&self) -> Option<&Value> {
        self.schema.as_ref()
    }

    pub fn draft(&self) -> Option<&ModelDraft> {
        self.draft.as_ref()
    }

    pub fn roles(&self) -> &[RoleBinding] {
        &self.roles
    }

    /// Schema served under the draft catalog, falling back to the published one
    pub fn draft_schema(&self) -> Option<&Value> {
        self.draft
            .as_ref()
            .and_then(|d| d.schema.as_ref())
            .or(self.schema.as_ref())
    }

    /// Language used for execution and cache keys
    pub fn effective_language(&self, accept_language: Option<&str>) -> Option<String> {
        self.preferences
            .language
            .clone()
            .filter(|l| !l.is_empty())
            .or_else(|| accept_language.map(str::to_string))
    }

    pub fn cache_enabled(&self) -> bool {
        self.preferences.enable_cache
    }
}

impl StorageEntity for SemanticModel {
    type Key = ModelId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> SemanticModel {
        SemanticModel::new(
            ModelId::new("sales").unwrap(),
            "Sales",
            DataSource::new("ds-1", "Warehouse", DataSourceType::new("pg", Protocol::Sql)),
        )
    }

    #[test]
    fn test_catalog_name() {
        let id = ModelId::new("sales").unwrap();
        assert_eq!(id.catalog_name(false), "sales");
        assert_eq!(id.catalog_name(true), "sales/draft");
    }

    #[test]
    fn test_preference_language_wins() {
        let model = sample().with_preferences(ModelPreferences::cached().with_language("zh-CN"));
        assert_eq!(
            model.effective_language(Some("en-US")),
            Some("zh-CN".to_string())
        );
    }

    #[test]
    fn test_falls_back_to_accept_language() {
        let model = sample();
        assert_eq!(
            model.effective_language(Some("en-US")),
            Some("en-US".to_string())
        );
        assert_eq!(model.effective_language(None), None);
    }

    #[test]
    fn test_draft_schema_fallback() {
        let model = sample().with_schema(json!({"cubes": []}));
        assert_eq!(model.draft_schema(), Some(&json!({"cubes": []})));

        let model = model.with_draft(ModelDraft {
            schema: Some(json!({"cubes": [{"name": "Draft"}]})),
            settings: None,
        });
        assert_eq!(
            model.draft_schema(),
            Some(&json!({"cubes": [{"name": "Draft"}]}))
        );
    }

    #[test]
    fn test_role_membership() {
        let role = RoleBinding::new("analyst").with_user("u1");
        assert!(role.has_member("u1"));
        assert!(!role.has_member("u2"));
    }

    #[test]
    fn test_deserialize_from_json() {
        let model: SemanticModel = serde_json::from_value(json!({
            "id": "sales",
            "name": "Sales",
            "tenantId": "t1",
            "type": "XMLA",
            "catalog": "SalesCatalog",
            "dataSource": {
                "id": "ds-1",
                "name": "Remote",
                "type": {"name": "xmla", "protocol": "xmla"},
                "options": {"url": "http://remote/xmla"}
            },
            "preferences": {"enableCache": true, "expires": 60}
        }))
        .unwrap();

        assert_eq!(model.model_type(), ModelType::Xmla);
        assert_eq!(model.tenant_id(), Some("t1"));
        assert_eq!(model.data_source().protocol(), Protocol::Xmla);
        assert!(model.cache_enabled());
        assert_eq!(model.preferences().expires, Some(60));
        assert!(model.roles().is_empty());
    }

    #[test]
    fn test_unrecognized_protocol_is_not_remote() {
        let source_type: DataSourceType =
            serde_json::from_value(json!({"name": "doris", "protocol": "http"})).unwrap();

        assert_eq!(source_type.protocol, Protocol::Other);
        assert!(!source_type.protocol.is_remote());
        assert!(Protocol::Xmla.is_remote());
        assert!(!Protocol::Sql.is_remote());
    }
}
