//! Semantic model domain - models, data sources and role bindings

mod entity;
mod validation;

pub use entity::{
    DataSource, DataSourceType, ModelDraft, ModelId, ModelPreferences, ModelType, Protocol,
    RoleBinding, SemanticModel, DRAFT_CATALOG_SUFFIX,
};
pub use validation::{validate_model_id, ModelValidationError};
