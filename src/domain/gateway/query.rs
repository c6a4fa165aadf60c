//! Gateway query submitted over a caller's session

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::query::QueryUser;

/// What the caller asked to execute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryKind {
    /// MDX statement against a named cube of the model
    Cube { cube: String, statement: String },
    /// XMLA request body forwarded verbatim
    Olap { body: String },
    /// SQL statement run on the model's data source
    Sql { statement: String },
}

impl QueryKind {
    pub fn cube(&self) -> Option<&str> {
        match self {
            Self::Cube { cube, .. } => Some(cube),
            _ => None,
        }
    }

    /// Text recorded in the audit log
    pub fn text(&self) -> &str {
        match self {
            Self::Cube { statement, .. } => statement,
            Self::Olap { body } => body,
            Self::Sql { statement } => statement,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Cube { .. } => "cube",
            Self::Olap { .. } => "olap",
            Self::Sql { .. } => "sql",
        }
    }
}

/// A query event received from a caller's gateway session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayQuery {
    /// Caller-chosen identifier echoed back in the result message
    pub id: String,
    pub session_id: String,
    pub model_id: String,
    #[serde(flatten)]
    pub kind: QueryKind,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub accept_language: Option<String>,
    #[serde(default)]
    pub force_refresh: bool,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub user: QueryUser,
}

impl GatewayQuery {
    pub fn new(
        id: impl Into<String>,
        session_id: impl Into<String>,
        model_id: impl Into<String>,
        kind: QueryKind,
    ) -> Self {
        Self {
            id: id.into(),
            session_id: session_id.into(),
            model_id: model_id.into(),
            kind,
            params: Value::Null,
            accept_language: None,
            force_refresh: false,
            is_draft: false,
            user: QueryUser::anonymous(),
        }
    }

    pub fn with_user(mut self, user: QueryUser) -> Self {
        self.user = user;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.accept_language = Some(language.into());
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    pub fn draft(mut self) -> Self {
        self.is_draft = true;
        self
    }
}
