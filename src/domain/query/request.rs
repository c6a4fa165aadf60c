//! OLAP request and result types

use serde::{Deserialize, Serialize};

/// The caller on whose behalf a query runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryUser {
    pub id: Option<String>,
    pub tenant_id: Option<String>,
}

impl QueryUser {
    pub fn new(id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            tenant_id: Some(tenant_id.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// A single OLAP (XMLA/MDX) request against a semantic model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OlapRequest {
    /// Request identifier used for tracing
    pub id: String,
    pub session_id: String,
    /// Raw XMLA request body
    pub body: String,
    #[serde(default)]
    pub accept_language: Option<String>,
    #[serde(default)]
    pub force_refresh: bool,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub user: QueryUser,
}

impl OlapRequest {
    pub fn new(
        id: impl Into<String>,
        session_id: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            session_id: session_id.into(),
            body: body.into(),
            accept_language: None,
            force_refresh: false,
            is_draft: false,
            user: QueryUser::anonymous(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.accept_language = Some(language.into());
        self
    }

    pub fn with_user(mut self, user: QueryUser) -> Self {
        self.user = user;
        self
    }

    pub fn force_refresh(mut self) -> Self {
        self.force_refresh = true;
        self
    }

    pub fn draft(mut self) -> Self {
        self.is_draft = true;
        self
    }
}

/// Raw OLAP result plus whether it was served from cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OlapResult {
    pub data: String,
    pub cache: bool,
}

impl OlapResult {
    pub fn fresh(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            cache: false,
        }
    }

    pub fn cached(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            cache: true,
        }
    }
}
