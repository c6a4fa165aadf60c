//! Out-of-band result delivery

use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::query::{ErrorCategory, OlapResult, QueryError};
use crate::domain::DomainError;

/// Final payload delivered to a caller's session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResultMessage {
    pub id: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
    #[serde(default)]
    pub cache: bool,
}

impl QueryResultMessage {
    pub fn success(id: impl Into<String>, result: OlapResult) -> Self {
        Self {
            id: id.into(),
            status: 200,
            data: Some(result.data),
            error: None,
            category: None,
            cache: result.cache,
        }
    }

    pub fn failure(id: impl Into<String>, error: &QueryError) -> Self {
        Self {
            id: id.into(),
            status: error.status_code(),
            data: None,
            error: Some(error.to_string()),
            category: Some(error.category()),
            cache: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Per-session addressable sink, independent of the transport behind it
#[async_trait]
pub trait ResultSink: Send + Sync + Debug {
    async fn send(&self, session_id: &str, message: QueryResultMessage) -> Result<(), DomainError>;
}
