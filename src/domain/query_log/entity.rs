//! Query log entities

use std::fmt;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::storage::{StorageEntity, StorageKey};
use crate::domain::DomainError;

/// Valid query log IDs: qlog-{uuid}
static ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^qlog-[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}$").unwrap()
});

/// Validated query log identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QueryLogId(String);

impl QueryLogId {
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if !ID_PATTERN.is_match(&id) {
            return Err(DomainError::invalid_id(format!(
                "Invalid query log ID '{}': must be in format qlog-{{uuid}}",
                id
            )));
        }
        Ok(Self(id))
    }

    pub fn generate() -> Self {
        Self(format!("qlog-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for QueryLogId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<QueryLogId> for String {
    fn from(id: QueryLogId) -> Self {
        id.0
    }
}

impl fmt::Display for QueryLogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StorageKey for QueryLogId {
    fn as_str(&self) -> &str {
        &self.0
    }
}

/// Lifecycle status of a logged query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryLogStatus {
    #[default]
    Pending,
    Running,
    Success,
    Failed,
}

impl QueryLogStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// Statuses only move forward. A pending entry may fail without ever running.
    pub fn can_transition_to(&self, target: QueryLogStatus) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Failed)
                | (Self::Running, Self::Success)
                | (Self::Running, Self::Failed)
        )
    }
}

impl fmt::Display for QueryLogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Running => write!(f, "RUNNING"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Audit record of one logical query request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryLogEntry {
    id: QueryLogId,
    model_id: String,
    session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cube: Option<String>,
    query: String,
    #[serde(default)]
    params: Value,
    status: QueryLogStatus,
    /// Milliseconds spent queued before execution started
    #[serde(skip_serializing_if = "Option::is_none")]
    waiting_time: Option<u64>,
    /// Milliseconds spent executing
    #[serde(skip_serializing_if = "Option::is_none")]
    execution_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    finished_at: Option<DateTime<Utc>>,
}

impl QueryLogEntry {
    /// Creates a new pending entry
    pub fn new(
        model_id: impl Into<String>,
        session_id: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            id: QueryLogId::generate(),
            model_id: model_id.into(),
            session_id: session_id.into(),
            cube: None,
            query: query.into(),
            params: Value::Null,
            status: QueryLogStatus::Pending,
            waiting_time: None,
            execution_time: None,
            result: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn with_cube(mut self, cube: impl Into<String>) -> Self {
        self.cube = Some(cube.into());
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    // Getters

    pub fn id(&self) -> &QueryLogId {
        &self.id
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn cube(&self) -> Option<&str> {
        self.cube.as_deref()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn params(&self) -> &Value {
        &self.params
    }

    pub fn status(&self) -> QueryLogStatus {
        self.status
    }

    pub fn waiting_time(&self) -> Option<u64> {
        self.waiting_time
    }

    pub fn execution_time(&self) -> Option<u64> {
        self.execution_time
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    // Transitions

    fn transition(&mut self, target: QueryLogStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(target) {
            return Err(DomainError::conflict(format!(
                "Query log '{}' cannot move from {} to {}",
                self.id, self.status, target
            )));
        }
        self.status = target;
        Ok(())
    }

    /// Marks the entry as dequeued and records how long it waited
    pub fn mark_running(&mut self) -> Result<(), DomainError> {
        self.transition(QueryLogStatus::Running)?;
        let now = Utc::now();
        self.waiting_time = Some(elapsed_ms(self.created_at, now));
        self.started_at = Some(now);
        Ok(())
    }

    pub fn mark_succeeded(&mut self, result: Value) -> Result<(), DomainError> {
        self.transition(QueryLogStatus::Success)?;
        self.finish();
        self.result = Some(result);
        Ok(())
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) -> Result<(), DomainError> {
        self.transition(QueryLogStatus::Failed)?;
        self.finish();
        self.error = Some(error.into());
        Ok(())
    }

    fn finish(&mut self) {
        let now = Utc::now();
        self.execution_time = self.started_at.map(|started| elapsed_ms(started, now));
        self.finished_at = Some(now);
    }
}

fn elapsed_ms(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    (to - from).num_milliseconds().max(0) as u64
}

impl StorageEntity for QueryLogEntry {
    type Key = QueryLogId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}
