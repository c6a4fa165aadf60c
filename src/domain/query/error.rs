//! Query failure taxonomy

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured category attached to every failed query delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    ConnectionRefused,
    Timeout,
    UpstreamHttpError,
    GenericNetworkError,
    QueueRejection,
    ExecutionError,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectionRefused => "connection_refused",
            Self::Timeout => "timeout",
            Self::UpstreamHttpError => "upstream_http_error",
            Self::GenericNetworkError => "generic_network_error",
            Self::QueueRejection => "queue_rejection",
            Self::ExecutionError => "execution_error",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors raised while routing or executing a query
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error(
        "Failed to connect to OLAP engine. Connection refused at {endpoint}. Please check if the OLAP service is running."
    )]
    ConnectionRefused { endpoint: String },

    #[error(
        "Failed to connect to OLAP engine. Connection timeout at {endpoint}. Please check network connectivity and service status."
    )]
    Timeout { endpoint: String },

    #[error("OLAP request to {endpoint} was aborted")]
    Aborted { endpoint: String },

    #[error("OLAP engine returned error: {status} {reason}")]
    UpstreamHttp { status: u16, reason: String },

    #[error("Failed to connect to OLAP engine: {message}")]
    Network { message: String },

    #[error("Query queue rejected the request: {message}")]
    QueueRejected { message: String },

    #[error("{message}")]
    Execution { message: String },
}

impl QueryError {
    pub fn connection_refused(endpoint: impl Into<String>) -> Self {
        Self::ConnectionRefused {
            endpoint: endpoint.into(),
        }
    }

    pub fn timeout(endpoint: impl Into<String>) -> Self {
        Self::Timeout {
            endpoint: endpoint.into(),
        }
    }

    pub fn aborted(endpoint: impl Into<String>) -> Self {
        Self::Aborted {
            endpoint: endpoint.into(),
        }
    }

    pub fn upstream_http(status: u16, reason: impl Into<String>) -> Self {
        Self::UpstreamHttp {
            status,
            reason: reason.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn queue_rejected(message: impl Into<String>) -> Self {
        Self::QueueRejected {
            message: message.into(),
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConnectionRefused { .. } => ErrorCategory::ConnectionRefused,
            Self::Timeout { .. } | Self::Aborted { .. } => ErrorCategory::Timeout,
            Self::UpstreamHttp { .. } => ErrorCategory::UpstreamHttpError,
            Self::Network { .. } => ErrorCategory::GenericNetworkError,
            Self::QueueRejected { .. } => ErrorCategory::QueueRejection,
            Self::Execution { .. } => ErrorCategory::ExecutionError,
        }
    }

    /// Status code used when the failure is delivered to the caller
    pub fn status_code(&self) -> u16 {
        500
    }
}
