//! Runner registry resolving data source types to runners

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::domain::runner::{QueryRunner, QueryRunnerFactory};
use crate::domain::DomainError;
use crate::infrastructure::olap::XmlaTransport;

use super::jdbc::{JdbcDescriptorRunner, JdbcKind};
use super::xmla::{XmlaRunner, XmlaRunnerOptions};

/// Builtin runner factory
#[derive(Debug, Clone)]
pub struct QueryRunnerRegistry {
    transport: Arc<dyn XmlaTransport>,
    xmla_timeout: Duration,
}

impl QueryRunnerRegistry {
    pub fn new(transport: Arc<dyn XmlaTransport>, xmla_timeout: Duration) -> Self {
        Self {
            transport,
            xmla_timeout,
        }
    }

    pub fn supports(type_name: &str) -> bool {
        type_name.eq_ignore_ascii_case("xmla") || JdbcKind::from_type_name(type_name).is_some()
    }
}

#[async_trait]
impl QueryRunnerFactory for QueryRunnerRegistry {
    async fn resolve(
        &self,
        type_name: &str,
        options: &Value,
    ) -> Result<Arc<dyn QueryRunner>, DomainError> {
        debug!(type_name, "Resolving query runner");

        if type_name.eq_ignore_ascii_case("xmla") {
            let options = XmlaRunnerOptions::from_value(options)?;
            return Ok(Arc::new(XmlaRunner::new(
                options,
                self.transport.clone(),
                self.xmla_timeout,
            )));
        }

        match JdbcKind::from_type_name(type_name) {
            Some(kind) => Ok(Arc::new(JdbcDescriptorRunner::new(kind, options)?)),
            None => Err(DomainError::not_found(format!(
                "No query runner for data source type '{}'",
                type_name
            ))),
        }
    }
}
