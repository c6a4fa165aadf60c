//! Remote XMLA runner

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use serde_json::Value;

use crate::domain::query::QueryError;
use crate::domain::runner::{QueryRunner, RunOptions};
use crate::domain::DomainError;
use crate::infrastructure::olap::{XmlaHttpRequest, XmlaTransport};

/// Connection options of a remote XMLA data source
#[derive(Debug, Clone, Deserialize)]
pub struct XmlaRunnerOptions {
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl XmlaRunnerOptions {
    pub fn from_value(options: &Value) -> Result<Self, DomainError> {
        serde_json::from_value(options.clone())
            .map_err(|e| DomainError::validation(format!("Invalid xmla options: {}", e)))
    }

    /// `host:port` of the endpoint, used in error messages
    pub fn endpoint(&self) -> String {
        let without_scheme = self
            .url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.url);
        without_scheme
            .split('/')
            .next()
            .unwrap_or(without_scheme)
            .to_string()
    }

    fn authorization(&self) -> Option<String> {
        let username = self.username.as_deref()?;
        let password = self.password.as_deref().unwrap_or_default();
        Some(format!(
            "Basic {}",
            STANDARD.encode(format!("{}:{}", username, password))
        ))
    }
}

/// Forwards XMLA bodies to a third-party endpoint with a hard timeout
#[derive(Debug)]
pub struct XmlaRunner {
    options: XmlaRunnerOptions,
    transport: Arc<dyn XmlaTransport>,
    timeout: Duration,
    closed: AtomicBool,
}

impl XmlaRunner {
    pub fn new(
        options: XmlaRunnerOptions,
        transport: Arc<dyn XmlaTransport>,
        timeout: Duration,
    ) -> Self {
        Self {
            options,
            transport,
            timeout,
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl QueryRunner for XmlaRunner {
    fn type_name(&self) -> &str {
        "xmla"
    }

    async fn run_query(&self, body: &str, options: &RunOptions) -> Result<String, QueryError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(QueryError::execution("XMLA runner has been torn down"));
        }

        let mut request = XmlaHttpRequest::new(
            &self.options.url,
            self.options.endpoint(),
            body,
            self.timeout,
        );
        if let Some(auth) = self.options.authorization() {
            request = request.with_header("Authorization", auth);
        }
        for (name, value) in &options.headers {
            request = request.with_header(name, value);
        }

        self.transport.post(request, None).await
    }

    async fn teardown(&self) -> Result<(), DomainError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn jdbc_driver(&self) -> Option<&str> {
        None
    }

    fn jdbc_url(&self, _catalog: Option<&str>) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::olap::mock::MockXmlaTransport;
    use serde_json::json;

    fn runner(transport: Arc<MockXmlaTransport>) -> XmlaRunner {
        let options = XmlaRunnerOptions::from_value(&json!({
            "url": "https://bi.example.com:8443/olap/xmla",
            "username": "svc",
            "password": "secret"
        }))
        .unwrap();
        XmlaRunner::new(options, transport, Duration::from_secs(30))
    }

    #[test]
    fn test_endpoint_from_url() {
        let options = XmlaRunnerOptions::from_value(&json!({"url": "http://olap:8080/xmla"})).unwrap();
        assert_eq!(options.endpoint(), "olap:8080");
        assert!(options.authorization().is_none());
    }

    #[test]
    fn test_missing_url_is_invalid() {
        assert!(XmlaRunnerOptions::from_value(&json!({})).is_err());
    }

    #[tokio::test]
    async fn test_forwards_body_with_auth_and_headers() {
        let transport = Arc::new(MockXmlaTransport::new().with_response("<r/>"));
        let runner = runner(transport.clone());

        let result = runner
            .run_query(
                "<Execute/>",
                &RunOptions::new().with_header("Accept-Language", "en"),
            )
            .await
            .unwrap();
        assert_eq!(result, "<r/>");

        let sent = &transport.requests()[0];
        assert_eq!(sent.url, "https://bi.example.com:8443/olap/xmla");
        assert_eq!(sent.endpoint, "bi.example.com:8443");
        assert_eq!(sent.timeout, Duration::from_secs(30));
        assert_eq!(sent.header("Authorization"), Some("Basic c3ZjOnNlY3JldA=="));
        assert_eq!(sent.header("Accept-Language"), Some("en"));
    }

    #[tokio::test]
    async fn test_torn_down_runner_refuses_work() {
        let transport = Arc::new(MockXmlaTransport::new());
        let runner = runner(transport.clone());

        runner.teardown().await.unwrap();
        runner.teardown().await.unwrap();

        assert!(runner.run_query("<Execute/>", &RunOptions::new()).await.is_err());
        assert!(transport.requests().is_empty());
    }
}
