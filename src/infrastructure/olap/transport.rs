//! HTTP transport for XMLA requests

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::query::QueryError;
use crate::domain::DomainError;

/// Accept header sent with every XMLA request
pub const XMLA_ACCEPT: &str = "text/xml, application/xml, application/soap+xml";
pub const XMLA_CONTENT_TYPE: &str = "text/xml";
/// Header carrying the caller's comma-joined role names
pub const ROLE_HEADER: &str = "mondrian-role";

/// One XMLA POST
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlaHttpRequest {
    pub url: String,
    /// `host:port` quoted in error messages
    pub endpoint: String,
    pub body: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl XmlaHttpRequest {
    pub fn new(
        url: impl Into<String>,
        endpoint: impl Into<String>,
        body: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            endpoint: endpoint.into(),
            body: body.into(),
            headers: vec![
                ("Accept".to_string(), XMLA_ACCEPT.to_string()),
                ("Content-Type".to_string(), XMLA_CONTENT_TYPE.to_string()),
            ],
            timeout,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Sends XMLA requests (mockable)
#[async_trait]
pub trait XmlaTransport: Send + Sync + std::fmt::Debug {
    /// Posts the request, returning the raw body of a 2xx response
    async fn post(
        &self,
        request: XmlaHttpRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<String, QueryError>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpXmlaTransport {
    client: reqwest::Client,
}

impl HttpXmlaTransport {
    pub fn new() -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn send(&self, request: XmlaHttpRequest) -> Result<String, QueryError> {
        let mut builder = self
            .client
            .post(&request.url)
            .timeout(request.timeout)
            .body(request.body);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify_error(&e, &request.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::upstream_http(
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| classify_error(&e, &request.endpoint))
    }
}

#[async_trait]
impl XmlaTransport for HttpXmlaTransport {
    async fn post(
        &self,
        request: XmlaHttpRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<String, QueryError> {
        let endpoint = request.endpoint.clone();

        match cancel {
            Some(cancel) => tokio::select! {
                _ = cancel.cancelled() => Err(QueryError::aborted(endpoint)),
                result = self.send(request) => result,
            },
            None => self.send(request).await,
        }
    }
}

/// Maps a transport failure onto the query error taxonomy
pub fn classify_error(error: &reqwest::Error, endpoint: &str) -> QueryError {
    if error.is_timeout() {
        return QueryError::timeout(endpoint);
    }

    if let Some(kind) = io_error_kind(error) {
        match kind {
            std::io::ErrorKind::ConnectionRefused => {
                return QueryError::connection_refused(endpoint);
            }
            std::io::ErrorKind::TimedOut => return QueryError::timeout(endpoint),
            std::io::ErrorKind::ConnectionAborted => return QueryError::aborted(endpoint),
            _ => {}
        }
    }

    if let Some(status) = error.status() {
        return QueryError::upstream_http(
            status.as_u16(),
            status.canonical_reason().unwrap_or_default(),
        );
    }

    QueryError::network(error.to_string())
}

fn io_error_kind(error: &reqwest::Error) -> Option<std::io::ErrorKind> {
    let mut source = std::error::Error::source(error);

    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            return Some(io.kind());
        }
        source = err.source();
    }

    None
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Records requests and replays scripted responses
    #[derive(Debug, Default)]
    pub struct MockXmlaTransport {
        responses: Mutex<VecDeque<Result<String, QueryError>>>,
        pub requests: Mutex<Vec<XmlaHttpRequest>>,
    }

    impl MockXmlaTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_response(self, body: impl Into<String>) -> Self {
            self.responses.lock().unwrap().push_back(Ok(body.into()));
            self
        }

        pub fn with_error(self, error: QueryError) -> Self {
            self.responses.lock().unwrap().push_back(Err(error));
            self
        }

        pub fn requests(&self) -> Vec<XmlaHttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl XmlaTransport for MockXmlaTransport {
        async fn post(
            &self,
            request: XmlaHttpRequest,
            cancel: Option<CancellationToken>,
        ) -> Result<String, QueryError> {
            if cancel.is_some_and(|c| c.is_cancelled()) {
                return Err(QueryError::aborted(request.endpoint));
            }
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("<ok/>".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::query::ErrorCategory;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(server: &MockServer, timeout: Duration) -> XmlaHttpRequest {
        XmlaHttpRequest::new(
            format!("{}/xmla", server.uri()),
            server.address().to_string(),
            "<Execute/>",
            timeout,
        )
    }

    #[tokio::test]
    async fn test_posts_xml_with_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/xmla"))
            .and(header("Content-Type", XMLA_CONTENT_TYPE))
            .and(header("Accept-Language", "en-US"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<root/>"))
            .mount(&server)
            .await;

        let transport = HttpXmlaTransport::new().unwrap();
        let body = transport
            .post(
                request(&server, Duration::from_secs(5)).with_header("Accept-Language", "en-US"),
                None,
            )
            .await
            .unwrap();

        assert_eq!(body, "<root/>");
    }

    #[tokio::test]
    async fn test_non_2xx_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let transport = HttpXmlaTransport::new().unwrap();
        let error = transport
            .post(request(&server, Duration::from_secs(5)), None)
            .await
            .unwrap_err();

        assert_eq!(error, QueryError::upstream_http(503, "Service Unavailable"));
        assert_eq!(
            error.to_string(),
            "OLAP engine returned error: 503 Service Unavailable"
        );
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let transport = HttpXmlaTransport::new().unwrap();
        let error = transport
            .post(request(&server, Duration::from_millis(50)), None)
            .await
            .unwrap_err();

        assert_eq!(error.category(), ErrorCategory::Timeout);
        assert!(error.to_string().contains("Connection timeout"));
    }

    #[tokio::test]
    async fn test_refused_connection() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HttpXmlaTransport::new().unwrap();
        let error = transport
            .post(
                XmlaHttpRequest::new(
                    format!("http://{}/xmla", addr),
                    addr.to_string(),
                    "<Execute/>",
                    Duration::from_secs(5),
                ),
                None,
            )
            .await
            .unwrap_err();

        assert_eq!(error, QueryError::connection_refused(addr.to_string()));
    }

    #[tokio::test]
    async fn test_cancellation_aborts_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.cancel();
        });

        let transport = HttpXmlaTransport::new().unwrap();
        let error = transport
            .post(request(&server, Duration::from_secs(10)), Some(cancel))
            .await
            .unwrap_err();

        assert!(matches!(error, QueryError::Aborted { .. }));
    }
}
