// HTTP transport - the only place that performs network I/O

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::core::errors::AdtError;
use crate::core::models::{Method, Response};

/// Fully resolved request, with every session header attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl OutgoingRequest {
    /// First header value, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// First value of a query parameter
    pub fn query_param(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }
}

/// Sends one request and returns whatever the backend answered
///
/// Implementations return `Ok` for every HTTP status; only connection-level
/// failures become `AdtError::Transport`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: OutgoingRequest) -> Result<Response, AdtError>;
}

/// reqwest-backed transport with a bounded timeout
pub struct ReqwestTransport {
    http_client: Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport
    ///
    /// # Arguments
    /// * `timeout` - Whole-request timeout
    /// * `insecure_tls` - Accept self-signed certificates (lab systems only)
    pub fn new(timeout: Duration, insecure_tls: bool) -> Result<Self, AdtError> {
        let connect_timeout = timeout.min(Duration::from_secs(10));

        let http_client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .danger_accept_invalid_certs(insecure_tls)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| {
                AdtError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn map_error(&self, e: reqwest::Error) -> AdtError {
        if e.is_builder() {
            return AdtError::InvalidRequest(format!("Could not build request: {}", e));
        }
        if e.is_timeout() {
            return AdtError::Transport {
                message: format!("Request timeout after {}s", self.timeout.as_secs()),
                timeout: true,
            };
        }
        if e.is_connect() {
            return AdtError::Transport {
                message: format!("Connection failed: {}", e),
                timeout: false,
            };
        }
        AdtError::Transport {
            message: format!("HTTP request failed: {}", e),
            timeout: false,
        }
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: OutgoingRequest) -> Result<Response, AdtError> {
        let mut builder = self
            .http_client
            .request(to_reqwest_method(request.method), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| self.map_error(e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_ascii_lowercase(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().await.map_err(|e| self.map_error(e))?;

        debug!(
            method = %request.method,
            url = %request.url,
            status,
            body_len = body.len(),
            "Backend responded"
        );

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}
