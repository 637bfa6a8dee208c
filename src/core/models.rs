// Request and response models shared by every component of the client

use crate::core::errors::{snippet, AdtError, BackendDetail};
use std::fmt;

/// Header carrying the anti-forgery token
pub const HEADER_CSRF_TOKEN: &str = "x-csrf-token";
/// Header selecting sticky (stateful) or stateless backend sessions
pub const HEADER_SESSION_TYPE: &str = "x-sap-adt-sessiontype";
/// Header correlating a LOCK with its mutating request
pub const HEADER_CONNECTION_ID: &str = "sap-adt-connection-id";
pub const HEADER_SAP_CLIENT: &str = "sap-client";
pub const HEADER_SAP_LANGUAGE: &str = "sap-language";
pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_COOKIE: &str = "cookie";
pub const HEADER_SET_COOKIE: &str = "set-cookie";

/// Headers managed by the executor; callers may only replace them explicitly
pub const SESSION_CRITICAL_HEADERS: [&str; 7] = [
    HEADER_AUTHORIZATION,
    HEADER_COOKIE,
    HEADER_CSRF_TOKEN,
    HEADER_SAP_CLIENT,
    HEADER_SAP_LANGUAGE,
    HEADER_SESSION_TYPE,
    HEADER_CONNECTION_ID,
];

/// HTTP methods used against the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// Mutating methods always carry a CSRF token
    pub fn is_mutating(&self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Delete)
    }

    /// Only idempotent methods are retried after connection-level failures
    pub fn is_idempotent(&self) -> bool {
        matches!(self, Method::Get | Method::Head)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the backend may pin the request to a sticky application-server session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionType {
    Stateful,
    #[default]
    Stateless,
}

impl SessionType {
    pub fn header_value(&self) -> &'static str {
        match self {
            SessionType::Stateful => "stateful",
            SessionType::Stateless => "stateless",
        }
    }
}

/// A request as described by a caller, before session headers are attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    /// Explicit replacements for session-critical headers
    pub overrides: Vec<(String, String)>,
    pub body: Option<String>,
    pub session_type: SessionType,
    /// Correlates a LOCK with the mutating request that uses its handle
    pub connection_id: Option<String>,
    pub csrf_required: bool,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            overrides: Vec::new(),
            body: None,
            session_type: SessionType::default(),
            connection_id: None,
            csrf_required: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add an ordinary header. Collisions with session-critical headers are dropped.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replace a session-critical header; the executor logs every override it applies
    pub fn override_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.push((name.into(), value.into()));
        self
    }

    pub fn content_type(self, value: impl Into<String>) -> Self {
        self.header("Content-Type", value)
    }

    pub fn accept(self, value: impl Into<String>) -> Self {
        self.header("Accept", value)
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn session(mut self, session_type: SessionType) -> Self {
        self.session_type = session_type;
        self
    }

    pub fn stateful(self) -> Self {
        self.session(SessionType::Stateful)
    }

    pub fn connection_id(mut self, id: impl Into<String>) -> Self {
        self.connection_id = Some(id.into());
        self
    }

    /// Force a CSRF token on a non-mutating request
    pub fn require_csrf(mut self) -> Self {
        self.csrf_required = true;
        self
    }

    pub fn needs_csrf(&self) -> bool {
        self.csrf_required || self.method.is_mutating()
    }

    /// First value of a caller-supplied header, case-insensitive
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Normalised backend response; header names are lowercase
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn set_cookies(&self) -> Vec<&str> {
        self.header_values(HEADER_SET_COOKIE)
    }

    /// Convert a non-2xx response into the matching error kind
    pub fn error_for_status(self) -> Result<Self, AdtError> {
        if self.is_success() {
            return Ok(self);
        }
        match self.status {
            401 | 403 => Err(AdtError::AuthFailed {
                status: self.status,
                body: snippet(&self.body),
            }),
            status => Err(AdtError::Backend {
                status,
                detail: BackendDetail::from_body(&self.body),
                body: snippet(&self.body),
            }),
        }
    }
}
