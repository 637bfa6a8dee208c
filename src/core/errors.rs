// Domain error types - every failure carries a stable kind plus backend diagnostics

use std::fmt;
use thiserror::Error;

use crate::xml;

/// Maximum number of characters of a backend body kept on an error
pub const BODY_SNIPPET_LIMIT: usize = 512;

/// Stable classification of an [`AdtError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TokenUnavailable,
    AuthFailed,
    LockConflict,
    LockFailed,
    UnlockFailed,
    Transport,
    Backend,
    Configuration,
    Xml,
    InvalidRequest,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TokenUnavailable => "TokenUnavailable",
            ErrorKind::AuthFailed => "AuthFailed",
            ErrorKind::LockConflict => "LockConflict",
            ErrorKind::LockFailed => "LockFailed",
            ErrorKind::UnlockFailed => "UnlockFailed",
            ErrorKind::Transport => "TransportError",
            ErrorKind::Backend => "BackendError",
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::Xml => "XmlError",
            ErrorKind::InvalidRequest => "InvalidRequest",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed detail of an ADT exception document
///
/// The backend reports failures as
/// `<exc:exception><type id="..."/><message>...</message></exc:exception>`.
/// Both fields are optional because older releases omit either of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendDetail {
    pub exception_type: Option<String>,
    pub message: Option<String>,
}

impl BackendDetail {
    /// Extract exception detail from a response body, if it is an exception document
    pub fn from_body(body: &str) -> Option<Self> {
        if !body.contains("exception") {
            return None;
        }
        let root = xml::parse(body).ok()?;
        if xml::local_name(&root.name) != "exception" {
            return None;
        }

        let exception_type = xml::find_elements(&root, "type")
            .first()
            .and_then(|node| xml::get_attribute(node, "id"))
            .map(str::to_string);
        let message = xml::find_elements(&root, "message")
            .first()
            .and_then(|node| node.text.clone())
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());

        if exception_type.is_none() && message.is_none() {
            return None;
        }
        Some(Self { exception_type, message })
    }
}

impl fmt::Display for BackendDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.exception_type, &self.message) {
            (Some(t), Some(m)) => write!(f, "{}: {}", t, m),
            (Some(t), None) => f.write_str(t),
            (None, Some(m)) => f.write_str(m),
            (None, None) => Ok(()),
        }
    }
}

fn describe(detail: &Option<BackendDetail>) -> String {
    match detail {
        Some(d) => format!(" ({})", d),
        None => String::new(),
    }
}

fn describe_status(status: &Option<u16>) -> String {
    match status {
        Some(s) => format!(" [HTTP {}]", s),
        None => String::new(),
    }
}

/// Main error type for the protocol client
#[derive(Error, Debug)]
pub enum AdtError {
    /// CSRF probe failed, returned a non-usable token, or the backend kept rejecting a fresh token
    #[error("CSRF token unavailable: {reason}{}", describe_status(.status))]
    TokenUnavailable {
        reason: String,
        status: Option<u16>,
        body: Option<String>,
    },

    /// 401, or 403 unrelated to CSRF
    #[error("Authentication failed: HTTP {status}")]
    AuthFailed { status: u16, body: String },

    /// Object is already locked by another session or user
    #[error("Object {object_uri} is locked by another session{}", describe(.detail))]
    LockConflict {
        object_uri: String,
        status: u16,
        body: String,
        detail: Option<BackendDetail>,
    },

    /// Any other lock failure
    #[error("Failed to lock {object_uri}: {reason}{}", describe_status(.status))]
    LockFailed {
        object_uri: String,
        reason: String,
        status: Option<u16>,
        body: Option<String>,
    },

    /// Unlock failure, reported but never replacing a mutation's own outcome
    #[error("Failed to unlock {object_uri}: {reason}{}", describe_status(.status))]
    UnlockFailed {
        object_uri: String,
        reason: String,
        status: Option<u16>,
        body: Option<String>,
    },

    /// Timeout, connection reset, or other connection-level failure
    #[error("Transport error: {message}")]
    Transport { message: String, timeout: bool },

    /// Any other non-2xx response
    #[error("Backend error: HTTP {status}{}", describe(.detail))]
    Backend {
        status: u16,
        body: String,
        detail: Option<BackendDetail>,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A primary failure whose cleanup unlock also failed
    #[error("{primary} (unlock also failed: {unlock})")]
    WithUnlockFailure {
        primary: Box<AdtError>,
        unlock: Box<AdtError>,
    },
}

impl AdtError {
    /// Stable error kind; a wrapped unlock failure reports the primary kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdtError::TokenUnavailable { .. } => ErrorKind::TokenUnavailable,
            AdtError::AuthFailed { .. } => ErrorKind::AuthFailed,
            AdtError::LockConflict { .. } => ErrorKind::LockConflict,
            AdtError::LockFailed { .. } => ErrorKind::LockFailed,
            AdtError::UnlockFailed { .. } => ErrorKind::UnlockFailed,
            AdtError::Transport { .. } => ErrorKind::Transport,
            AdtError::Backend { .. } => ErrorKind::Backend,
            AdtError::Configuration(_) => ErrorKind::Configuration,
            AdtError::Xml(_) => ErrorKind::Xml,
            AdtError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            AdtError::WithUnlockFailure { primary, .. } => primary.kind(),
        }
    }

    /// HTTP status reported by the backend, when the failure came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            AdtError::AuthFailed { status, .. }
            | AdtError::LockConflict { status, .. }
            | AdtError::Backend { status, .. } => Some(*status),
            AdtError::TokenUnavailable { status, .. }
            | AdtError::LockFailed { status, .. }
            | AdtError::UnlockFailed { status, .. } => *status,
            AdtError::WithUnlockFailure { primary, .. } => primary.status(),
            _ => None,
        }
    }

    /// Raw backend body snippet, when available
    pub fn body_snippet(&self) -> Option<&str> {
        match self {
            AdtError::AuthFailed { body, .. }
            | AdtError::LockConflict { body, .. }
            | AdtError::Backend { body, .. } => Some(body.as_str()),
            AdtError::TokenUnavailable { body, .. }
            | AdtError::LockFailed { body, .. }
            | AdtError::UnlockFailed { body, .. } => body.as_deref(),
            AdtError::WithUnlockFailure { primary, .. } => primary.body_snippet(),
            _ => None,
        }
    }

    /// Unlock failure attached as secondary detail
    pub fn suppressed_unlock(&self) -> Option<&AdtError> {
        match self {
            AdtError::WithUnlockFailure { unlock, .. } => Some(unlock),
            _ => None,
        }
    }

    /// Connection-level failure that is safe to retry for idempotent requests
    pub fn is_transient(&self) -> bool {
        matches!(self, AdtError::Transport { .. })
    }

    /// Attach an unlock failure without replacing this error
    pub fn with_unlock_failure(self, unlock: AdtError) -> Self {
        AdtError::WithUnlockFailure {
            primary: Box::new(self),
            unlock: Box::new(unlock),
        }
    }
}

/// Truncate a backend body to [`BODY_SNIPPET_LIMIT`] characters
pub fn snippet(body: &str) -> String {
    match body.char_indices().nth(BODY_SNIPPET_LIMIT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
