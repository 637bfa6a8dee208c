// Session state for one backend connection: endpoint, credentials, cookies, CSRF token

pub mod cookies;
pub mod csrf;

pub use cookies::CookieStore;
pub use csrf::{CsrfTokenManager, TokenState};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use secrecy::{ExposeSecret, Secret};
use std::fmt;
use std::sync::{Mutex, PoisonError};
use url::Url;

use crate::core::errors::AdtError;
use crate::core::models::Response;

/// Logon data sent with every request
pub struct Credentials {
    pub username: String,
    password: Secret<String>,
    /// SAP client (mandant), e.g. `100`
    pub client: String,
    pub language: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        client: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: Secret::new(password.into()),
            client: client.into(),
            language: language.into(),
        }
    }

    /// `Basic <base64(user:password)>`
    pub fn basic_auth_header(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password.expose_secret());
        format!("Basic {}", STANDARD.encode(raw))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("client", &self.client)
            .field("language", &self.language)
            .finish()
    }
}

/// Process-lifetime state shared by the executor and the lock manager
///
/// Cookie updates go through a single mutex; the token manager serialises
/// its own transitions. Nothing is persisted.
#[derive(Debug)]
pub struct Session {
    base_endpoint: Url,
    credentials: Credentials,
    cookies: Mutex<CookieStore>,
    csrf: CsrfTokenManager,
}

impl Session {
    /// `base_endpoint` is scheme, host, port and service root, e.g. `https://host:44300/sap/bc/adt`
    pub fn new(base_endpoint: &str, credentials: Credentials) -> Result<Self, AdtError> {
        let base_endpoint = Url::parse(base_endpoint).map_err(|e| {
            AdtError::Configuration(format!("Invalid base endpoint '{}': {}", base_endpoint, e))
        })?;
        if base_endpoint.cannot_be_a_base() {
            return Err(AdtError::Configuration(format!(
                "Base endpoint '{}' cannot carry paths",
                base_endpoint
            )));
        }
        Ok(Self {
            base_endpoint,
            credentials,
            cookies: Mutex::new(CookieStore::new()),
            csrf: CsrfTokenManager::new(),
        })
    }

    pub fn base_endpoint(&self) -> &Url {
        &self.base_endpoint
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn csrf(&self) -> &CsrfTokenManager {
        &self.csrf
    }

    /// Rendered `Cookie` header, `None` when no cookies were issued yet
    pub fn cookie_header(&self) -> Option<String> {
        let store = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        if store.is_empty() {
            None
        } else {
            Some(store.header())
        }
    }

    /// Merge every `Set-Cookie` on `response`
    pub fn absorb_cookies(&self, response: &Response) {
        let set_cookies = response.set_cookies();
        if set_cookies.is_empty() {
            return;
        }
        let mut store = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        store.update(set_cookies);
    }

    pub fn cookies(&self) -> CookieStore {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Resolve a request path against the service root
    ///
    /// Paths already starting with the service root (`/sap/bc/adt/...`) are kept;
    /// anything else is appended to it. An inline `?query` is preserved and
    /// `query` pairs are appended after it.
    pub fn url_for(&self, path: &str, query: &[(String, String)]) -> Result<Url, AdtError> {
        if path.contains("://") {
            return Err(AdtError::InvalidRequest(format!(
                "Expected a path relative to the service root, got '{}'",
                path
            )));
        }

        let (path, inline_query) = match path.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (path, None),
        };

        let root = self.base_endpoint.path().trim_end_matches('/');
        let full_path = if root.is_empty() || path == root || path.starts_with(&format!("{}/", root))
        {
            format!("/{}", path.trim_start_matches('/'))
        } else {
            format!("{}/{}", root, path.trim_start_matches('/'))
        };

        let mut url = self.base_endpoint.clone();
        url.set_path(&full_path);
        url.set_query(inline_query.filter(|q| !q.is_empty()));
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }
}
