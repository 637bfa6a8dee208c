// CSRF token manager - caches the anti-forgery token and serialises refreshes

use std::future::Future;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::core::errors::{snippet, AdtError};
use crate::core::models::{Response, HEADER_CSRF_TOKEN};

/// Value the backend returns when CSRF protection is disabled
const UNSAFE_TOKEN: &str = "unsafe";

/// Observable token lifecycle
///
/// `Unset -> Valid` on first fetch, `Valid -> Invalid` when a mutating request
/// is rejected, `Invalid -> Valid` on the next fetch. Fetching happens while the
/// internal lock is held, so concurrent callers wait for one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Unset,
    Valid,
    Invalid,
}

#[derive(Debug)]
enum Slot {
    Unset,
    Valid(String),
    Invalid,
}

#[derive(Debug)]
pub struct CsrfTokenManager {
    slot: Mutex<Slot>,
}

impl Default for CsrfTokenManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CsrfTokenManager {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Unset),
        }
    }

    pub async fn state(&self) -> TokenState {
        match *self.slot.lock().await {
            Slot::Unset => TokenState::Unset,
            Slot::Valid(_) => TokenState::Valid,
            Slot::Invalid => TokenState::Invalid,
        }
    }

    /// Return the cached token, or run `probe` and cache the token it yields
    ///
    /// `probe` issues the discovery GET with `X-CSRF-Token: Fetch`; cookies on its
    /// response are merged by the executor before the response reaches here.
    pub async fn ensure<F, Fut>(&self, probe: F) -> Result<String, AdtError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Response, AdtError>>,
    {
        let mut slot = self.slot.lock().await;
        if let Slot::Valid(token) = &*slot {
            return Ok(token.clone());
        }

        debug!("Fetching CSRF token");
        let response = probe().await?;
        let token = token_from_probe(&response)?;
        info!(token_len = token.len(), "CSRF token refreshed");
        *slot = Slot::Valid(token.clone());
        Ok(token)
    }

    /// Mark the cached token as stale
    pub async fn invalidate(&self) {
        *self.slot.lock().await = Slot::Invalid;
    }

    /// Mark the token stale only if it is still the one that was rejected
    ///
    /// Returns false when another request already replaced it.
    pub async fn invalidate_token(&self, rejected: &str) -> bool {
        let mut slot = self.slot.lock().await;
        match &*slot {
            Slot::Valid(current) if current != rejected => false,
            _ => {
                *slot = Slot::Invalid;
                true
            }
        }
    }
}

/// Extract a usable token from a probe response
fn token_from_probe(response: &Response) -> Result<String, AdtError> {
    if response.status == 401 {
        return Err(AdtError::AuthFailed {
            status: response.status,
            body: snippet(&response.body),
        });
    }
    if !response.is_success() {
        return Err(AdtError::TokenUnavailable {
            reason: "CSRF probe was rejected".to_string(),
            status: Some(response.status),
            body: Some(snippet(&response.body)),
        });
    }

    match response.header(HEADER_CSRF_TOKEN).map(str::trim) {
        None | Some("") => Err(AdtError::TokenUnavailable {
            reason: "probe response carried no X-CSRF-Token header".to_string(),
            status: Some(response.status),
            body: None,
        }),
        Some(value) if value.eq_ignore_ascii_case(UNSAFE_TOKEN) => {
            Err(AdtError::TokenUnavailable {
                reason: "backend reported CSRF protection as 'unsafe'".to_string(),
                status: Some(response.status),
                body: None,
            })
        }
        Some(value) => Ok(value.to_string()),
    }
}
