// Request executor - attaches session headers, refreshes CSRF tokens, retries safely

use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::errors::{snippet, AdtError};
use crate::core::models::{
    RequestSpec, Response, HEADER_AUTHORIZATION, HEADER_CONNECTION_ID, HEADER_COOKIE,
    HEADER_CSRF_TOKEN, HEADER_SAP_CLIENT, HEADER_SAP_LANGUAGE, HEADER_SESSION_TYPE,
    SESSION_CRITICAL_HEADERS,
};
use crate::core::resilience::{retry_transient, RetryPolicy};
use crate::session::Session;
use crate::transport::{HttpTransport, OutgoingRequest};

/// Lightweight endpoint used to obtain a CSRF token
pub const DISCOVERY_PATH: &str = "/discovery";
const DISCOVERY_ACCEPT: &str = "application/atomsvc+xml";
const CSRF_FETCH: &str = "Fetch";

/// Result of one attempt at a request
enum Outcome {
    Completed(Response),
    /// The backend refused the token we sent
    CsrfRejected { token: String, response: Response },
}

/// Issues requests on behalf of one [`Session`]
///
/// Mutating requests carry a CSRF token. A token rejection is answered with
/// exactly one refresh-and-resend; connection failures are retried with
/// backoff only for idempotent methods.
pub struct RequestExecutor {
    session: Arc<Session>,
    transport: Arc<dyn HttpTransport>,
    retry: RetryPolicy,
}

impl RequestExecutor {
    pub fn new(
        session: Arc<Session>,
        transport: Arc<dyn HttpTransport>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            session,
            transport,
            retry,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Execute `spec` and return the backend response, whatever its status
    pub async fn execute(&self, spec: &RequestSpec) -> Result<Response, AdtError> {
        let (token, rejected) = match self.attempt(spec).await? {
            Outcome::Completed(response) => return Ok(response),
            Outcome::CsrfRejected { token, response } => (token, response),
        };

        warn!(
            method = %spec.method,
            path = %spec.path,
            status = rejected.status,
            "CSRF token rejected, refreshing and resending once"
        );
        self.session.csrf().invalidate_token(&token).await;

        match self.attempt(spec).await? {
            Outcome::Completed(response) => Ok(response),
            Outcome::CsrfRejected { token, response } => {
                self.session.csrf().invalidate_token(&token).await;
                Err(AdtError::TokenUnavailable {
                    reason: "backend rejected a freshly fetched CSRF token".to_string(),
                    status: Some(response.status),
                    body: Some(snippet(&response.body)),
                })
            }
        }
    }

    /// Return the cached CSRF token, probing the discovery endpoint if needed
    pub async fn ensure_token(&self) -> Result<String, AdtError> {
        self.session
            .csrf()
            .ensure(move || async move {
                let probe = self.prepare(
                    &RequestSpec::get(DISCOVERY_PATH).accept(DISCOVERY_ACCEPT),
                    Some(CSRF_FETCH),
                )?;
                retry_transient(&self.retry, true, "CSRF probe", move || {
                    self.send(probe.clone())
                })
                .await
            })
            .await
    }

    async fn attempt(&self, spec: &RequestSpec) -> Result<Outcome, AdtError> {
        let token = if spec.needs_csrf() {
            Some(self.ensure_token().await?)
        } else {
            None
        };

        let request = self.prepare(spec, token.as_deref())?;
        let label = format!("{} {}", spec.method, spec.path);
        let response = retry_transient(&self.retry, spec.method.is_idempotent(), &label, move || {
            self.send(request.clone())
        })
        .await?;

        match token {
            Some(token) if is_csrf_rejection(&response) => {
                Ok(Outcome::CsrfRejected { token, response })
            }
            _ => Ok(Outcome::Completed(response)),
        }
    }

    /// Send one request and merge any cookies it returns
    async fn send(&self, request: OutgoingRequest) -> Result<Response, AdtError> {
        debug!(
            method = %request.method,
            url = %request.url,
            session_type = request.header(HEADER_SESSION_TYPE).unwrap_or_default(),
            has_token = request.header(HEADER_CSRF_TOKEN).is_some(),
            "Sending request"
        );
        let response = self.transport.send(request).await?;
        self.session.absorb_cookies(&response);
        Ok(response)
    }

    /// Resolve the URL and attach auth, client, session, token and cookie headers
    fn prepare(&self, spec: &RequestSpec, csrf: Option<&str>) -> Result<OutgoingRequest, AdtError> {
        let url = self.session.url_for(&spec.path, &spec.query)?;
        let credentials = self.session.credentials();

        let mut headers: Vec<(String, String)> = vec![
            (HEADER_AUTHORIZATION.to_string(), credentials.basic_auth_header()),
            (HEADER_SAP_CLIENT.to_string(), credentials.client.clone()),
            (HEADER_SAP_LANGUAGE.to_string(), credentials.language.clone()),
            (
                HEADER_SESSION_TYPE.to_string(),
                spec.session_type.header_value().to_string(),
            ),
        ];
        if let Some(id) = &spec.connection_id {
            headers.push((HEADER_CONNECTION_ID.to_string(), id.clone()));
        }
        if let Some(token) = csrf {
            headers.push((HEADER_CSRF_TOKEN.to_string(), token.to_string()));
        }
        if let Some(cookies) = self.session.cookie_header() {
            headers.push((HEADER_COOKIE.to_string(), cookies));
        }

        for (name, value) in &spec.headers {
            if is_session_critical(name) {
                warn!(
                    header = %name,
                    path = %spec.path,
                    "Dropping caller header that collides with a session header; use override_header"
                );
                continue;
            }
            headers.push((name.clone(), value.clone()));
        }

        for (name, value) in &spec.overrides {
            warn!(header = %name, path = %spec.path, "Caller overrides session header");
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
            headers.push((name.clone(), value.clone()));
        }

        Ok(OutgoingRequest {
            method: spec.method,
            url,
            headers,
            body: spec.body.clone(),
        })
    }
}

fn is_session_critical(name: &str) -> bool {
    SESSION_CRITICAL_HEADERS
        .iter()
        .any(|critical| critical.eq_ignore_ascii_case(name))
}

/// 403 carrying either `x-csrf-token: Required` or the validation-failed text
pub fn is_csrf_rejection(response: &Response) -> bool {
    if response.status != 403 {
        return false;
    }
    let header_marker = response
        .header(HEADER_CSRF_TOKEN)
        .map(|v| v.trim().eq_ignore_ascii_case("required"))
        .unwrap_or(false);
    header_marker
        || response
            .body
            .to_ascii_lowercase()
            .contains("csrf token validation failed")
}
