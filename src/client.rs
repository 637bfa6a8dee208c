// Protocol client facade used by tool handlers

use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::Config;
use crate::core::errors::AdtError;
use crate::core::models::{RequestSpec, Response};
use crate::core::resilience::RetryPolicy;
use crate::executor::{RequestExecutor, DISCOVERY_PATH};
use crate::lock::{LockManager, LockedObject};
use crate::session::{Credentials, Session};
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::xml::{self, XmlNode};

const XML_CONTENT_TYPE: &str = "application/xml";

/// Session-, token- and lock-aware client for one ADT backend
///
/// Cheap to clone; clones share the session.
#[derive(Clone)]
pub struct AdtClient {
    executor: Arc<RequestExecutor>,
    locks: LockManager,
}

impl AdtClient {
    /// Build a client talking to the backend described by `config`
    pub fn from_config(config: &Config) -> Result<Self, AdtError> {
        let session = Session::new(
            &config.base_endpoint(),
            Credentials::new(
                config.username.clone(),
                config.password().to_string(),
                config.client.clone(),
                config.language.clone(),
            ),
        )?;
        let transport = ReqwestTransport::new(
            Duration::from_secs(config.request_timeout_secs),
            config.insecure_tls,
        )?;

        info!(
            endpoint = %session.base_endpoint(),
            client = %config.client,
            insecure_tls = config.insecure_tls,
            "ADT client configured"
        );
        Ok(Self::with_transport(session, Arc::new(transport), config.retry_policy()))
    }

    /// Build a client over any transport
    pub fn with_transport(
        session: Session,
        transport: Arc<dyn HttpTransport>,
        retry: RetryPolicy,
    ) -> Self {
        let executor = Arc::new(RequestExecutor::new(Arc::new(session), transport, retry));
        let locks = LockManager::new(executor.clone());
        Self { executor, locks }
    }

    pub fn session(&self) -> &Session {
        self.executor.session()
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.locks
    }

    /// Execute `spec` and return the response whatever its status
    pub async fn request(&self, spec: &RequestSpec) -> Result<Response, AdtError> {
        self.executor.execute(spec).await
    }

    /// Execute `spec`, turning non-2xx responses into errors
    pub async fn send(&self, spec: &RequestSpec) -> Result<Response, AdtError> {
        self.request(spec).await?.error_for_status()
    }

    pub async fn get(&self, path: &str) -> Result<Response, AdtError> {
        self.send(&RequestSpec::get(path)).await
    }

    pub async fn post(&self, path: &str, body: impl Into<String>) -> Result<Response, AdtError> {
        self.send(
            &RequestSpec::post(path)
                .content_type(XML_CONTENT_TYPE)
                .body(body),
        )
        .await
    }

    pub async fn put(&self, path: &str, body: impl Into<String>) -> Result<Response, AdtError> {
        self.send(
            &RequestSpec::put(path)
                .content_type(XML_CONTENT_TYPE)
                .body(body),
        )
        .await
    }

    pub async fn delete(&self, path: &str) -> Result<Response, AdtError> {
        self.send(&RequestSpec::delete(path)).await
    }

    /// Lock `object_uri`, run `mutation`, and always attempt to unlock
    pub async fn with_lock<T, F, Fut>(&self, object_uri: &str, mutation: F) -> Result<T, AdtError>
    where
        F: FnOnce(LockedObject) -> Fut,
        Fut: Future<Output = Result<T, AdtError>>,
    {
        self.locks.with_lock(object_uri, mutation).await
    }

    /// Current CSRF token, fetched on demand
    pub async fn csrf_token(&self) -> Result<String, AdtError> {
        self.executor.ensure_token().await
    }

    /// Fetch and parse the service discovery document
    pub async fn discover(&self) -> Result<XmlNode, AdtError> {
        let response = self
            .send(&RequestSpec::get(DISCOVERY_PATH).accept("application/atomsvc+xml"))
            .await?;
        xml::parse(&response.body)
    }

    pub fn build_xml(tree: &Value) -> Result<String, AdtError> {
        xml::build(tree)
    }

    pub fn parse_xml(text: &str) -> Result<XmlNode, AdtError> {
        xml::parse(text)
    }
}
