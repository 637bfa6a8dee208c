// Lock manager - LOCK / mutate / UNLOCK protocol bound to one connection id

mod handle;

pub use handle::{LockHandle, LockedObject};

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::core::errors::{snippet, AdtError, BackendDetail};
use crate::core::models::{RequestSpec, Response, SessionType};
use crate::executor::RequestExecutor;
use crate::xml;

pub const DEFAULT_ACCESS_MODE: &str = "MODIFY";
const LOCK_ACCEPT: &str =
    "application/*,application/vnd.sap.as+xml;charset=UTF-8;dataname=com.sap.adt.lock.result";

/// Exception type the backend reports when another session holds the lock
const CONFLICT_EXCEPTION: &str = "ExceptionResourceAlreadyLocked";

/// Body fragments checked when the response is not an exception document
const CONFLICT_MARKERS: [&str; 3] = [
    "exceptionresourcealreadylocked",
    "currently editing",
    "locked by",
];

/// Fresh correlation id for one logical edit (32 hex chars)
pub fn new_connection_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Executes the lock protocol against the backend
///
/// Handles are never pooled: every [`LockManager::with_lock`] call acquires its
/// own handle under its own connection id. Concurrent edits of the same object
/// race at the backend and the loser gets `LockConflict`.
#[derive(Clone)]
pub struct LockManager {
    executor: Arc<RequestExecutor>,
}

impl LockManager {
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Acquire an edit lock under a freshly generated connection id
    pub async fn lock(&self, object_uri: &str, access_mode: &str) -> Result<LockHandle, AdtError> {
        let connection_id = new_connection_id();
        let spec = RequestSpec::post(object_uri)
            .query("_action", "LOCK")
            .query("accessMode", access_mode)
            .accept(LOCK_ACCEPT)
            .stateful()
            .connection_id(connection_id.clone());

        let response = self.executor.execute(&spec).await?;
        let handle = parse_lock_response(object_uri, connection_id, &response)?;

        info!(
            object_uri = %object_uri,
            connection_id = %handle.connection_id(),
            transport = handle.transport().unwrap_or_default(),
            "Lock acquired"
        );
        Ok(handle)
    }

    /// Release a lock; the handle is consumed whatever the outcome
    pub async fn unlock(&self, handle: LockHandle) -> Result<(), AdtError> {
        let spec = RequestSpec::post(handle.object_uri())
            .query("_action", "UNLOCK")
            .query("lockHandle", handle.handle())
            .session(SessionType::Stateless)
            .connection_id(handle.connection_id());

        let response = match self.executor.execute(&spec).await {
            Ok(response) => response,
            Err(e) => {
                return Err(AdtError::UnlockFailed {
                    object_uri: handle.object_uri().to_string(),
                    reason: e.to_string(),
                    status: e.status(),
                    body: e.body_snippet().map(str::to_string),
                })
            }
        };

        if !response.is_success() {
            let reason = BackendDetail::from_body(&response.body)
                .map(|d| d.to_string())
                .unwrap_or_else(|| "backend refused UNLOCK".to_string());
            return Err(AdtError::UnlockFailed {
                object_uri: handle.object_uri().to_string(),
                reason,
                status: Some(response.status),
                body: Some(snippet(&response.body)),
            });
        }

        info!(
            object_uri = %handle.object_uri(),
            connection_id = %handle.connection_id(),
            "Lock released"
        );
        Ok(())
    }

    /// Lock `object_uri`, run `mutation`, and always attempt to unlock
    ///
    /// The mutation receives a [`LockedObject`] whose `request()` builds stateful
    /// requests carrying the lock handle and the shared connection id. If the
    /// mutation fails, its error is returned with any unlock failure attached.
    /// If only the unlock fails, the mutation's value is returned and the
    /// failure is logged. A panicking mutation is unlocked before the panic
    /// resumes; a dropped future releases the lock from a background task,
    /// including when it is dropped while the LOCK request is still in flight.
    pub async fn with_lock<T, F, Fut>(&self, object_uri: &str, mutation: F) -> Result<T, AdtError>
    where
        F: FnOnce(LockedObject) -> Fut,
        Fut: Future<Output = Result<T, AdtError>>,
    {
        let handle = self.acquire_detached(object_uri).await?;
        let locked = handle.context();
        let mut guard = UnlockGuard {
            manager: self.clone(),
            handle: Some(handle),
        };

        let outcome = AssertUnwindSafe(async move { mutation(locked).await })
            .catch_unwind()
            .await;

        let unlocked = match guard.handle.take() {
            Some(handle) => self.unlock(handle).await,
            None => Ok(()),
        };

        match outcome {
            Ok(Ok(value)) => {
                if let Err(e) = unlocked {
                    warn!(object_uri = %object_uri, error = %e, "Unlock failed after successful mutation");
                }
                Ok(value)
            }
            Ok(Err(err)) => match unlocked {
                Ok(()) => Err(err),
                Err(unlock_err) => {
                    warn!(object_uri = %object_uri, error = %unlock_err, "Unlock failed after failed mutation");
                    Err(err.with_unlock_failure(unlock_err))
                }
            },
            Err(panic) => {
                if let Err(e) = unlocked {
                    warn!(object_uri = %object_uri, error = %e, "Unlock failed after panicking mutation");
                }
                std::panic::resume_unwind(panic)
            }
        }
    }
}

impl LockManager {
    /// Run the LOCK request on its own task
    ///
    /// The task outlives a cancelled caller: if nobody is left to receive the
    /// handle, the task releases the lock itself.
    async fn acquire_detached(&self, object_uri: &str) -> Result<LockHandle, AdtError> {
        let (sender, receiver) = oneshot::channel();
        let manager = self.clone();
        let uri = object_uri.to_string();

        tokio::spawn(async move {
            let acquired = manager.lock(&uri, DEFAULT_ACCESS_MODE).await;
            if let Err(Ok(handle)) = sender.send(acquired) {
                warn!(object_uri = %handle.object_uri(), "Edit abandoned during LOCK, releasing lock");
                if let Err(e) = manager.unlock(handle).await {
                    warn!(error = %e, "Background unlock failed");
                }
            }
        });

        receiver.await.map_err(|_| AdtError::LockFailed {
            object_uri: object_uri.to_string(),
            reason: "lock task ended without a result".to_string(),
            status: None,
            body: None,
        })?
    }
}

/// Releases a still-held lock if `with_lock` is dropped mid-flight
struct UnlockGuard {
    manager: LockManager,
    handle: Option<LockHandle>,
}

impl Drop for UnlockGuard {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(object_uri = %handle.object_uri(), "Lock abandoned outside a runtime; not released");
            return;
        };
        warn!(object_uri = %handle.object_uri(), "Edit abandoned, releasing lock in background");
        let manager = self.manager.clone();
        runtime.spawn(async move {
            if let Err(e) = manager.unlock(handle).await {
                warn!(error = %e, "Background unlock failed");
            }
        });
    }
}

/// 423, or 403/409 naming the already-locked exception
///
/// The exception type decides when the body is an exception document; the
/// text markers only apply to bodies without one.
fn is_lock_conflict(response: &Response, detail: Option<&BackendDetail>) -> bool {
    if response.status == 423 {
        return true;
    }
    if !matches!(response.status, 403 | 409) {
        return false;
    }
    if let Some(exception_type) = detail.and_then(|d| d.exception_type.as_deref()) {
        return exception_type == CONFLICT_EXCEPTION;
    }
    let body = response.body.to_ascii_lowercase();
    CONFLICT_MARKERS.iter().any(|marker| body.contains(marker))
}

/// Turn a LOCK response into a handle, or the matching lock error
fn parse_lock_response(
    object_uri: &str,
    connection_id: String,
    response: &Response,
) -> Result<LockHandle, AdtError> {
    let detail = if response.is_success() {
        None
    } else {
        BackendDetail::from_body(&response.body)
    };
    if is_lock_conflict(response, detail.as_ref()) {
        return Err(AdtError::LockConflict {
            object_uri: object_uri.to_string(),
            status: response.status,
            body: snippet(&response.body),
            detail,
        });
    }
    if !response.is_success() {
        let reason = detail
            .map(|d| d.to_string())
            .unwrap_or_else(|| "backend refused LOCK".to_string());
        return Err(AdtError::LockFailed {
            object_uri: object_uri.to_string(),
            reason,
            status: Some(response.status),
            body: Some(snippet(&response.body)),
        });
    }

    let failed = |reason: &str| AdtError::LockFailed {
        object_uri: object_uri.to_string(),
        reason: reason.to_string(),
        status: Some(response.status),
        body: Some(snippet(&response.body)),
    };

    let root = xml::parse(&response.body).map_err(|e| {
        error!(object_uri = %object_uri, error = %e, "Unparseable lock response");
        failed("unparseable lock response")
    })?;
    let handle = xml::find_text(&root, "LOCK_HANDLE")
        .ok_or_else(|| failed("lock response carried no LOCK_HANDLE"))?;
    let transport = xml::find_text(&root, "CORRNR").map(str::to_string);
    let is_local = xml::find_text(&root, "IS_LOCAL") == Some("X");

    Ok(LockHandle::new(
        object_uri,
        handle,
        connection_id,
        transport,
        is_local,
    ))
}
