use crate::core::models::{Method, RequestSpec};

/// An exclusive edit lock on one remote object
///
/// Not `Clone`: [`LockManager::unlock`](super::LockManager::unlock) consumes it,
/// so a released handle cannot be unlocked twice.
#[derive(Debug, PartialEq, Eq)]
pub struct LockHandle {
    object_uri: String,
    handle: String,
    connection_id: String,
    transport: Option<String>,
    is_local: bool,
}

impl LockHandle {
    pub fn new(
        object_uri: impl Into<String>,
        handle: impl Into<String>,
        connection_id: impl Into<String>,
        transport: Option<String>,
        is_local: bool,
    ) -> Self {
        Self {
            object_uri: object_uri.into(),
            handle: handle.into(),
            connection_id: connection_id.into(),
            transport,
            is_local,
        }
    }

    pub fn object_uri(&self) -> &str {
        &self.object_uri
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// Transport request (`CORRNR`) the backend associated with the lock
    pub fn transport(&self) -> Option<&str> {
        self.transport.as_deref()
    }

    /// Object lives in a local package and needs no transport
    pub fn is_local(&self) -> bool {
        self.is_local
    }

    /// View of this lock handed to a mutation
    pub fn context(&self) -> LockedObject {
        LockedObject {
            object_uri: self.object_uri.clone(),
            handle: self.handle.clone(),
            connection_id: self.connection_id.clone(),
            transport: self.transport.clone(),
        }
    }
}

/// What a mutation inside `with_lock` needs to issue its request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedObject {
    object_uri: String,
    handle: String,
    connection_id: String,
    transport: Option<String>,
}

impl LockedObject {
    pub fn object_uri(&self) -> &str {
        &self.object_uri
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    pub fn transport(&self) -> Option<&str> {
        self.transport.as_deref()
    }

    /// Stateful request carrying `lockHandle`, the shared connection id, and
    /// `corrNr` when the lock named a transport
    pub fn request(&self, method: Method, path: impl Into<String>) -> RequestSpec {
        let mut spec = RequestSpec::new(method, path)
            .query("lockHandle", self.handle.as_str())
            .stateful()
            .connection_id(self.connection_id.as_str());
        if let Some(transport) = &self.transport {
            spec = spec.query("corrNr", transport.as_str());
        }
        spec
    }

    /// `PUT <object>/source/main` with plain-text source
    pub fn put_source(&self, source: impl Into<String>) -> RequestSpec {
        let path = format!("{}/source/main", self.object_uri.trim_end_matches('/'));
        self.request(Method::Put, path)
            .content_type("text/plain; charset=utf-8")
            .body(source)
    }
}
