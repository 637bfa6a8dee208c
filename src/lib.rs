//! ADT client: session, CSRF and lock handling for ABAP development backends.
//!
//! Every request goes through one [`executor::RequestExecutor`], which keeps
//! cookies, the CSRF token and the session-type headers consistent. Edits of
//! remote objects run inside [`lock::LockManager::with_lock`].

pub mod client;
pub mod config;
pub mod core;
pub mod executor;
pub mod lock;
pub mod session;
pub mod transport;
pub mod xml;

pub use client::AdtClient;
pub use crate::core::errors::{AdtError, ErrorKind};
