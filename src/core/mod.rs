//! Core domain kernel.
//!
//! Request and response models, the error taxonomy and the retry policy.
//! Nothing here performs I/O on its own.

pub mod errors;
pub mod models;
pub mod resilience;
