//! AWS-oriented adapters and handlers for submission notifications.
//!
//! This crate owns runtime integration details (the Lambda handler, the
//! artifact download, object store, status table and email adapters) and
//! re-exports the core crate as `runtime` for message, key and template
//! primitives.

pub mod adapters;
pub mod config;
pub mod handlers;

pub use submission_notifier_core as runtime;
