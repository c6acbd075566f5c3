//! Shared submission-notifier domain primitives.
//!
//! This crate owns message parsing, object key layout, the status record
//! contract and the notification templates. It intentionally excludes AWS
//! SDK, HTTP and Lambda runtime concerns.

pub mod contract;
pub mod message;
pub mod notification;
pub mod storage_keys;
