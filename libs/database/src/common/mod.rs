//! Utilities shared by the connection helpers

pub mod retry;

pub use retry::{RetryConfig, retry, retry_with_backoff};
