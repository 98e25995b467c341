//! Database connectivity for the killrvideo workspace
//!
//! # Features
//!
//! - `cassandra` (default) - Cassandra session management with the `scylla` driver
//! - `config` - `CassandraConfig` loading through `core_config::FromEnv`
//! - `tls` - TLS connections using OpenSSL
//!
//! # Example
//!
//! ```ignore
//! use database::cassandra;
//!
//! let session = cassandra::connect(&["127.0.0.1:9042"]).await?;
//! let info = cassandra::get_cluster_info(&session).await?;
//! ```

pub mod common;

#[cfg(feature = "cassandra")]
pub mod cassandra;

pub use common::{RetryConfig, retry, retry_with_backoff};
