//! Cassandra connection management and helpers
//!
//! Uses the `scylla` driver, which speaks the native protocol of both Apache
//! Cassandra and ScyllaDB.
//!
//! # Example
//!
//! ```ignore
//! use database::cassandra::{connect_from_config, CassandraConfig};
//!
//! let config = CassandraConfig::with_keyspace(vec!["127.0.0.1:9042"], "killrvideo")
//!     .with_datacenter("datacenter1")
//!     .with_credentials("user", "password");
//! let session = connect_from_config(&config).await?;
//!
//! session.query_unpaged("SELECT * FROM users", &[]).await?;
//! ```

mod config;
mod connector;
mod health;
mod metadata;

pub use config::{CassandraConfig, DEFAULT_DATACENTER};
pub use connector::{
    CassandraError, CassandraSession, connect, connect_from_config, connect_from_config_with_retry,
    connect_with_retry, use_keyspace,
};
pub use health::{
    ClusterInfo, HealthStatus, NodeInfo, check_health, check_health_detailed, get_cluster_info,
};
pub use metadata::{keyspace_exists, table_names, user_type_names};

// Re-export scylla types for convenience
pub use scylla::client::session::Session;
pub use scylla::client::session_builder::SessionBuilder;
