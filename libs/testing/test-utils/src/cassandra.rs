//! Cassandra test infrastructure
//!
//! Provides a `TestCassandra` helper that starts a single Cassandra node for testing.

use database::RetryConfig;
use database::cassandra::{CassandraSession, connect_with_retry};
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

const CQL_PORT: u16 = 9042;
const IMAGE: &str = "cassandra";
const TAG: &str = "5.0";
const READY_MESSAGE: &str = "Starting listening for CQL clients";

/// Test Cassandra wrapper that ensures proper cleanup
///
/// The container is automatically stopped and removed when this struct is dropped.
///
/// # Example
///
/// ```no_run
/// use test_utils::TestCassandra;
///
/// # async fn example() {
/// let cassandra = TestCassandra::new().await;
/// let session = cassandra.session();
///
/// session
///     .query_unpaged("SELECT release_version FROM system.local", &[])
///     .await
///     .unwrap();
/// # }
/// ```
pub struct TestCassandra {
    #[allow(dead_code)]
    container: ContainerAsync<GenericImage>,
    session: CassandraSession,
    pub contact_point: String,
}

impl TestCassandra {
    /// Start a Cassandra 5.0 node and connect to it
    ///
    /// The node accepts CQL a few seconds after the ready message, so the
    /// connection is retried with [`RetryConfig::for_node_startup`].
    pub async fn new() -> Self {
        let container = GenericImage::new(IMAGE, TAG)
            .with_exposed_port(CQL_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stdout(READY_MESSAGE))
            .with_env_var("CASSANDRA_DC", database::cassandra::DEFAULT_DATACENTER)
            .with_env_var("MAX_HEAP_SIZE", "512M")
            .with_env_var("HEAP_NEWSIZE", "128M")
            .start()
            .await
            .expect("Failed to start Cassandra container");

        let host_port = container
            .get_host_port_ipv4(CQL_PORT.tcp())
            .await
            .expect("Failed to get Cassandra port");

        let contact_point = format!("127.0.0.1:{}", host_port);

        let session = connect_with_retry(&[&contact_point], Some(RetryConfig::for_node_startup()))
            .await
            .expect("Failed to connect to Cassandra");

        tracing::info!(port = host_port, "Test Cassandra ready (cassandra {TAG})");

        Self {
            container,
            session,
            contact_point,
        }
    }

    /// Get a shared session handle (useful for passing to repositories)
    pub fn session(&self) -> CassandraSession {
        self.session.clone()
    }

    /// Get the contact point for manual session creation
    pub fn contact_point(&self) -> &str {
        &self.contact_point
    }
}

// Container is automatically cleaned up when TestCassandra is dropped
impl Drop for TestCassandra {
    fn drop(&mut self) {
        tracing::debug!("Cleaning up test Cassandra container");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::cassandra::{check_health_detailed, keyspace_exists};

    #[tokio::test]
    #[ignore] // Requires Docker
    async fn test_cassandra_starts_and_answers() {
        let cassandra = TestCassandra::new().await;
        let session = cassandra.session();

        let health = check_health_detailed(&session).await;
        assert!(health.healthy, "{:?}", health.message);
        assert!(health.version.is_some());
        assert!(keyspace_exists(&session, "system").await.unwrap());
    }
}
