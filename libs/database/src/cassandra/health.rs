use scylla::client::session::Session;
use serde::Serialize;
use std::net::SocketAddr;
use std::time::Instant;

use super::connector::CassandraError;

const LOCAL_QUERY: &str =
    "SELECT cluster_name, data_center, rack, release_version FROM system.local";

/// Health check result
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    /// Error details when unhealthy
    pub message: Option<String>,
    pub response_time_ms: u64,
    /// Release version reported by the coordinator
    pub version: Option<String>,
}

/// Returns true if the coordinator answers a `system.local` query
pub async fn check_health(session: &Session) -> bool {
    session
        .query_unpaged("SELECT release_version FROM system.local", &[])
        .await
        .is_ok()
}

/// Check health with latency and version information
///
/// Healthy only when the coordinator returned a decodable `system.local` row.
pub async fn check_health_detailed(session: &Session) -> HealthStatus {
    let start = Instant::now();
    let local = local_row(session).await;
    health_status(local, start.elapsed().as_millis() as u64)
}

fn health_status(
    local: Result<Option<LocalRow>, CassandraError>,
    response_time_ms: u64,
) -> HealthStatus {
    let (healthy, message, version) = match local {
        Ok(Some((_, _, _, version))) => (true, None, version),
        Ok(None) => (false, Some("system.local returned no row".to_string()), None),
        Err(e) => (false, Some(e.to_string()), None),
    };

    HealthStatus {
        healthy,
        message,
        response_time_ms,
        version,
    }
}

/// A node known to the driver
#[derive(Debug, Clone, Serialize)]
pub struct NodeInfo {
    pub address: String,
    pub datacenter: Option<String>,
    pub rack: Option<String>,
}

/// Cluster metadata as seen from the coordinator and the driver's topology view
#[derive(Debug, Clone, Serialize)]
pub struct ClusterInfo {
    pub cluster_name: Option<String>,
    pub datacenter: Option<String>,
    pub rack: Option<String>,
    pub release_version: Option<String>,
    pub nodes: Vec<NodeInfo>,
}

type LocalRow = (
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

async fn local_row(session: &Session) -> Result<Option<LocalRow>, CassandraError> {
    let rows = session
        .query_unpaged(LOCAL_QUERY, &[])
        .await?
        .into_rows_result()
        .map_err(|e| CassandraError::UnexpectedResponse(e.to_string()))?;

    rows.maybe_first_row::<LocalRow>()
        .map_err(|e| CassandraError::UnexpectedResponse(e.to_string()))
}

/// Get cluster information
///
/// # Example
/// ```ignore
/// use database::cassandra::{connect, get_cluster_info};
///
/// let session = connect(&["127.0.0.1:9042"]).await?;
/// let info = get_cluster_info(&session).await?;
/// println!("{:?} ({} nodes)", info.cluster_name, info.nodes.len());
/// ```
pub async fn get_cluster_info(session: &Session) -> Result<ClusterInfo, CassandraError> {
    let (cluster_name, datacenter, rack, release_version) =
        local_row(session).await?.unwrap_or_default();

    let nodes = session
        .get_cluster_state()
        .get_nodes_info()
        .iter()
        .map(|node| NodeInfo {
            address: SocketAddr::new(node.address.ip(), node.address.port()).to_string(),
            datacenter: node.datacenter.clone(),
            rack: node.rack.clone(),
        })
        .collect();

    Ok(ClusterInfo {
        cluster_name,
        datacenter,
        rack,
        release_version,
        nodes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassandra::connect;

    #[test]
    fn test_health_status_requires_a_decoded_row() {
        let row = (
            Some("Test Cluster".to_string()),
            Some("datacenter1".to_string()),
            Some("rack1".to_string()),
            Some("5.0.2".to_string()),
        );
        let status = health_status(Ok(Some(row)), 3);
        assert!(status.healthy);
        assert_eq!(status.version.as_deref(), Some("5.0.2"));
        assert_eq!(status.response_time_ms, 3);

        let status = health_status(Ok(None), 3);
        assert!(!status.healthy);
        assert!(status.message.is_some());

        let status = health_status(
            Err(CassandraError::UnexpectedResponse("not a rows result".to_string())),
            3,
        );
        assert!(!status.healthy);
        assert_eq!(
            status.message.as_deref(),
            Some("Unexpected response: not a rows result")
        );
        assert!(status.version.is_none());
    }

    #[tokio::test]
    #[ignore] // Requires actual Cassandra
    async fn test_check_health_detailed() {
        let session = connect(&["127.0.0.1:9042"]).await.unwrap();

        assert!(check_health(&session).await);
        let status = check_health_detailed(&session).await;
        assert!(status.healthy);
        assert!(status.message.is_none());
        assert!(status.version.is_some());
    }

    #[tokio::test]
    #[ignore] // Requires actual Cassandra
    async fn test_local_row_is_decoded() {
        let session = connect(&["127.0.0.1:9042"]).await.unwrap();

        let (cluster_name, datacenter, _, release_version) =
            local_row(&session).await.unwrap().unwrap();
        assert!(cluster_name.is_some());
        assert!(datacenter.is_some());
        assert!(release_version.is_some());
    }

    #[tokio::test]
    #[ignore] // Requires actual Cassandra
    async fn test_get_cluster_info() {
        let session = connect(&["127.0.0.1:9042"]).await.unwrap();

        let info = get_cluster_info(&session).await.unwrap();
        assert!(info.cluster_name.is_some());
        assert!(!info.nodes.is_empty());
        for node in &info.nodes {
            assert!(node.address.parse::<SocketAddr>().is_ok(), "{}", node.address);
        }
    }
}
