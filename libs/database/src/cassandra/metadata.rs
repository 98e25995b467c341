//! Schema introspection through the `system_schema` keyspace

use futures::TryStreamExt;
use scylla::client::session::Session;
use tracing::instrument;

use super::connector::CassandraError;

/// Returns true if `keyspace` exists
#[instrument(skip(session))]
pub async fn keyspace_exists(session: &Session, keyspace: &str) -> Result<bool, CassandraError> {
    let result = session
        .query_unpaged(
            "SELECT keyspace_name FROM system_schema.keyspaces WHERE keyspace_name = ?",
            (keyspace,),
        )
        .await?;

    let rows = result
        .into_rows_result()
        .map_err(|e| CassandraError::KeyspaceError(e.to_string()))?;
    Ok(rows.rows_num() > 0)
}

/// Names of the tables in `keyspace`, sorted
#[instrument(skip(session))]
pub async fn table_names(session: &Session, keyspace: &str) -> Result<Vec<String>, CassandraError> {
    names(
        session,
        "SELECT table_name FROM system_schema.tables WHERE keyspace_name = ?",
        keyspace,
    )
    .await
}

/// Names of the user-defined types in `keyspace`, sorted
#[instrument(skip(session))]
pub async fn user_type_names(
    session: &Session,
    keyspace: &str,
) -> Result<Vec<String>, CassandraError> {
    names(
        session,
        "SELECT type_name FROM system_schema.types WHERE keyspace_name = ?",
        keyspace,
    )
    .await
}

async fn names(
    session: &Session,
    query: &str,
    keyspace: &str,
) -> Result<Vec<String>, CassandraError> {
    let pager = session
        .query_iter(query, (keyspace,))
        .await
        .map_err(|e| CassandraError::KeyspaceError(e.to_string()))?;

    let mut names: Vec<String> = pager
        .rows_stream::<(String,)>()
        .map_err(|e| CassandraError::KeyspaceError(e.to_string()))?
        .map_ok(|(name,)| name)
        .try_collect()
        .await
        .map_err(|e| CassandraError::KeyspaceError(e.to_string()))?;

    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassandra::connect;

    #[tokio::test]
    #[ignore] // Requires actual Cassandra
    async fn test_system_keyspace_introspection() {
        let session = connect(&["127.0.0.1:9042"]).await.unwrap();

        assert!(keyspace_exists(&session, "system_schema").await.unwrap());
        assert!(!keyspace_exists(&session, "no_such_keyspace").await.unwrap());

        let tables = table_names(&session, "system_schema").await.unwrap();
        assert!(tables.contains(&"tables".to_string()));
    }
}
