use async_trait::async_trait;
use scylla::client::session::Session;

use crate::error::{SchemaError, SchemaResult};
use crate::statement::SchemaStatement;

/// Something that can run a single DDL statement
///
/// Implemented for the driver session; tests substitute a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CqlExecutor: Send + Sync {
    async fn execute(&self, statement: &SchemaStatement) -> SchemaResult<()>;
}

#[async_trait]
impl CqlExecutor for Session {
    async fn execute(&self, statement: &SchemaStatement) -> SchemaResult<()> {
        self.query_unpaged(statement.cql.as_str(), &[])
            .await
            .map_err(|e| SchemaError::operation_failed(statement.cql.clone(), e))?;
        Ok(())
    }
}
