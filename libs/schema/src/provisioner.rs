//! Idempotent schema provisioning
//!
//! Every statement issued here is a `IF NOT EXISTS` / `IF EXISTS` form, so a
//! sequence can be re-run after a partial failure. Sequences are not
//! transactional: the first failing statement aborts the sequence and the ones
//! before it stay applied.

use tracing::{info, instrument};

use crate::catalogue::SchemaCatalogue;
use crate::descriptor::{IndexDescriptor, KeyspaceDescriptor, TableDescriptor, UserTypeDescriptor};
use crate::error::{DefinitionError, SchemaResult};
use crate::executor::CqlExecutor;
use crate::statement::{self, SchemaStatement, StatementKind};

/// Statements applied by [`SchemaProvisioner::provision`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    pub applied: Vec<SchemaStatement>,
}

impl ProvisionReport {
    pub fn count(&self, kind: StatementKind) -> usize {
        self.applied.iter().filter(|s| s.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Statements [`SchemaProvisioner::provision`] runs, in order
///
/// Types first, then tables, then indexes. The keyspace itself is not
/// included; it is created separately with
/// [`SchemaProvisioner::ensure_keyspace`].
pub fn plan(
    catalogue: &SchemaCatalogue,
    keyspace: Option<&str>,
) -> Result<Vec<SchemaStatement>, DefinitionError> {
    catalogue.validate()?;

    let mut statements = Vec::new();
    for user_type in &catalogue.user_types {
        statements.push(statement::create_type(user_type, keyspace)?);
    }
    for table in &catalogue.tables {
        statements.push(statement::create_table(table, keyspace)?);
    }
    for index in &catalogue.indexes {
        statements.push(statement::create_index(index, keyspace)?);
    }
    Ok(statements)
}

/// Statements [`SchemaProvisioner::teardown`] runs, in order
pub fn teardown_plan(
    catalogue: &SchemaCatalogue,
    keyspace: Option<&str>,
) -> Result<Vec<SchemaStatement>, DefinitionError> {
    let mut statements = Vec::new();
    for index in catalogue.indexes.iter().rev() {
        statements.push(statement::drop_index(&index.name, keyspace)?);
    }
    for table in catalogue.tables.iter().rev() {
        statements.push(statement::drop_table(&table.name, keyspace)?);
    }
    for user_type in catalogue.user_types.iter().rev() {
        statements.push(statement::drop_type(&user_type.name, keyspace)?);
    }
    Ok(statements)
}

/// Applies descriptors through a [`CqlExecutor`]
///
/// # Example
/// ```ignore
/// use cql_schema::{SchemaCatalogue, SchemaProvisioner};
///
/// let catalogue = SchemaCatalogue::killrvideo();
/// let provisioner = SchemaProvisioner::new(session.as_ref());
/// provisioner.ensure_keyspace(&catalogue.keyspace).await?;
///
/// let provisioner = provisioner.with_keyspace(&catalogue.keyspace.name);
/// let report = provisioner.provision(&catalogue).await?;
/// ```
pub struct SchemaProvisioner<'a, E: CqlExecutor + ?Sized> {
    executor: &'a E,
    keyspace: Option<String>,
}

impl<'a, E: CqlExecutor + ?Sized> SchemaProvisioner<'a, E> {
    pub fn new(executor: &'a E) -> Self {
        Self {
            executor,
            keyspace: None,
        }
    }

    /// Qualify every type, table and index name with `keyspace`
    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = Some(keyspace.into());
        self
    }

    pub fn keyspace(&self) -> Option<&str> {
        self.keyspace.as_deref()
    }

    async fn apply(&self, statement: SchemaStatement) -> SchemaResult<SchemaStatement> {
        self.executor.execute(&statement).await?;
        info!(kind = %statement.kind, target = %statement.target, "Applied schema statement");
        Ok(statement)
    }

    #[instrument(skip(self, keyspace), fields(keyspace = %keyspace.name))]
    pub async fn ensure_keyspace(&self, keyspace: &KeyspaceDescriptor) -> SchemaResult<()> {
        self.apply(statement::create_keyspace(keyspace)?).await?;
        Ok(())
    }

    #[instrument(skip(self, user_type), fields(user_type = %user_type.name))]
    pub async fn ensure_type(&self, user_type: &UserTypeDescriptor) -> SchemaResult<()> {
        self.apply(statement::create_type(user_type, self.keyspace())?)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, table), fields(table = %table.name))]
    pub async fn ensure_table(&self, table: &TableDescriptor) -> SchemaResult<()> {
        self.apply(statement::create_table(table, self.keyspace())?)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, index), fields(index = %index.name))]
    pub async fn ensure_index(&self, index: &IndexDescriptor) -> SchemaResult<()> {
        self.apply(statement::create_index(index, self.keyspace())?)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn drop_table_if_exists(&self, name: &str) -> SchemaResult<()> {
        self.apply(statement::drop_table(name, self.keyspace())?)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn drop_type_if_exists(&self, name: &str) -> SchemaResult<()> {
        self.apply(statement::drop_type(name, self.keyspace())?)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn drop_index_if_exists(&self, name: &str) -> SchemaResult<()> {
        self.apply(statement::drop_index(name, self.keyspace())?)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn drop_keyspace_if_exists(&self, name: &str) -> SchemaResult<()> {
        self.apply(statement::drop_keyspace(name)?).await?;
        Ok(())
    }

    /// Remove every row from `table`, keeping its schema
    #[instrument(skip(self))]
    pub async fn truncate(&self, table: &str) -> SchemaResult<()> {
        self.apply(statement::truncate(table, self.keyspace())?)
            .await?;
        Ok(())
    }

    /// Create every type, table and index of the catalogue
    ///
    /// The whole catalogue is validated and rendered before the first statement
    /// is sent.
    #[instrument(skip(self, catalogue), fields(keyspace = %catalogue.keyspace.name))]
    pub async fn provision(&self, catalogue: &SchemaCatalogue) -> SchemaResult<ProvisionReport> {
        let mut report = ProvisionReport::default();
        for statement in plan(catalogue, self.keyspace())? {
            report.applied.push(self.apply(statement).await?);
        }

        info!(statements = report.applied.len(), "Schema provisioned");
        Ok(report)
    }

    /// Drop indexes, tables and types in reverse dependency order
    #[instrument(skip(self, catalogue), fields(keyspace = %catalogue.keyspace.name))]
    pub async fn teardown(&self, catalogue: &SchemaCatalogue) -> SchemaResult<()> {
        for statement in teardown_plan(catalogue, self.keyspace())? {
            self.apply(statement).await?;
        }
        Ok(())
    }

    /// Truncate every table of the catalogue
    #[instrument(skip(self, catalogue), fields(keyspace = %catalogue.keyspace.name))]
    pub async fn truncate_all(&self, catalogue: &SchemaCatalogue) -> SchemaResult<()> {
        let statements = catalogue
            .tables
            .iter()
            .map(|table| statement::truncate(&table.name, self.keyspace()))
            .collect::<Result<Vec<_>, _>>()?;

        for statement in statements {
            self.apply(statement).await?;
        }
        Ok(())
    }
}
