//! CQL statement builder
//!
//! Pure functions turning descriptors into idempotent DDL. Nothing here talks to
//! the database; every function validates its input first and fails with a
//! [`DefinitionError`] instead of producing an invalid statement.

use std::fmt;
use strum::Display;

use crate::descriptor::{
    IndexDescriptor, KeyspaceDescriptor, ReplicationStrategy, TableDescriptor, UserTypeDescriptor,
    validate_identifier,
};
use crate::error::DefinitionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum StatementKind {
    CreateKeyspace,
    CreateType,
    CreateTable,
    CreateIndex,
    DropKeyspace,
    DropType,
    DropTable,
    DropIndex,
    Truncate,
}

/// A rendered statement together with what it acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaStatement {
    pub kind: StatementKind,
    /// Possibly keyspace-qualified name of the object
    pub target: String,
    pub cql: String,
}

impl fmt::Display for SchemaStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cql)
    }
}

fn qualify(keyspace: Option<&str>, name: &str) -> Result<String, DefinitionError> {
    validate_identifier(name)?;
    match keyspace {
        Some(keyspace) => {
            validate_identifier(keyspace)?;
            Ok(format!("{keyspace}.{name}"))
        }
        None => Ok(name.to_string()),
    }
}

fn statement(kind: StatementKind, target: String, cql: String) -> SchemaStatement {
    SchemaStatement { kind, target, cql }
}

pub fn create_keyspace(keyspace: &KeyspaceDescriptor) -> Result<SchemaStatement, DefinitionError> {
    keyspace.validate()?;

    let replication = match &keyspace.replication {
        ReplicationStrategy::Simple { replication_factor } => format!(
            "{{'class': 'SimpleStrategy', 'replication_factor': {replication_factor}}}"
        ),
        ReplicationStrategy::NetworkTopology { datacenters } => {
            let factors: Vec<String> = datacenters
                .iter()
                .map(|(dc, factor)| format!(", '{}': {factor}", dc.replace('\'', "''")))
                .collect();
            format!("{{'class': 'NetworkTopologyStrategy'{}}}", factors.concat())
        }
    };

    let cql = format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {} AND durable_writes = {};",
        keyspace.name, replication, keyspace.durable_writes
    );
    Ok(statement(StatementKind::CreateKeyspace, keyspace.name.clone(), cql))
}

pub fn create_type(
    user_type: &UserTypeDescriptor,
    keyspace: Option<&str>,
) -> Result<SchemaStatement, DefinitionError> {
    user_type.validate()?;
    let target = qualify(keyspace, &user_type.name)?;

    let fields: Vec<String> = user_type
        .fields
        .iter()
        .map(|(name, column_type)| format!("{name} {column_type}"))
        .collect();

    let cql = format!("CREATE TYPE IF NOT EXISTS {target} ({});", fields.join(", "));
    Ok(statement(StatementKind::CreateType, target, cql))
}

pub fn create_table(
    table: &TableDescriptor,
    keyspace: Option<&str>,
) -> Result<SchemaStatement, DefinitionError> {
    table.validate()?;
    let target = qualify(keyspace, &table.name)?;

    let mut definitions: Vec<String> = table
        .partition_key
        .iter()
        .chain(table.clustering_columns.iter())
        .map(|c| format!("{} {}", c.name, c.column_type))
        .collect();
    definitions.extend(table.columns.iter().map(|c| {
        if c.is_static {
            format!("{} {} static", c.name, c.column_type)
        } else {
            format!("{} {}", c.name, c.column_type)
        }
    }));

    let partition: Vec<&str> = table.partition_key.iter().map(|c| c.name.as_str()).collect();
    let partition = if partition.len() == 1 {
        partition[0].to_string()
    } else {
        format!("({})", partition.join(", "))
    };
    let mut primary_key = vec![partition];
    primary_key.extend(table.clustering_columns.iter().map(|c| c.name.clone()));
    definitions.push(format!("PRIMARY KEY ({})", primary_key.join(", ")));

    let mut cql = format!(
        "CREATE TABLE IF NOT EXISTS {target} ({})",
        definitions.join(", ")
    );

    if !table.clustering_order.is_empty() {
        let order: Vec<String> = table
            .clustering_columns
            .iter()
            .map(|c| format!("{} {}", c.name, table.order_of(&c.name)))
            .collect();
        cql.push_str(&format!(" WITH CLUSTERING ORDER BY ({})", order.join(", ")));
    }
    cql.push(';');

    Ok(statement(StatementKind::CreateTable, target, cql))
}

pub fn create_index(
    index: &IndexDescriptor,
    keyspace: Option<&str>,
) -> Result<SchemaStatement, DefinitionError> {
    index.validate()?;
    let table = qualify(keyspace, &index.table)?;

    let cql = match &index.using {
        Some(class) => format!(
            "CREATE CUSTOM INDEX IF NOT EXISTS {} ON {table} ({}) USING '{}';",
            index.name,
            index.column,
            class.replace('\'', "''")
        ),
        None => format!(
            "CREATE INDEX IF NOT EXISTS {} ON {table} ({});",
            index.name, index.column
        ),
    };
    Ok(statement(StatementKind::CreateIndex, index.name.clone(), cql))
}

pub fn drop_keyspace(name: &str) -> Result<SchemaStatement, DefinitionError> {
    validate_identifier(name)?;
    let cql = format!("DROP KEYSPACE IF EXISTS {name};");
    Ok(statement(StatementKind::DropKeyspace, name.to_string(), cql))
}

pub fn drop_type(name: &str, keyspace: Option<&str>) -> Result<SchemaStatement, DefinitionError> {
    let target = qualify(keyspace, name)?;
    let cql = format!("DROP TYPE IF EXISTS {target};");
    Ok(statement(StatementKind::DropType, target, cql))
}

pub fn drop_table(name: &str, keyspace: Option<&str>) -> Result<SchemaStatement, DefinitionError> {
    let target = qualify(keyspace, name)?;
    let cql = format!("DROP TABLE IF EXISTS {target};");
    Ok(statement(StatementKind::DropTable, target, cql))
}

pub fn drop_index(name: &str, keyspace: Option<&str>) -> Result<SchemaStatement, DefinitionError> {
    let target = qualify(keyspace, name)?;
    let cql = format!("DROP INDEX IF EXISTS {target};");
    Ok(statement(StatementKind::DropIndex, target, cql))
}

pub fn truncate(table: &str, keyspace: Option<&str>) -> Result<SchemaStatement, DefinitionError> {
    let target = qualify(keyspace, table)?;
    let cql = format!("TRUNCATE {target};");
    Ok(statement(StatementKind::Truncate, target, cql))
}
