use thiserror::Error;

/// Boxed driver error carried by [`SchemaError::OperationFailed`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A descriptor that cannot produce valid DDL
///
/// Detected before any statement is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("'{0}' is not a valid CQL identifier")]
    InvalidIdentifier(String),

    #[error("Table '{0}' has no partition key column")]
    MissingPartitionKey(String),

    #[error("Column '{column}' is declared more than once in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    #[error("Field '{field}' is declared more than once in type '{type_name}'")]
    DuplicateField { type_name: String, field: String },

    #[error("Type '{0}' has no fields")]
    EmptyType(String),

    #[error("Static column '{column}' in table '{table}' requires a clustering column")]
    StaticWithoutClustering { table: String, column: String },

    #[error("Table '{0}' mixes counter and non-counter regular columns")]
    MixedCounterColumns(String),

    #[error("Column '{column}' in table '{table}' cannot be part of the primary key: {reason}")]
    InvalidKeyColumn {
        table: String,
        column: String,
        reason: &'static str,
    },

    #[error("Vector column '{column}' in '{owner}' must have at least one dimension")]
    InvalidVectorDimension { owner: String, column: String },

    #[error("Field '{field}' of type '{type_name}' cannot be a counter")]
    CounterInUserType { type_name: String, field: String },

    #[error("Replication factor must be positive (keyspace '{0}')")]
    InvalidReplicationFactor(String),

    #[error("'{referrer}' references undeclared type '{type_name}'")]
    UnknownType { referrer: String, type_name: String },

    #[error("Index '{index}' targets unknown column '{table}.{column}'")]
    UnknownIndexTarget {
        index: String,
        table: String,
        column: String,
    },
}

/// Error type for schema provisioning
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Invalid schema definition: {0}")]
    Definition(#[from] DefinitionError),

    /// The database (or the connection to it) failed the statement
    #[error("Schema operation failed: {statement}")]
    OperationFailed {
        statement: String,
        #[source]
        source: BoxError,
    },
}

impl SchemaError {
    pub fn operation_failed(statement: impl Into<String>, source: impl Into<BoxError>) -> Self {
        SchemaError::OperationFailed {
            statement: statement.into(),
            source: source.into(),
        }
    }
}

pub type SchemaResult<T> = Result<T, SchemaError>;
