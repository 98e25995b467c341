//! Immutable schema descriptors
//!
//! Descriptors are built once with the consuming builder methods below and are
//! only ever read afterwards. Each descriptor can check its own invariants with
//! `validate`; cross-descriptor checks live in [`SchemaCatalogue`](crate::SchemaCatalogue).

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use strum::Display;

use crate::error::DefinitionError;
use crate::types::ColumnType;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]{0,47}$").expect("identifier pattern is valid")
});

/// Check that `name` is a valid unquoted CQL identifier
pub fn validate_identifier(name: &str) -> Result<(), DefinitionError> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(DefinitionError::InvalidIdentifier(name.to_string()))
    }
}

/// Check the identifiers and sizes nested inside a column or field type
fn validate_column_type(
    owner: &str,
    column: &str,
    column_type: &ColumnType,
) -> Result<(), DefinitionError> {
    match column_type {
        ColumnType::Frozen(name) => validate_identifier(name),
        ColumnType::Vector(0) => Err(DefinitionError::InvalidVectorDimension {
            owner: owner.to_string(),
            column: column.to_string(),
        }),
        ColumnType::Set(inner) | ColumnType::List(inner) => {
            validate_column_type(owner, column, inner)
        }
        ColumnType::Map(key, value) => {
            validate_column_type(owner, column, key)?;
            validate_column_type(owner, column, value)
        }
        _ => Ok(()),
    }
}

/// Keyspace replication settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationStrategy {
    Simple { replication_factor: u32 },
    NetworkTopology { datacenters: Vec<(String, u32)> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyspaceDescriptor {
    pub name: String,
    pub replication: ReplicationStrategy,
    pub durable_writes: bool,
}

impl KeyspaceDescriptor {
    /// SimpleStrategy keyspace with durable writes enabled
    pub fn simple(name: impl Into<String>, replication_factor: u32) -> Self {
        Self {
            name: name.into(),
            replication: ReplicationStrategy::Simple { replication_factor },
            durable_writes: true,
        }
    }

    /// NetworkTopologyStrategy keyspace with durable writes enabled
    pub fn network_topology<S: Into<String>>(
        name: impl Into<String>,
        datacenters: Vec<(S, u32)>,
    ) -> Self {
        Self {
            name: name.into(),
            replication: ReplicationStrategy::NetworkTopology {
                datacenters: datacenters
                    .into_iter()
                    .map(|(dc, factor)| (dc.into(), factor))
                    .collect(),
            },
            durable_writes: true,
        }
    }

    pub fn with_durable_writes(mut self, durable_writes: bool) -> Self {
        self.durable_writes = durable_writes;
        self
    }

    pub fn validate(&self) -> Result<(), DefinitionError> {
        validate_identifier(&self.name)?;

        let factors: Vec<u32> = match &self.replication {
            ReplicationStrategy::Simple { replication_factor } => vec![*replication_factor],
            ReplicationStrategy::NetworkTopology { datacenters } => {
                datacenters.iter().map(|(_, factor)| *factor).collect()
            }
        };
        if factors.is_empty() || factors.contains(&0) {
            return Err(DefinitionError::InvalidReplicationFactor(self.name.clone()));
        }
        Ok(())
    }
}

/// A user-defined type: ordered `(field, type)` pairs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserTypeDescriptor {
    pub name: String,
    pub fields: Vec<(String, ColumnType)>,
}

impl UserTypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.fields.push((name.into(), column_type));
        self
    }

    pub fn validate(&self) -> Result<(), DefinitionError> {
        validate_identifier(&self.name)?;
        if self.fields.is_empty() {
            return Err(DefinitionError::EmptyType(self.name.clone()));
        }

        let mut seen = HashSet::new();
        for (field, column_type) in &self.fields {
            validate_identifier(field)?;
            if !seen.insert(field.as_str()) {
                return Err(DefinitionError::DuplicateField {
                    type_name: self.name.clone(),
                    field: field.clone(),
                });
            }
            if column_type.is_counter() {
                return Err(DefinitionError::CounterInUserType {
                    type_name: self.name.clone(),
                    field: field.clone(),
                });
            }
            validate_column_type(&self.name, field, column_type)?;
        }
        Ok(())
    }
}

/// Sort direction of a clustering column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ClusteringOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegularColumn {
    pub name: String,
    pub column_type: ColumnType,
    pub is_static: bool,
}

/// A table definition
///
/// # Example
/// ```
/// use cql_schema::{ClusteringOrder, ColumnType, TableDescriptor};
///
/// let table = TableDescriptor::new("comments_by_video")
///     .partition_key("videoid", ColumnType::Uuid)
///     .clustering_column("commentid", ColumnType::TimeUuid)
///     .column("userid", ColumnType::Uuid)
///     .column("comment", ColumnType::Text)
///     .clustering_order("commentid", ClusteringOrder::Desc);
/// assert!(table.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: String,
    pub partition_key: Vec<Column>,
    pub clustering_columns: Vec<Column>,
    pub columns: Vec<RegularColumn>,
    /// Explicit sort directions; clustering columns without one sort ascending
    pub clustering_order: Vec<(String, ClusteringOrder)>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partition_key: Vec::new(),
            clustering_columns: Vec::new(),
            columns: Vec::new(),
            clustering_order: Vec::new(),
        }
    }

    pub fn partition_key(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.partition_key.push(Column {
            name: name.into(),
            column_type,
        });
        self
    }

    pub fn clustering_column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.clustering_columns.push(Column {
            name: name.into(),
            column_type,
        });
        self
    }

    pub fn column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.columns.push(RegularColumn {
            name: name.into(),
            column_type,
            is_static: false,
        });
        self
    }

    /// A column shared by every row of a partition
    pub fn static_column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.columns.push(RegularColumn {
            name: name.into(),
            column_type,
            is_static: true,
        });
        self
    }

    pub fn clustering_order(mut self, column: impl Into<String>, order: ClusteringOrder) -> Self {
        self.clustering_order.push((column.into(), order));
        self
    }

    /// Effective direction of a clustering column
    pub fn order_of(&self, column: &str) -> ClusteringOrder {
        self.clustering_order
            .iter()
            .rev()
            .find(|(name, _)| name == column)
            .map(|(_, order)| *order)
            .unwrap_or(ClusteringOrder::Asc)
    }

    /// Every column name in declaration order: partition key, clustering, regular
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.partition_key
            .iter()
            .map(|c| c.name.as_str())
            .chain(self.clustering_columns.iter().map(|c| c.name.as_str()))
            .chain(self.columns.iter().map(|c| c.name.as_str()))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_names().any(|column| column == name)
    }

    /// User-defined types referenced by any column
    pub fn referenced_udts(&self) -> Vec<&str> {
        let key_types = self
            .partition_key
            .iter()
            .chain(self.clustering_columns.iter())
            .map(|c| &c.column_type);
        let regular_types = self.columns.iter().map(|c| &c.column_type);

        key_types
            .chain(regular_types)
            .flat_map(|t| t.referenced_udts())
            .collect()
    }

    pub fn validate(&self) -> Result<(), DefinitionError> {
        validate_identifier(&self.name)?;

        if self.partition_key.is_empty() {
            return Err(DefinitionError::MissingPartitionKey(self.name.clone()));
        }

        let mut seen = HashSet::new();
        for column in self.column_names() {
            validate_identifier(column)?;
            if !seen.insert(column) {
                return Err(DefinitionError::DuplicateColumn {
                    table: self.name.clone(),
                    column: column.to_string(),
                });
            }
        }

        let key_types = self
            .partition_key
            .iter()
            .chain(self.clustering_columns.iter())
            .map(|c| (&c.name, &c.column_type));
        let regular_types = self.columns.iter().map(|c| (&c.name, &c.column_type));
        for (column, column_type) in key_types.chain(regular_types) {
            validate_column_type(&self.name, column, column_type)?;
        }

        for key in self.partition_key.iter().chain(self.clustering_columns.iter()) {
            let reason = if key.column_type.is_counter() {
                Some("counter columns cannot be keys")
            } else if key.column_type.is_collection() {
                Some("non-frozen collections cannot be keys")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(DefinitionError::InvalidKeyColumn {
                    table: self.name.clone(),
                    column: key.name.clone(),
                    reason,
                });
            }
        }

        if self.clustering_columns.is_empty()
            && let Some(column) = self.columns.iter().find(|c| c.is_static)
        {
            return Err(DefinitionError::StaticWithoutClustering {
                table: self.name.clone(),
                column: column.name.clone(),
            });
        }

        let counters = self.columns.iter().filter(|c| c.column_type.is_counter()).count();
        if counters > 0 && counters != self.columns.len() {
            return Err(DefinitionError::MixedCounterColumns(self.name.clone()));
        }

        for (column, _) in &self.clustering_order {
            if !self.clustering_columns.iter().any(|c| &c.name == column) {
                return Err(DefinitionError::InvalidKeyColumn {
                    table: self.name.clone(),
                    column: column.clone(),
                    reason: "clustering order set on a non-clustering column",
                });
            }
        }

        Ok(())
    }
}

/// A secondary index, optionally backed by a custom index class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDescriptor {
    pub name: String,
    pub table: String,
    pub column: String,
    /// Custom index implementation, e.g. `StorageAttachedIndex`
    pub using: Option<String>,
}

impl IndexDescriptor {
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            column: column.into(),
            using: None,
        }
    }

    pub fn using(mut self, class: impl Into<String>) -> Self {
        self.using = Some(class.into());
        self
    }

    pub fn validate(&self) -> Result<(), DefinitionError> {
        validate_identifier(&self.name)?;
        validate_identifier(&self.table)?;
        validate_identifier(&self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> TableDescriptor {
        TableDescriptor::new("users")
            .partition_key("email", ColumnType::Text)
            .column("firstname", ColumnType::Text)
            .column("lastname", ColumnType::Text)
    }

    #[test]
    fn test_identifiers() {
        assert!(validate_identifier("comments_by_video").is_ok());
        assert!(validate_identifier("v2").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("2fast").is_err());
        assert!(validate_identifier("users; DROP KEYSPACE x").is_err());
        assert!(validate_identifier(&"a".repeat(49)).is_err());
    }

    #[test]
    fn test_valid_table() {
        assert!(users().validate().is_ok());
        assert_eq!(
            users().column_names().collect::<Vec<_>>(),
            vec!["email", "firstname", "lastname"]
        );
    }

    #[test]
    fn test_missing_partition_key() {
        let table = TableDescriptor::new("orphans").column("value", ColumnType::Text);
        assert_eq!(
            table.validate(),
            Err(DefinitionError::MissingPartitionKey("orphans".to_string()))
        );
    }

    #[test]
    fn test_duplicate_column_across_key_and_regular() {
        let table = users().column("email", ColumnType::Text);
        assert_eq!(
            table.validate(),
            Err(DefinitionError::DuplicateColumn {
                table: "users".to_string(),
                column: "email".to_string(),
            })
        );
    }

    #[test]
    fn test_static_requires_clustering() {
        let table = TableDescriptor::new("files")
            .partition_key("filename", ColumnType::Text)
            .static_column("extension", ColumnType::Text);
        assert!(matches!(
            table.validate(),
            Err(DefinitionError::StaticWithoutClustering { .. })
        ));

        let table = table.clustering_column("upload", ColumnType::Timestamp);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_counter_rules() {
        let mixed = TableDescriptor::new("videos_views")
            .partition_key("videoid", ColumnType::Uuid)
            .column("views", ColumnType::Counter)
            .column("title", ColumnType::Text);
        assert_eq!(
            mixed.validate(),
            Err(DefinitionError::MixedCounterColumns("videos_views".to_string()))
        );

        let counter_key = TableDescriptor::new("bad").partition_key("n", ColumnType::Counter);
        assert!(matches!(
            counter_key.validate(),
            Err(DefinitionError::InvalidKeyColumn { .. })
        ));
    }

    #[test]
    fn test_collection_key_rejected() {
        let table = TableDescriptor::new("tagged")
            .partition_key("tags", ColumnType::set_of(ColumnType::Text));
        assert!(matches!(
            table.validate(),
            Err(DefinitionError::InvalidKeyColumn { reason, .. }) if reason.contains("collections")
        ));
    }

    #[test]
    fn test_clustering_order_must_target_clustering_column() {
        let table = users().clustering_order("firstname", ClusteringOrder::Desc);
        assert!(matches!(
            table.validate(),
            Err(DefinitionError::InvalidKeyColumn { column, .. }) if column == "firstname"
        ));
    }

    #[test]
    fn test_order_of_defaults_to_asc() {
        let table = TableDescriptor::new("events")
            .partition_key("day", ColumnType::Text)
            .clustering_column("ts", ColumnType::Timestamp)
            .clustering_column("id", ColumnType::TimeUuid)
            .clustering_order("id", ClusteringOrder::Desc);
        assert_eq!(table.order_of("ts"), ClusteringOrder::Asc);
        assert_eq!(table.order_of("id"), ClusteringOrder::Desc);
    }

    #[test]
    fn test_user_type_validation() {
        let udt = UserTypeDescriptor::new("video_format")
            .field("width", ColumnType::Int)
            .field("height", ColumnType::Int);
        assert!(udt.validate().is_ok());

        let duplicate = udt.clone().field("width", ColumnType::Int);
        assert!(matches!(
            duplicate.validate(),
            Err(DefinitionError::DuplicateField { .. })
        ));

        assert_eq!(
            UserTypeDescriptor::new("empty").validate(),
            Err(DefinitionError::EmptyType("empty".to_string()))
        );
    }

    #[test]
    fn test_frozen_type_name_must_be_identifier() {
        let table = TableDescriptor::new("t")
            .partition_key("id", ColumnType::Int)
            .column("f", ColumnType::frozen_udt("x>, y int); DROP KEYSPACE killrvideo; --"));
        assert!(matches!(
            table.validate(),
            Err(DefinitionError::InvalidIdentifier(name)) if name.starts_with("x>")
        ));

        let nested = TableDescriptor::new("t")
            .partition_key("id", ColumnType::Int)
            .column(
                "formats",
                ColumnType::map_of(ColumnType::Text, ColumnType::frozen_udt("bad name")),
            );
        assert!(matches!(
            nested.validate(),
            Err(DefinitionError::InvalidIdentifier(_))
        ));

        let udt = UserTypeDescriptor::new("wrapper").field("inner", ColumnType::frozen_udt("a-b"));
        assert_eq!(
            udt.validate(),
            Err(DefinitionError::InvalidIdentifier("a-b".to_string()))
        );
    }

    #[test]
    fn test_vector_needs_a_dimension() {
        let table = TableDescriptor::new("t")
            .partition_key("id", ColumnType::Int)
            .column("v", ColumnType::Vector(0));
        assert_eq!(
            table.validate(),
            Err(DefinitionError::InvalidVectorDimension {
                owner: "t".to_string(),
                column: "v".to_string(),
            })
        );

        let table = TableDescriptor::new("t")
            .partition_key("id", ColumnType::Int)
            .column("v", ColumnType::Vector(14));
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_counter_field_in_user_type() {
        let udt = UserTypeDescriptor::new("u").field("c", ColumnType::Counter);
        assert_eq!(
            udt.validate(),
            Err(DefinitionError::CounterInUserType {
                type_name: "u".to_string(),
                field: "c".to_string(),
            })
        );
    }

    #[test]
    fn test_keyspace_replication_factor() {
        assert!(KeyspaceDescriptor::simple("killrvideo", 1).validate().is_ok());
        assert!(KeyspaceDescriptor::simple("killrvideo", 0).validate().is_err());
        assert!(
            KeyspaceDescriptor::network_topology("ks", vec![("dc1", 3), ("dc2", 0)])
                .validate()
                .is_err()
        );
        assert!(
            KeyspaceDescriptor::network_topology::<&str>("ks", vec![])
                .validate()
                .is_err()
        );
    }
}
