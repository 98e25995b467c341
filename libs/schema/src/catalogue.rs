//! The killrvideo schema
//!
//! Every keyspace, type, table, column and index name used anywhere in the
//! workspace is declared here. Each table gets a module holding its name and
//! column constants plus the descriptor constructor.

use crate::descriptor::{
    ClusteringOrder, IndexDescriptor, KeyspaceDescriptor, TableDescriptor, UserTypeDescriptor,
};
use crate::error::DefinitionError;
use crate::types::ColumnType;

pub const KEYSPACE: &str = "killrvideo";
pub const REPLICATION_FACTOR: u32 = 1;

pub fn keyspace() -> KeyspaceDescriptor {
    KeyspaceDescriptor::simple(KEYSPACE, REPLICATION_FACTOR)
}

pub mod video_format {
    pub const NAME: &str = "video_format";
    pub const WIDTH: &str = "width";
    pub const HEIGHT: &str = "height";
}

pub fn video_format() -> UserTypeDescriptor {
    UserTypeDescriptor::new(video_format::NAME)
        .field(video_format::WIDTH, ColumnType::Int)
        .field(video_format::HEIGHT, ColumnType::Int)
}

pub mod users {
    use super::*;

    pub const NAME: &str = "users";
    pub const EMAIL: &str = "email";
    pub const FIRSTNAME: &str = "firstname";
    pub const LASTNAME: &str = "lastname";

    pub fn table() -> TableDescriptor {
        TableDescriptor::new(NAME)
            .partition_key(EMAIL, ColumnType::Text)
            .column(FIRSTNAME, ColumnType::Text)
            .column(LASTNAME, ColumnType::Text)
    }
}

pub mod videos {
    use super::*;

    pub const NAME: &str = "videos";
    pub const VIDEOID: &str = "videoid";
    pub const TITLE: &str = "title";
    pub const UPLOAD: &str = "upload";
    pub const EMAIL: &str = "email";
    pub const URL: &str = "url";
    pub const TAGS: &str = "tags";
    pub const FRAMES: &str = "frames";
    pub const FORMATS: &str = "formats";

    pub fn table() -> TableDescriptor {
        TableDescriptor::new(NAME)
            .partition_key(VIDEOID, ColumnType::Uuid)
            .column(TITLE, ColumnType::Text)
            .column(UPLOAD, ColumnType::Timestamp)
            .column(EMAIL, ColumnType::Text)
            .column(URL, ColumnType::Text)
            .column(TAGS, ColumnType::set_of(ColumnType::Text))
            .column(FRAMES, ColumnType::list_of(ColumnType::Int))
            .column(
                FORMATS,
                ColumnType::map_of(ColumnType::Text, ColumnType::frozen_udt(video_format::NAME)),
            )
    }
}

pub mod videos_views {
    use super::*;

    pub const NAME: &str = "videos_views";
    pub const VIDEOID: &str = "videoid";
    pub const VIEWS: &str = "views";

    pub fn table() -> TableDescriptor {
        TableDescriptor::new(NAME)
            .partition_key(VIDEOID, ColumnType::Uuid)
            .column(VIEWS, ColumnType::Counter)
    }
}

pub mod comments_by_video {
    use super::*;

    pub const NAME: &str = "comments_by_video";
    pub const VIDEOID: &str = "videoid";
    pub const COMMENTID: &str = "commentid";
    pub const USERID: &str = "userid";
    pub const COMMENT: &str = "comment";

    pub fn table() -> TableDescriptor {
        TableDescriptor::new(NAME)
            .partition_key(VIDEOID, ColumnType::Uuid)
            .clustering_column(COMMENTID, ColumnType::TimeUuid)
            .column(USERID, ColumnType::Uuid)
            .column(COMMENT, ColumnType::Text)
            .clustering_order(COMMENTID, ClusteringOrder::Desc)
    }
}

pub mod comments_by_user {
    use super::*;

    pub const NAME: &str = "comments_by_user";
    pub const USERID: &str = "userid";
    pub const COMMENTID: &str = "commentid";
    pub const VIDEOID: &str = "videoid";
    pub const COMMENT: &str = "comment";

    pub fn table() -> TableDescriptor {
        TableDescriptor::new(NAME)
            .partition_key(USERID, ColumnType::Uuid)
            .clustering_column(COMMENTID, ColumnType::TimeUuid)
            .column(VIDEOID, ColumnType::Uuid)
            .column(COMMENT, ColumnType::Text)
            .clustering_order(COMMENTID, ClusteringOrder::Desc)
    }
}

pub mod files {
    use super::*;

    pub const NAME: &str = "files";
    pub const FILENAME: &str = "filename";
    pub const UPLOAD: &str = "upload";
    pub const EXTENSION: &str = "extension";
    pub const BINARY: &str = "binary";

    pub fn table() -> TableDescriptor {
        TableDescriptor::new(NAME)
            .partition_key(FILENAME, ColumnType::Text)
            .clustering_column(UPLOAD, ColumnType::Timestamp)
            .static_column(EXTENSION, ColumnType::Text)
            .column(BINARY, ColumnType::Blob)
            .clustering_order(UPLOAD, ClusteringOrder::Desc)
    }
}

pub mod pet_supply_vectors {
    use super::*;

    pub const NAME: &str = "pet_supply_vectors";
    pub const PRODUCT_ID: &str = "product_id";
    pub const PRODUCT_NAME: &str = "product_name";
    pub const PRODUCT_VECTOR: &str = "product_vector";
    pub const DIMENSION: usize = 14;
    pub const INDEX: &str = "idx_vector";
    pub const INDEX_CLASS: &str = "StorageAttachedIndex";

    pub fn table() -> TableDescriptor {
        TableDescriptor::new(NAME)
            .partition_key(PRODUCT_ID, ColumnType::Text)
            .column(PRODUCT_NAME, ColumnType::Text)
            .column(PRODUCT_VECTOR, ColumnType::Vector(DIMENSION))
    }

    pub fn index() -> IndexDescriptor {
        IndexDescriptor::new(INDEX, NAME, PRODUCT_VECTOR).using(INDEX_CLASS)
    }
}

/// A complete schema in dependency order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaCatalogue {
    pub keyspace: KeyspaceDescriptor,
    pub user_types: Vec<UserTypeDescriptor>,
    pub tables: Vec<TableDescriptor>,
    pub indexes: Vec<IndexDescriptor>,
}

impl SchemaCatalogue {
    pub fn killrvideo() -> Self {
        Self {
            keyspace: keyspace(),
            user_types: vec![video_format()],
            tables: vec![
                users::table(),
                videos::table(),
                videos_views::table(),
                comments_by_video::table(),
                comments_by_user::table(),
                files::table(),
                pet_supply_vectors::table(),
            ],
            indexes: vec![pet_supply_vectors::index()],
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn user_type(&self, name: &str) -> Option<&UserTypeDescriptor> {
        self.user_types.iter().find(|t| t.name == name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    /// Validate every descriptor and the references between them
    ///
    /// A type must be declared before any type or table that freezes it, and
    /// every index must target a declared column.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        self.keyspace.validate()?;

        let mut declared: Vec<&str> = Vec::new();
        for user_type in &self.user_types {
            user_type.validate()?;
            for (_, field_type) in &user_type.fields {
                check_declared(&user_type.name, field_type.referenced_udts(), &declared)?;
            }
            declared.push(&user_type.name);
        }

        for table in &self.tables {
            table.validate()?;
            check_declared(&table.name, table.referenced_udts(), &declared)?;
        }

        for index in &self.indexes {
            index.validate()?;
            let targets_column = self
                .table(&index.table)
                .is_some_and(|table| table.has_column(&index.column));
            if !targets_column {
                return Err(DefinitionError::UnknownIndexTarget {
                    index: index.name.clone(),
                    table: index.table.clone(),
                    column: index.column.clone(),
                });
            }
        }

        Ok(())
    }
}

fn check_declared(
    referrer: &str,
    referenced: Vec<&str>,
    declared: &[&str],
) -> Result<(), DefinitionError> {
    match referenced.into_iter().find(|name| !declared.contains(name)) {
        Some(type_name) => Err(DefinitionError::UnknownType {
            referrer: referrer.to_string(),
            type_name: type_name.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_killrvideo_catalogue_is_valid() {
        let catalogue = SchemaCatalogue::killrvideo();
        assert!(catalogue.validate().is_ok());
        assert_eq!(catalogue.keyspace.name, "killrvideo");
        assert_eq!(catalogue.tables.len(), 7);
    }

    #[test]
    fn test_lookups() {
        let catalogue = SchemaCatalogue::killrvideo();
        let comments = catalogue.table(comments_by_video::NAME).unwrap();
        assert_eq!(comments.partition_key[0].name, "videoid");
        assert_eq!(comments.order_of("commentid"), ClusteringOrder::Desc);

        let udt = catalogue.user_type("video_format").unwrap();
        assert_eq!(udt.fields.len(), 2);

        assert!(catalogue.table("missing").is_none());
        assert!(catalogue.user_type("missing").is_none());
    }

    #[test]
    fn test_table_names_in_dependency_order() {
        let catalogue = SchemaCatalogue::killrvideo();
        let names: Vec<&str> = catalogue.table_names().collect();
        assert_eq!(names.first(), Some(&"users"));
        assert!(names.contains(&"files"));
    }

    #[test]
    fn test_undeclared_udt_is_rejected() {
        let mut catalogue = SchemaCatalogue::killrvideo();
        catalogue.user_types.clear();
        assert_eq!(
            catalogue.validate(),
            Err(DefinitionError::UnknownType {
                referrer: "videos".to_string(),
                type_name: "video_format".to_string(),
            })
        );
    }

    #[test]
    fn test_index_target_must_exist() {
        let mut catalogue = SchemaCatalogue::killrvideo();
        catalogue
            .indexes
            .push(IndexDescriptor::new("idx_missing", "users", "nickname"));
        assert!(matches!(
            catalogue.validate(),
            Err(DefinitionError::UnknownIndexTarget { column, .. }) if column == "nickname"
        ));
    }
}
