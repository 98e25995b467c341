//! Schema catalogue and provisioning for the killrvideo keyspace
//!
//! - [`catalogue`] declares every name and descriptor of the keyspace
//! - [`statement`] renders descriptors into idempotent CQL
//! - [`SchemaProvisioner`] applies them through a [`CqlExecutor`]
//!
//! # Example
//!
//! ```ignore
//! use cql_schema::{SchemaCatalogue, SchemaProvisioner};
//!
//! let catalogue = SchemaCatalogue::killrvideo();
//! let provisioner = SchemaProvisioner::new(session.as_ref());
//! provisioner.ensure_keyspace(&catalogue.keyspace).await?;
//! provisioner
//!     .with_keyspace(&catalogue.keyspace.name)
//!     .provision(&catalogue)
//!     .await?;
//! ```

pub mod catalogue;
pub mod descriptor;
pub mod error;
pub mod executor;
pub mod provisioner;
pub mod statement;
pub mod types;

pub use catalogue::SchemaCatalogue;
pub use descriptor::{
    ClusteringOrder, Column, IndexDescriptor, KeyspaceDescriptor, RegularColumn,
    ReplicationStrategy, TableDescriptor, UserTypeDescriptor, validate_identifier,
};
pub use error::{BoxError, DefinitionError, SchemaError, SchemaResult};
pub use executor::CqlExecutor;
pub use provisioner::{ProvisionReport, SchemaProvisioner, plan, teardown_plan};
pub use statement::{SchemaStatement, StatementKind};
pub use types::ColumnType;
