//! Videos Domain
//!
//! Users, videos, comments, view counters, stored files and the pet supply
//! vector table of the killrvideo keyspace. Table and column names come from `cql_schema::catalogue`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │   Service   │  ← Validation, id generation, not-found/conflict rules
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← Data access (trait + Cassandra implementation)
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← Row mappings, UDTs, DTOs
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use database::cassandra::{CassandraConfig, connect_from_config};
//! use domain_videos::{CassandraUserRepository, UserService};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CassandraConfig::with_keyspace(vec!["127.0.0.1:9042"], "killrvideo");
//! let session = connect_from_config(&config).await?;
//!
//! let repository = CassandraUserRepository::new(session).await?;
//! let service = UserService::new(repository);
//! # Ok(())
//! # }
//! ```

pub mod cassandra;
pub mod error;
pub mod models;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use cassandra::{
    CassandraCommentRepository, CassandraFileRepository, CassandraPetSupplyRepository,
    CassandraUserRepository, CassandraVideoRepository, CassandraVideoViewsRepository,
};
pub use error::{VideoError, VideoResult};
pub use models::{
    Comment, CommentByUser, CommentByVideo, CreateUser, CreateVideo, NewComment, Page, PageToken,
    PetSupply, StoredFile, User, Video, VideoFormat, VideoWithViews, validate_vector,
};
pub use repository::{
    CommentRepository, FileRepository, PetSupplyRepository, UserRepository, VideoRepository,
    VideoViewsRepository,
};
pub use service::{
    CommentService, DEFAULT_PAGE_SIZE, PetSupplyService, UserService, VideoService,
};
