use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::error::VideoResult;
use crate::models::{Comment, Page, PageToken, PetSupply, StoredFile, User, Video, VideoFormat};

/// Repository trait for the `users` table
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert or overwrite a user
    async fn create(&self, user: &User) -> VideoResult<()>;

    /// Insert only if no user has this email (lightweight transaction)
    ///
    /// Returns whether the insert was applied.
    async fn create_if_not_exists(&self, user: &User) -> VideoResult<bool>;

    /// Change the last name only if it currently equals `expected`
    async fn update_lastname_if(
        &self,
        email: &str,
        expected: &str,
        lastname: &str,
    ) -> VideoResult<bool>;

    async fn find(&self, email: &str) -> VideoResult<Option<User>>;

    async fn exists(&self, email: &str) -> VideoResult<bool>;

    /// Every user, fetched page by page
    async fn list(&self, page_size: i32) -> VideoResult<Vec<User>>;

    /// A single page of users, starting where `token` left off
    ///
    /// Rows come in token order, not sorted by email.
    async fn list_page(&self, page_size: i32, token: Option<PageToken>)
    -> VideoResult<Page<User>>;

    async fn delete(&self, email: &str) -> VideoResult<()>;

    /// Insert a user through `INSERT ... JSON`
    async fn insert_json(&self, user: &User) -> VideoResult<()>;
}

/// Repository trait for the `videos` table
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn create(&self, video: &Video) -> VideoResult<()>;

    async fn find(&self, videoid: Uuid) -> VideoResult<Option<Video>>;

    /// Every video, fetched page by page
    async fn list(&self, page_size: i32) -> VideoResult<Vec<Video>>;

    /// Add tags to the set, keeping existing ones
    async fn add_tags(&self, videoid: Uuid, tags: BTreeSet<String>) -> VideoResult<()>;

    /// Set one entry of the formats map
    async fn put_format(&self, videoid: Uuid, name: &str, format: VideoFormat)
    -> VideoResult<()>;

    async fn delete(&self, videoid: Uuid) -> VideoResult<()>;
}

/// Repository trait for the two comment tables
///
/// Writes go to both tables in one logged batch so the projections stay in sync.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn add(&self, comment: &Comment) -> VideoResult<()>;

    async fn delete(&self, comment: &Comment) -> VideoResult<()>;

    /// Comments on a video, newest first
    async fn list_by_video(&self, videoid: Uuid) -> VideoResult<Vec<Comment>>;

    /// Comments by a user, newest first
    async fn list_by_user(&self, userid: Uuid) -> VideoResult<Vec<Comment>>;
}

/// Repository trait for the `videos_views` counter table
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoViewsRepository: Send + Sync {
    async fn increment(&self, videoid: Uuid, by: i64) -> VideoResult<()>;

    async fn decrement(&self, videoid: Uuid, by: i64) -> VideoResult<()>;

    /// Current count; a video never viewed has 0
    async fn views(&self, videoid: Uuid) -> VideoResult<i64>;

    async fn delete(&self, videoid: Uuid) -> VideoResult<()>;
}

/// Repository trait for the versioned `files` table
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn save(&self, file: &StoredFile) -> VideoResult<()>;

    /// Most recent version of a file
    async fn latest(&self, filename: &str) -> VideoResult<Option<StoredFile>>;

    /// Upload times of every version, newest first
    async fn versions(&self, filename: &str) -> VideoResult<Vec<DateTime<Utc>>>;
}

/// Repository trait for the `pet_supply_vectors` table
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PetSupplyRepository: Send + Sync {
    async fn insert(&self, product: &PetSupply) -> VideoResult<()>;

    async fn find(&self, product_id: &str) -> VideoResult<Option<PetSupply>>;

    /// Up to `limit` products nearest to `vector`, closest first
    async fn similar(&self, vector: &[f32], limit: i32) -> VideoResult<Vec<PetSupply>>;
}
