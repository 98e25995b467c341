use chrono::{SubsecRound, Utc};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::error::{VideoError, VideoResult};
use crate::models::{
    Comment, CreateUser, CreateVideo, NewComment, Page, PageToken, PetSupply, User, Video,
    VideoWithViews, validate_vector,
};
use crate::repository::{
    CommentRepository, PetSupplyRepository, UserRepository, VideoRepository, VideoViewsRepository,
};

/// Default page size for listings
pub const DEFAULT_PAGE_SIZE: i32 = 100;

/// Service layer for users
#[derive(Clone)]
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// Register a new user; an email can only be registered once
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: CreateUser) -> VideoResult<User> {
        input
            .validate()
            .map_err(|e| VideoError::Validation(e.to_string()))?;

        let user = User::from(input);
        if !self.repository.create_if_not_exists(&user).await? {
            return Err(VideoError::AlreadyExists(user.email));
        }
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, email: &str) -> VideoResult<User> {
        self.repository
            .find(email)
            .await?
            .ok_or_else(|| VideoError::NotFound(format!("user {email}")))
    }

    /// Change a last name, failing if it was modified concurrently
    #[instrument(skip(self))]
    pub async fn change_lastname(
        &self,
        email: &str,
        expected: &str,
        lastname: &str,
    ) -> VideoResult<()> {
        if lastname.trim().is_empty() {
            return Err(VideoError::Validation("last name cannot be empty".to_string()));
        }

        if self
            .repository
            .update_lastname_if(email, expected, lastname)
            .await?
        {
            return Ok(());
        }

        if self.repository.exists(email).await? {
            Err(VideoError::Validation(format!(
                "last name of {email} is no longer '{expected}'"
            )))
        } else {
            Err(VideoError::NotFound(format!("user {email}")))
        }
    }

    pub async fn list_users(&self) -> VideoResult<Vec<User>> {
        self.repository.list(DEFAULT_PAGE_SIZE).await
    }

    /// One page of users; pass the returned token back to continue
    pub async fn list_users_page(
        &self,
        page_size: i32,
        token: Option<PageToken>,
    ) -> VideoResult<Page<User>> {
        self.repository.list_page(page_size, token).await
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, email: &str) -> VideoResult<()> {
        if !self.repository.exists(email).await? {
            return Err(VideoError::NotFound(format!("user {email}")));
        }
        self.repository.delete(email).await
    }
}

/// Service layer for videos and their view counters
#[derive(Clone)]
pub struct VideoService<V: VideoRepository, W: VideoViewsRepository> {
    videos: Arc<V>,
    views: Arc<W>,
}

impl<V: VideoRepository, W: VideoViewsRepository> VideoService<V, W> {
    pub fn new(videos: V, views: W) -> Self {
        Self {
            videos: Arc::new(videos),
            views: Arc::new(views),
        }
    }

    /// Publish a video with a random id, uploaded now
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn publish(&self, input: CreateVideo) -> VideoResult<Video> {
        input
            .validate()
            .map_err(|e| VideoError::Validation(e.to_string()))?;

        // timestamp columns keep milliseconds
        let video = input.into_video(Uuid::new_v4(), Utc::now().trunc_subsecs(3));
        self.videos.create(&video).await?;
        Ok(video)
    }

    #[instrument(skip(self))]
    pub async fn get_video(&self, videoid: Uuid) -> VideoResult<VideoWithViews> {
        let video = self
            .videos
            .find(videoid)
            .await?
            .ok_or_else(|| VideoError::NotFound(format!("video {videoid}")))?;
        let views = self.views.views(videoid).await?;
        Ok(VideoWithViews { video, views })
    }

    pub async fn record_view(&self, videoid: Uuid) -> VideoResult<()> {
        self.views.increment(videoid, 1).await
    }

    pub async fn list_videos(&self) -> VideoResult<Vec<Video>> {
        self.videos.list(DEFAULT_PAGE_SIZE).await
    }

    /// Delete a video and its counter
    #[instrument(skip(self))]
    pub async fn delete_video(&self, videoid: Uuid) -> VideoResult<()> {
        if self.videos.find(videoid).await?.is_none() {
            return Err(VideoError::NotFound(format!("video {videoid}")));
        }
        self.videos.delete(videoid).await?;
        self.views.delete(videoid).await
    }
}

/// Service layer for comments
#[derive(Clone)]
pub struct CommentService<R: CommentRepository> {
    repository: Arc<R>,
    node_id: [u8; 6],
}

impl<R: CommentRepository> CommentService<R> {
    /// Comment ids are v1 UUIDs stamped with a node id chosen per service
    pub fn new(repository: R) -> Self {
        let random = Uuid::new_v4();
        let mut node_id = [0u8; 6];
        node_id.copy_from_slice(&random.as_bytes()[..6]);
        Self::with_node_id(repository, node_id)
    }

    pub fn with_node_id(repository: R, node_id: [u8; 6]) -> Self {
        Self {
            repository: Arc::new(repository),
            node_id,
        }
    }

    #[instrument(skip(self, input), fields(videoid = %input.videoid, userid = %input.userid))]
    pub async fn post(&self, input: NewComment) -> VideoResult<Comment> {
        input
            .validate()
            .map_err(|e| VideoError::Validation(e.to_string()))?;

        let comment = Comment {
            videoid: input.videoid,
            userid: input.userid,
            commentid: Uuid::now_v1(&self.node_id),
            comment: input.comment,
        };
        self.repository.add(&comment).await?;
        Ok(comment)
    }

    pub async fn delete(&self, comment: &Comment) -> VideoResult<()> {
        self.repository.delete(comment).await
    }

    pub async fn for_video(&self, videoid: Uuid) -> VideoResult<Vec<Comment>> {
        self.repository.list_by_video(videoid).await
    }

    pub async fn by_user(&self, userid: Uuid) -> VideoResult<Vec<Comment>> {
        self.repository.list_by_user(userid).await
    }
}

/// Service layer for the pet supply catalogue and its similarity search
#[derive(Clone)]
pub struct PetSupplyService<R: PetSupplyRepository> {
    repository: Arc<R>,
}

impl<R: PetSupplyRepository> PetSupplyService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    #[instrument(skip(self, product), fields(product_id = %product.product_id))]
    pub async fn add(&self, product: PetSupply) -> VideoResult<PetSupply> {
        if product.product_id.trim().is_empty() {
            return Err(VideoError::Validation("product id cannot be empty".to_string()));
        }
        validate_vector(&product.product_vector)?;

        self.repository.insert(&product).await?;
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, product_id: &str) -> VideoResult<PetSupply> {
        self.repository
            .find(product_id)
            .await?
            .ok_or_else(|| VideoError::NotFound(format!("product {product_id}")))
    }

    /// Products closest to an existing one, excluding the product itself
    #[instrument(skip(self))]
    pub async fn similar_to(&self, product_id: &str, limit: i32) -> VideoResult<Vec<PetSupply>> {
        if limit <= 0 {
            return Err(VideoError::Validation(format!(
                "limit must be positive, got {limit}"
            )));
        }

        let product = self.get(product_id).await?;
        // the product is its own nearest neighbour
        let mut similar = self
            .repository
            .similar(&product.product_vector, limit.saturating_add(1))
            .await?;
        similar.retain(|candidate| candidate.product_id != product.product_id);
        similar.truncate(limit as usize);
        Ok(similar)
    }
}
