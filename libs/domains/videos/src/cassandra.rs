//! Cassandra implementations of the repositories
//!
//! Each repository prepares its statements once in `new` and reuses them. The
//! session must already be using the killrvideo keyspace (or a test keyspace
//! with the same schema), since statements name tables without a keyspace.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cql_schema::catalogue::{
    comments_by_user, comments_by_video, files, pet_supply_vectors, users, videos, videos_views,
};
use database::cassandra::CassandraSession;
use futures::TryStreamExt;
use scylla::response::query_result::QueryResult;
use scylla::response::{PagingState, PagingStateResponse};
use scylla::statement::batch::{Batch, BatchType};
use scylla::statement::prepared::PreparedStatement;
use scylla::value::{Counter, CqlValue, Row};
use std::collections::BTreeSet;
use std::ops::ControlFlow;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{VideoError, VideoResult};
use crate::models::{
    Comment, CommentByUser, CommentByVideo, Page, PageToken, PetSupply, StoredFile, User, Video,
    VideoFormat, validate_vector,
};
use crate::repository::{
    CommentRepository, FileRepository, PetSupplyRepository, UserRepository, VideoRepository,
    VideoViewsRepository,
};

fn insert_cql(table: &str, columns: &[&str]) -> String {
    let markers = vec!["?"; columns.len()].join(", ");
    format!("INSERT INTO {table} ({}) VALUES ({markers})", columns.join(", "))
}

fn where_clause(keys: &[&str]) -> String {
    keys.iter()
        .map(|key| format!("{key} = ?"))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn select_cql(table: &str, columns: &[&str], keys: &[&str]) -> String {
    let mut cql = format!("SELECT {} FROM {table}", columns.join(", "));
    if !keys.is_empty() {
        cql.push_str(" WHERE ");
        cql.push_str(&where_clause(keys));
    }
    cql
}

fn delete_cql(table: &str, keys: &[&str]) -> String {
    format!("DELETE FROM {table} WHERE {}", where_clause(keys))
}

/// Read the `[applied]` column of a lightweight transaction result
fn was_applied(result: QueryResult) -> VideoResult<bool> {
    let rows = result.into_rows_result().map_err(VideoError::database)?;
    let row = rows
        .maybe_first_row::<Row>()
        .map_err(VideoError::database)?;

    match row.as_ref().and_then(|r| r.columns.first()) {
        Some(Some(CqlValue::Boolean(applied))) => Ok(*applied),
        _ => Err(VideoError::Database(
            "conditional statement returned no [applied] column".to_string(),
        )),
    }
}

fn with_page_size(statement: &PreparedStatement, page_size: i32) -> VideoResult<PreparedStatement> {
    if page_size <= 0 {
        return Err(VideoError::Validation(format!(
            "page size must be positive, got {page_size}"
        )));
    }
    let mut statement = statement.clone();
    statement.set_page_size(page_size);
    Ok(statement)
}

fn paging_state(token: Option<&PageToken>) -> VideoResult<PagingState> {
    match token {
        Some(token) => Ok(PagingState::new_from_raw_bytes(token.to_bytes()?)),
        None => Ok(PagingState::start()),
    }
}

fn next_token(response: PagingStateResponse) -> Option<PageToken> {
    match response.into_paging_control_flow() {
        ControlFlow::Continue(state) => state
            .as_bytes_slice()
            .map(|bytes| PageToken::from_bytes(bytes)),
        ControlFlow::Break(()) => None,
    }
}

// ============================================================================
// Users
// ============================================================================

const USER_COLUMNS: &[&str] = &[users::EMAIL, users::FIRSTNAME, users::LASTNAME];

pub struct CassandraUserRepository {
    session: CassandraSession,
    insert: PreparedStatement,
    insert_if_not_exists: PreparedStatement,
    update_lastname_if: PreparedStatement,
    find: PreparedStatement,
    exists: PreparedStatement,
    list: PreparedStatement,
    delete: PreparedStatement,
    insert_json: PreparedStatement,
}

impl CassandraUserRepository {
    pub async fn new(session: CassandraSession) -> VideoResult<Self> {
        let insert = insert_cql(users::NAME, USER_COLUMNS);
        let update_lastname_if = format!(
            "UPDATE {} SET {lastname} = ? WHERE {} = ? IF {lastname} = ?",
            users::NAME,
            users::EMAIL,
            lastname = users::LASTNAME,
        );

        Ok(Self {
            insert: session.prepare(insert.as_str()).await?,
            insert_if_not_exists: session.prepare(format!("{insert} IF NOT EXISTS")).await?,
            update_lastname_if: session.prepare(update_lastname_if).await?,
            find: session
                .prepare(select_cql(users::NAME, USER_COLUMNS, &[users::EMAIL]))
                .await?,
            exists: session
                .prepare(select_cql(users::NAME, &[users::EMAIL], &[users::EMAIL]))
                .await?,
            list: session.prepare(select_cql(users::NAME, USER_COLUMNS, &[])).await?,
            delete: session.prepare(delete_cql(users::NAME, &[users::EMAIL])).await?,
            insert_json: session
                .prepare(format!("INSERT INTO {} JSON ?", users::NAME))
                .await?,
            session,
        })
    }
}

#[async_trait]
impl UserRepository for CassandraUserRepository {
    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn create(&self, user: &User) -> VideoResult<()> {
        self.session.execute_unpaged(&self.insert, user).await?;
        tracing::info!("Upserted user");
        Ok(())
    }

    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn create_if_not_exists(&self, user: &User) -> VideoResult<bool> {
        let result = self
            .session
            .execute_unpaged(&self.insert_if_not_exists, user)
            .await?;
        let applied = was_applied(result)?;
        tracing::info!(applied, "Conditional user insert");
        Ok(applied)
    }

    #[instrument(skip(self))]
    async fn update_lastname_if(
        &self,
        email: &str,
        expected: &str,
        lastname: &str,
    ) -> VideoResult<bool> {
        let result = self
            .session
            .execute_unpaged(&self.update_lastname_if, (lastname, email, expected))
            .await?;
        was_applied(result)
    }

    async fn find(&self, email: &str) -> VideoResult<Option<User>> {
        self.session
            .execute_unpaged(&self.find, (email,))
            .await?
            .into_rows_result()
            .map_err(VideoError::database)?
            .maybe_first_row::<User>()
            .map_err(VideoError::database)
    }

    async fn exists(&self, email: &str) -> VideoResult<bool> {
        let rows = self
            .session
            .execute_unpaged(&self.exists, (email,))
            .await?
            .into_rows_result()
            .map_err(VideoError::database)?;
        Ok(rows.rows_num() > 0)
    }

    #[instrument(skip(self))]
    async fn list(&self, page_size: i32) -> VideoResult<Vec<User>> {
        let statement = with_page_size(&self.list, page_size)?;
        self.session
            .execute_iter(statement, &[])
            .await
            .map_err(VideoError::database)?
            .rows_stream::<User>()
            .map_err(VideoError::database)?
            .try_collect()
            .await
            .map_err(VideoError::database)
    }

    #[instrument(skip(self, token), fields(resumed = token.is_some()))]
    async fn list_page(
        &self,
        page_size: i32,
        token: Option<PageToken>,
    ) -> VideoResult<Page<User>> {
        let statement = with_page_size(&self.list, page_size)?;
        let (result, response) = self
            .session
            .execute_single_page(&statement, &[], paging_state(token.as_ref())?)
            .await?;

        let items = result
            .into_rows_result()
            .map_err(VideoError::database)?
            .rows::<User>()
            .map_err(VideoError::database)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(VideoError::database)?;

        Ok(Page {
            items,
            next: next_token(response),
        })
    }

    #[instrument(skip(self))]
    async fn delete(&self, email: &str) -> VideoResult<()> {
        self.session.execute_unpaged(&self.delete, (email,)).await?;
        Ok(())
    }

    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn insert_json(&self, user: &User) -> VideoResult<()> {
        let json = serde_json::to_string(user)?;
        self.session.execute_unpaged(&self.insert_json, (json,)).await?;
        Ok(())
    }
}

// ============================================================================
// Videos
// ============================================================================

const VIDEO_COLUMNS: &[&str] = &[
    videos::VIDEOID,
    videos::TITLE,
    videos::UPLOAD,
    videos::EMAIL,
    videos::URL,
    videos::TAGS,
    videos::FRAMES,
    videos::FORMATS,
];

pub struct CassandraVideoRepository {
    session: CassandraSession,
    insert: PreparedStatement,
    find: PreparedStatement,
    list: PreparedStatement,
    add_tags: PreparedStatement,
    put_format: PreparedStatement,
    delete: PreparedStatement,
}

impl CassandraVideoRepository {
    pub async fn new(session: CassandraSession) -> VideoResult<Self> {
        let add_tags = format!(
            "UPDATE {} SET {tags} = {tags} + ? WHERE {} = ?",
            videos::NAME,
            videos::VIDEOID,
            tags = videos::TAGS,
        );
        let put_format = format!(
            "UPDATE {} SET {}[?] = ? WHERE {} = ?",
            videos::NAME,
            videos::FORMATS,
            videos::VIDEOID,
        );

        Ok(Self {
            insert: session.prepare(insert_cql(videos::NAME, VIDEO_COLUMNS)).await?,
            find: session
                .prepare(select_cql(videos::NAME, VIDEO_COLUMNS, &[videos::VIDEOID]))
                .await?,
            list: session.prepare(select_cql(videos::NAME, VIDEO_COLUMNS, &[])).await?,
            add_tags: session.prepare(add_tags).await?,
            put_format: session.prepare(put_format).await?,
            delete: session.prepare(delete_cql(videos::NAME, &[videos::VIDEOID])).await?,
            session,
        })
    }
}

#[async_trait]
impl VideoRepository for CassandraVideoRepository {
    #[instrument(skip(self, video), fields(videoid = %video.videoid))]
    async fn create(&self, video: &Video) -> VideoResult<()> {
        self.session.execute_unpaged(&self.insert, video).await?;
        tracing::info!("Created video");
        Ok(())
    }

    async fn find(&self, videoid: Uuid) -> VideoResult<Option<Video>> {
        self.session
            .execute_unpaged(&self.find, (videoid,))
            .await?
            .into_rows_result()
            .map_err(VideoError::database)?
            .maybe_first_row::<Video>()
            .map_err(VideoError::database)
    }

    #[instrument(skip(self))]
    async fn list(&self, page_size: i32) -> VideoResult<Vec<Video>> {
        let statement = with_page_size(&self.list, page_size)?;
        self.session
            .execute_iter(statement, &[])
            .await
            .map_err(VideoError::database)?
            .rows_stream::<Video>()
            .map_err(VideoError::database)?
            .try_collect()
            .await
            .map_err(VideoError::database)
    }

    #[instrument(skip(self, tags), fields(count = tags.len()))]
    async fn add_tags(&self, videoid: Uuid, tags: BTreeSet<String>) -> VideoResult<()> {
        self.session
            .execute_unpaged(&self.add_tags, (tags, videoid))
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn put_format(
        &self,
        videoid: Uuid,
        name: &str,
        format: VideoFormat,
    ) -> VideoResult<()> {
        self.session
            .execute_unpaged(&self.put_format, (name, format, videoid))
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, videoid: Uuid) -> VideoResult<()> {
        self.session.execute_unpaged(&self.delete, (videoid,)).await?;
        Ok(())
    }
}

// ============================================================================
// Comments
// ============================================================================

const COMMENT_BY_VIDEO_COLUMNS: &[&str] = &[
    comments_by_video::VIDEOID,
    comments_by_video::COMMENTID,
    comments_by_video::USERID,
    comments_by_video::COMMENT,
];

const COMMENT_BY_USER_COLUMNS: &[&str] = &[
    comments_by_user::USERID,
    comments_by_user::COMMENTID,
    comments_by_user::VIDEOID,
    comments_by_user::COMMENT,
];

pub struct CassandraCommentRepository {
    session: CassandraSession,
    add: Batch,
    delete: Batch,
    by_video: PreparedStatement,
    by_user: PreparedStatement,
}

impl CassandraCommentRepository {
    pub async fn new(session: CassandraSession) -> VideoResult<Self> {
        let insert_by_video = session
            .prepare(insert_cql(comments_by_video::NAME, COMMENT_BY_VIDEO_COLUMNS))
            .await?;
        let insert_by_user = session
            .prepare(insert_cql(comments_by_user::NAME, COMMENT_BY_USER_COLUMNS))
            .await?;
        let delete_by_video = session
            .prepare(delete_cql(
                comments_by_video::NAME,
                &[comments_by_video::VIDEOID, comments_by_video::COMMENTID],
            ))
            .await?;
        let delete_by_user = session
            .prepare(delete_cql(
                comments_by_user::NAME,
                &[comments_by_user::USERID, comments_by_user::COMMENTID],
            ))
            .await?;

        let mut add = Batch::new(BatchType::Logged);
        add.append_statement(insert_by_video);
        add.append_statement(insert_by_user);

        let mut delete = Batch::new(BatchType::Logged);
        delete.append_statement(delete_by_video);
        delete.append_statement(delete_by_user);

        Ok(Self {
            add,
            delete,
            by_video: session
                .prepare(select_cql(
                    comments_by_video::NAME,
                    COMMENT_BY_VIDEO_COLUMNS,
                    &[comments_by_video::VIDEOID],
                ))
                .await?,
            by_user: session
                .prepare(select_cql(
                    comments_by_user::NAME,
                    COMMENT_BY_USER_COLUMNS,
                    &[comments_by_user::USERID],
                ))
                .await?,
            session,
        })
    }
}

#[async_trait]
impl CommentRepository for CassandraCommentRepository {
    #[instrument(skip(self, comment), fields(commentid = %comment.commentid))]
    async fn add(&self, comment: &Comment) -> VideoResult<()> {
        let values = (CommentByVideo::from(comment), CommentByUser::from(comment));
        self.session.batch(&self.add, values).await?;
        tracing::info!("Added comment");
        Ok(())
    }

    #[instrument(skip(self, comment), fields(commentid = %comment.commentid))]
    async fn delete(&self, comment: &Comment) -> VideoResult<()> {
        let values = (
            (comment.videoid, comment.commentid),
            (comment.userid, comment.commentid),
        );
        self.session.batch(&self.delete, values).await?;
        Ok(())
    }

    async fn list_by_video(&self, videoid: Uuid) -> VideoResult<Vec<Comment>> {
        self.session
            .execute_iter(self.by_video.clone(), (videoid,))
            .await
            .map_err(VideoError::database)?
            .rows_stream::<CommentByVideo>()
            .map_err(VideoError::database)?
            .map_ok(Comment::from)
            .try_collect()
            .await
            .map_err(VideoError::database)
    }

    async fn list_by_user(&self, userid: Uuid) -> VideoResult<Vec<Comment>> {
        self.session
            .execute_iter(self.by_user.clone(), (userid,))
            .await
            .map_err(VideoError::database)?
            .rows_stream::<CommentByUser>()
            .map_err(VideoError::database)?
            .map_ok(Comment::from)
            .try_collect()
            .await
            .map_err(VideoError::database)
    }
}

// ============================================================================
// Views
// ============================================================================

pub struct CassandraVideoViewsRepository {
    session: CassandraSession,
    increment: PreparedStatement,
    decrement: PreparedStatement,
    views: PreparedStatement,
    delete: PreparedStatement,
}

impl CassandraVideoViewsRepository {
    pub async fn new(session: CassandraSession) -> VideoResult<Self> {
        let update = |op: &str| {
            format!(
                "UPDATE {} SET {views} = {views} {op} ? WHERE {} = ?",
                videos_views::NAME,
                videos_views::VIDEOID,
                views = videos_views::VIEWS,
            )
        };

        Ok(Self {
            increment: session.prepare(update("+")).await?,
            decrement: session.prepare(update("-")).await?,
            views: session
                .prepare(select_cql(
                    videos_views::NAME,
                    &[videos_views::VIEWS],
                    &[videos_views::VIDEOID],
                ))
                .await?,
            delete: session
                .prepare(delete_cql(videos_views::NAME, &[videos_views::VIDEOID]))
                .await?,
            session,
        })
    }
}

#[async_trait]
impl VideoViewsRepository for CassandraVideoViewsRepository {
    #[instrument(skip(self))]
    async fn increment(&self, videoid: Uuid, by: i64) -> VideoResult<()> {
        self.session
            .execute_unpaged(&self.increment, (Counter(by), videoid))
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn decrement(&self, videoid: Uuid, by: i64) -> VideoResult<()> {
        self.session
            .execute_unpaged(&self.decrement, (Counter(by), videoid))
            .await?;
        Ok(())
    }

    async fn views(&self, videoid: Uuid) -> VideoResult<i64> {
        let row = self
            .session
            .execute_unpaged(&self.views, (videoid,))
            .await?
            .into_rows_result()
            .map_err(VideoError::database)?
            .maybe_first_row::<(Counter,)>()
            .map_err(VideoError::database)?;
        Ok(row.map(|(Counter(views),)| views).unwrap_or(0))
    }

    #[instrument(skip(self))]
    async fn delete(&self, videoid: Uuid) -> VideoResult<()> {
        self.session.execute_unpaged(&self.delete, (videoid,)).await?;
        Ok(())
    }
}

// ============================================================================
// Files
// ============================================================================

const FILE_COLUMNS: &[&str] = &[files::FILENAME, files::UPLOAD, files::EXTENSION, files::BINARY];

pub struct CassandraFileRepository {
    session: CassandraSession,
    insert: PreparedStatement,
    latest: PreparedStatement,
    versions: PreparedStatement,
}

impl CassandraFileRepository {
    pub async fn new(session: CassandraSession) -> VideoResult<Self> {
        // Rows cluster by upload DESC, so the first row is the newest version
        let latest = format!(
            "{} LIMIT 1",
            select_cql(files::NAME, FILE_COLUMNS, &[files::FILENAME])
        );

        Ok(Self {
            insert: session.prepare(insert_cql(files::NAME, FILE_COLUMNS)).await?,
            latest: session.prepare(latest).await?,
            versions: session
                .prepare(select_cql(files::NAME, &[files::UPLOAD], &[files::FILENAME]))
                .await?,
            session,
        })
    }
}

#[async_trait]
impl FileRepository for CassandraFileRepository {
    #[instrument(skip(self, file), fields(filename = %file.filename, bytes = file.binary.len()))]
    async fn save(&self, file: &StoredFile) -> VideoResult<()> {
        self.session.execute_unpaged(&self.insert, file).await?;
        tracing::info!("Stored file version");
        Ok(())
    }

    async fn latest(&self, filename: &str) -> VideoResult<Option<StoredFile>> {
        self.session
            .execute_unpaged(&self.latest, (filename,))
            .await?
            .into_rows_result()
            .map_err(VideoError::database)?
            .maybe_first_row::<StoredFile>()
            .map_err(VideoError::database)
    }

    async fn versions(&self, filename: &str) -> VideoResult<Vec<DateTime<Utc>>> {
        self.session
            .execute_iter(self.versions.clone(), (filename,))
            .await
            .map_err(VideoError::database)?
            .rows_stream::<(DateTime<Utc>,)>()
            .map_err(VideoError::database)?
            .map_ok(|(upload,)| upload)
            .try_collect()
            .await
            .map_err(VideoError::database)
    }
}

// ============================================================================
// Vector search
// ============================================================================

const PET_SUPPLY_COLUMNS: &[&str] = &[
    pet_supply_vectors::PRODUCT_ID,
    pet_supply_vectors::PRODUCT_NAME,
    pet_supply_vectors::PRODUCT_VECTOR,
];

fn similar_cql() -> String {
    format!(
        "{} ORDER BY {} ANN OF ? LIMIT ?",
        select_cql(pet_supply_vectors::NAME, PET_SUPPLY_COLUMNS, &[]),
        pet_supply_vectors::PRODUCT_VECTOR,
    )
}

/// Requires the storage-attached index on `product_vector`
pub struct CassandraPetSupplyRepository {
    session: CassandraSession,
    insert: PreparedStatement,
    find: PreparedStatement,
    similar: PreparedStatement,
}

impl CassandraPetSupplyRepository {
    pub async fn new(session: CassandraSession) -> VideoResult<Self> {
        Ok(Self {
            insert: session
                .prepare(insert_cql(pet_supply_vectors::NAME, PET_SUPPLY_COLUMNS))
                .await?,
            find: session
                .prepare(select_cql(
                    pet_supply_vectors::NAME,
                    PET_SUPPLY_COLUMNS,
                    &[pet_supply_vectors::PRODUCT_ID],
                ))
                .await?,
            similar: session.prepare(similar_cql()).await?,
            session,
        })
    }
}

#[async_trait]
impl PetSupplyRepository for CassandraPetSupplyRepository {
    #[instrument(skip(self, product), fields(product_id = %product.product_id))]
    async fn insert(&self, product: &PetSupply) -> VideoResult<()> {
        validate_vector(&product.product_vector)?;
        self.session.execute_unpaged(&self.insert, product).await?;
        Ok(())
    }

    async fn find(&self, product_id: &str) -> VideoResult<Option<PetSupply>> {
        self.session
            .execute_unpaged(&self.find, (product_id,))
            .await?
            .into_rows_result()
            .map_err(VideoError::database)?
            .maybe_first_row::<PetSupply>()
            .map_err(VideoError::database)
    }

    #[instrument(skip(self, vector))]
    async fn similar(&self, vector: &[f32], limit: i32) -> VideoResult<Vec<PetSupply>> {
        validate_vector(vector)?;
        if limit <= 0 {
            return Err(VideoError::Validation(format!(
                "limit must be positive, got {limit}"
            )));
        }

        self.session
            .execute_unpaged(&self.similar, (vector.to_vec(), limit))
            .await?
            .into_rows_result()
            .map_err(VideoError::database)?
            .rows::<PetSupply>()
            .map_err(VideoError::database)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(VideoError::database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_cql() {
        assert_eq!(
            insert_cql(users::NAME, USER_COLUMNS),
            "INSERT INTO users (email, firstname, lastname) VALUES (?, ?, ?)"
        );
    }

    #[test]
    fn test_select_cql() {
        assert_eq!(
            select_cql(
                comments_by_video::NAME,
                COMMENT_BY_VIDEO_COLUMNS,
                &[comments_by_video::VIDEOID]
            ),
            "SELECT videoid, commentid, userid, comment FROM comments_by_video WHERE videoid = ?"
        );
        assert_eq!(select_cql(users::NAME, &[users::EMAIL], &[]), "SELECT email FROM users");
    }

    #[test]
    fn test_delete_cql_with_clustering_key() {
        assert_eq!(
            delete_cql(
                comments_by_user::NAME,
                &[comments_by_user::USERID, comments_by_user::COMMENTID]
            ),
            "DELETE FROM comments_by_user WHERE userid = ? AND commentid = ?"
        );
    }

    #[test]
    fn test_similar_cql() {
        assert_eq!(
            similar_cql(),
            "SELECT product_id, product_name, product_vector FROM pet_supply_vectors \
             ORDER BY product_vector ANN OF ? LIMIT ?"
        );
    }

    #[test]
    fn test_last_page_has_no_token() {
        assert_eq!(next_token(PagingStateResponse::NoMorePages), None);
    }

    #[test]
    fn test_token_resumes_from_driver_state() {
        let raw = vec![0u8, 4, 0, 0, 0, 7, 255];
        let response = PagingStateResponse::HasMorePages {
            state: PagingState::new_from_raw_bytes(raw.clone()),
        };

        let token = next_token(response).unwrap();
        let state = paging_state(Some(&token)).unwrap();
        assert_eq!(state.as_bytes_slice().map(|bytes| bytes.to_vec()), Some(raw));
    }

    #[test]
    fn test_first_page_starts_without_state() {
        let state = paging_state(None).unwrap();
        assert!(state.as_bytes_slice().is_none());
    }

    #[test]
    fn test_malformed_token_is_rejected_before_query() {
        let err = paging_state(Some(&PageToken::from("not*base64".to_string()))).unwrap_err();
        assert!(matches!(err, VideoError::Validation(_)));
    }
}
