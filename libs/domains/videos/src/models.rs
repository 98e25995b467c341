use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use cql_schema::catalogue::pet_supply_vectors;
use scylla::{DeserializeRow, DeserializeValue, SerializeRow, SerializeValue};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use crate::error::{VideoError, VideoResult};

/// Row of the `users` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SerializeRow, DeserializeRow)]
pub struct User {
    pub email: String,
    pub firstname: String,
    pub lastname: String,
}

/// DTO for registering a user
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub firstname: String,
    #[validate(length(min = 1, max = 100))]
    pub lastname: String,
}

impl From<CreateUser> for User {
    fn from(input: CreateUser) -> Self {
        Self {
            email: input.email,
            firstname: input.firstname,
            lastname: input.lastname,
        }
    }
}

/// The `video_format` user-defined type
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    SerializeValue,
    DeserializeValue,
)]
pub struct VideoFormat {
    pub width: i32,
    pub height: i32,
}

impl VideoFormat {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Row of the `videos` table
///
/// Empty collections are stored as null and read back empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SerializeRow, DeserializeRow)]
pub struct Video {
    pub videoid: Uuid,
    pub title: String,
    pub upload: DateTime<Utc>,
    pub email: String,
    pub url: String,
    pub tags: BTreeSet<String>,
    pub frames: Vec<i32>,
    pub formats: HashMap<String, VideoFormat>,
}

/// DTO for publishing a video
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateVideo {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(email)]
    pub email: String,
    #[validate(url)]
    pub url: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub frames: Vec<i32>,
    #[serde(default)]
    pub formats: HashMap<String, VideoFormat>,
}

impl CreateVideo {
    pub fn into_video(self, videoid: Uuid, upload: DateTime<Utc>) -> Video {
        Video {
            videoid,
            title: self.title,
            upload,
            email: self.email,
            url: self.url,
            tags: self.tags,
            frames: self.frames,
            formats: self.formats,
        }
    }
}

/// A video together with its view counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoWithViews {
    #[serde(flatten)]
    pub video: Video,
    pub views: i64,
}

/// A comment on a video, independent of how it is stored
///
/// `commentid` is a time-based (v1) UUID, so comments order by creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub videoid: Uuid,
    pub userid: Uuid,
    pub commentid: Uuid,
    pub comment: String,
}

impl Comment {
    /// Creation time encoded in the comment id
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let (secs, nanos) = self.commentid.get_timestamp()?.to_unix();
        DateTime::from_timestamp(i64::try_from(secs).ok()?, nanos)
    }
}

/// DTO for posting a comment
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewComment {
    pub videoid: Uuid,
    pub userid: Uuid,
    #[validate(length(min = 1, max = 1000))]
    pub comment: String,
}

/// Row of `comments_by_video`, partitioned by video
#[derive(Debug, Clone, PartialEq, Eq, SerializeRow, DeserializeRow)]
pub struct CommentByVideo {
    pub videoid: Uuid,
    pub commentid: Uuid,
    pub userid: Uuid,
    pub comment: String,
}

/// Row of `comments_by_user`, partitioned by user
#[derive(Debug, Clone, PartialEq, Eq, SerializeRow, DeserializeRow)]
pub struct CommentByUser {
    pub userid: Uuid,
    pub commentid: Uuid,
    pub videoid: Uuid,
    pub comment: String,
}

impl From<&Comment> for CommentByVideo {
    fn from(c: &Comment) -> Self {
        Self {
            videoid: c.videoid,
            commentid: c.commentid,
            userid: c.userid,
            comment: c.comment.clone(),
        }
    }
}

impl From<&Comment> for CommentByUser {
    fn from(c: &Comment) -> Self {
        Self {
            userid: c.userid,
            commentid: c.commentid,
            videoid: c.videoid,
            comment: c.comment.clone(),
        }
    }
}

impl From<CommentByVideo> for Comment {
    fn from(row: CommentByVideo) -> Self {
        Self {
            videoid: row.videoid,
            userid: row.userid,
            commentid: row.commentid,
            comment: row.comment,
        }
    }
}

impl From<CommentByUser> for Comment {
    fn from(row: CommentByUser) -> Self {
        Self {
            videoid: row.videoid,
            userid: row.userid,
            commentid: row.commentid,
            comment: row.comment,
        }
    }
}

/// Row of the `files` table: one version of a stored file
///
/// `extension` is static, so every version of a file shares it.
#[derive(Debug, Clone, PartialEq, Eq, SerializeRow, DeserializeRow)]
pub struct StoredFile {
    pub filename: String,
    pub upload: DateTime<Utc>,
    pub extension: Option<String>,
    pub binary: Vec<u8>,
}

/// Opaque position in a paged listing
///
/// Wraps the driver's paging state as URL-safe base64 so it can be handed to a
/// client and sent back later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageToken(String);

impl PageToken {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn to_bytes(&self) -> VideoResult<Vec<u8>> {
        URL_SAFE_NO_PAD
            .decode(&self.0)
            .map_err(|e| VideoError::Validation(format!("invalid page token: {e}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PageToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of a listing; `next` is `None` on the last page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<PageToken>,
}

/// Row of `pet_supply_vectors`: a product and its feature vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SerializeRow, DeserializeRow)]
pub struct PetSupply {
    pub product_id: String,
    pub product_name: String,
    pub product_vector: Vec<f32>,
}

impl PetSupply {
    pub fn new(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        product_vector: Vec<f32>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            product_vector,
        }
    }
}

/// Vectors must match the dimension of the `product_vector` column
pub fn validate_vector(vector: &[f32]) -> VideoResult<()> {
    if vector.len() != pet_supply_vectors::DIMENSION {
        return Err(VideoError::Validation(format!(
            "vector has {} dimensions, expected {}",
            vector.len(),
            pet_supply_vectors::DIMENSION
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment() -> Comment {
        Comment {
            videoid: Uuid::new_v4(),
            userid: Uuid::new_v4(),
            commentid: Uuid::now_v1(&[1, 2, 3, 4, 5, 6]),
            comment: "first!".to_string(),
        }
    }

    #[test]
    fn test_comment_projections_round_trip() {
        let original = comment();

        let by_video = CommentByVideo::from(&original);
        assert_eq!(by_video.videoid, original.videoid);
        assert_eq!(Comment::from(by_video), original);

        let by_user = CommentByUser::from(&original);
        assert_eq!(by_user.userid, original.userid);
        assert_eq!(Comment::from(by_user), original);
    }

    #[test]
    fn test_comment_created_at_from_time_uuid() {
        let before = Utc::now() - chrono::Duration::seconds(1);
        let created = comment().created_at().unwrap();
        assert!(created >= before);
        assert!(created <= Utc::now() + chrono::Duration::seconds(1));
    }

    #[test]
    fn test_random_comment_id_has_no_time() {
        let mut c = comment();
        c.commentid = Uuid::new_v4();
        assert!(c.created_at().is_none());
    }

    #[test]
    fn test_create_user_validation() {
        let valid = CreateUser {
            email: "clun@sample.com".to_string(),
            firstname: "Cedric".to_string(),
            lastname: "Lunven".to_string(),
        };
        assert!(valid.validate().is_ok());

        let invalid = CreateUser {
            email: "not-an-email".to_string(),
            ..valid
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_create_video_into_video() {
        let input = CreateVideo {
            title: "Cassandra data modeling".to_string(),
            email: "clun@sample.com".to_string(),
            url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
            tags: BTreeSet::from(["cassandra".to_string()]),
            frames: vec![1, 2, 3],
            formats: HashMap::from([("mp4".to_string(), VideoFormat::new(640, 480))]),
        };
        assert!(input.validate().is_ok());

        let id = Uuid::new_v4();
        let video = input.into_video(id, Utc::now());
        assert_eq!(video.videoid, id);
        assert_eq!(video.formats["mp4"].height, 480);
    }

    #[test]
    fn test_page_token_round_trip() {
        let token = PageToken::from_bytes(&[0, 1, 2, 250, 251, 255]);
        assert!(!token.as_str().contains(['+', '/', '=']));
        assert_eq!(token.to_bytes().unwrap(), vec![0, 1, 2, 250, 251, 255]);

        let parsed = PageToken::from(token.to_string());
        assert_eq!(parsed, token);
    }

    #[test]
    fn test_malformed_page_token() {
        let token = PageToken::from("not base64!".to_string());
        assert!(matches!(token.to_bytes(), Err(VideoError::Validation(_))));
    }

    #[test]
    fn test_vector_dimension() {
        assert!(validate_vector(&[0.0; 14]).is_ok());
        assert!(matches!(
            validate_vector(&[1.0, 0.0]),
            Err(VideoError::Validation(_))
        ));
    }
}
