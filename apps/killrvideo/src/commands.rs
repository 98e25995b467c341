//! Command implementations
//!
//! Every command receives the session opened by `main` and returns; nothing
//! here keeps a handle past the call.

use chrono::{SubsecRound, Utc};
use cql_schema::{
    KeyspaceDescriptor, SchemaCatalogue, SchemaProvisioner, SchemaStatement, plan, statement,
};
use database::cassandra::{
    CassandraSession, ClusterInfo, HealthStatus, check_health_detailed, get_cluster_info,
    keyspace_exists, table_names, use_keyspace, user_type_names,
};
use domain_videos::{
    CassandraCommentRepository, CassandraFileRepository, CassandraUserRepository,
    CassandraVideoRepository, CassandraVideoViewsRepository, CommentService, CreateUser,
    CreateVideo, FileRepository, NewComment, StoredFile, UserService, VideoError, VideoFormat,
    VideoService,
};
use eyre::{Result, bail};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::info;
use uuid::Uuid;

/// The killrvideo catalogue, provisioned under `keyspace`
pub fn catalogue_for(keyspace: &str, replication_factor: u32) -> SchemaCatalogue {
    let mut catalogue = SchemaCatalogue::killrvideo();
    catalogue.keyspace = KeyspaceDescriptor::simple(keyspace, replication_factor);
    catalogue
}

/// Every statement `create-keyspace` followed by `create-schema` would run
pub fn dry_run(catalogue: &SchemaCatalogue) -> Result<Vec<SchemaStatement>> {
    let mut statements = vec![statement::create_keyspace(&catalogue.keyspace)?];
    statements.extend(plan(catalogue, Some(&catalogue.keyspace.name))?);
    Ok(statements)
}

pub async fn create_keyspace(session: &CassandraSession, catalogue: &SchemaCatalogue) -> Result<()> {
    SchemaProvisioner::new(session.as_ref())
        .ensure_keyspace(&catalogue.keyspace)
        .await?;
    info!(keyspace = %catalogue.keyspace.name, "Keyspace ready");
    Ok(())
}

async fn require_keyspace(session: &CassandraSession, keyspace: &str) -> Result<()> {
    if !keyspace_exists(session, keyspace).await? {
        bail!("Keyspace '{keyspace}' does not exist, run `killrvideo create-keyspace` first");
    }
    Ok(())
}

pub async fn create_schema(session: &CassandraSession, catalogue: &SchemaCatalogue) -> Result<()> {
    let keyspace = &catalogue.keyspace.name;
    require_keyspace(session, keyspace).await?;

    let report = SchemaProvisioner::new(session.as_ref())
        .with_keyspace(keyspace)
        .provision(catalogue)
        .await?;

    for statement in &report.applied {
        println!("{statement}");
    }
    Ok(())
}

pub async fn drop_schema(session: &CassandraSession, catalogue: &SchemaCatalogue) -> Result<()> {
    let keyspace = &catalogue.keyspace.name;
    require_keyspace(session, keyspace).await?;

    SchemaProvisioner::new(session.as_ref())
        .with_keyspace(keyspace)
        .teardown(catalogue)
        .await?;
    info!(%keyspace, "Schema dropped");
    Ok(())
}

pub async fn drop_keyspace(session: &CassandraSession, catalogue: &SchemaCatalogue) -> Result<()> {
    SchemaProvisioner::new(session.as_ref())
        .drop_keyspace_if_exists(&catalogue.keyspace.name)
        .await?;
    info!(keyspace = %catalogue.keyspace.name, "Keyspace dropped");
    Ok(())
}

pub async fn truncate(
    session: &CassandraSession,
    catalogue: &SchemaCatalogue,
    table: Option<&str>,
) -> Result<()> {
    let keyspace = &catalogue.keyspace.name;
    let provisioner = SchemaProvisioner::new(session.as_ref()).with_keyspace(keyspace);

    match table {
        Some(table) => {
            if catalogue.table(table).is_none() {
                bail!("Unknown table '{table}'");
            }
            provisioner.truncate(table).await?;
        }
        None => provisioner.truncate_all(catalogue).await?,
    }
    Ok(())
}

/// Drop and recreate every type, table and index, keeping the keyspace
pub async fn reset(session: &CassandraSession, catalogue: &SchemaCatalogue) -> Result<()> {
    let keyspace = &catalogue.keyspace.name;
    let provisioner = SchemaProvisioner::new(session.as_ref());
    provisioner.ensure_keyspace(&catalogue.keyspace).await?;

    let provisioner = provisioner.with_keyspace(keyspace);
    provisioner.teardown(catalogue).await?;
    let report = provisioner.provision(catalogue).await?;

    info!(%keyspace, statements = report.applied.len(), "Schema reset");
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct SchemaStatus {
    pub keyspace: String,
    pub keyspace_exists: bool,
    pub tables: Vec<String>,
    pub missing_tables: Vec<String>,
    pub user_types: Vec<String>,
    pub health: HealthStatus,
    pub cluster: ClusterInfo,
}

pub async fn status(session: &CassandraSession, catalogue: &SchemaCatalogue) -> Result<SchemaStatus> {
    let keyspace = catalogue.keyspace.name.clone();
    let health = check_health_detailed(session).await;
    let cluster = get_cluster_info(session).await?;

    let exists = keyspace_exists(session, &keyspace).await?;
    let (tables, user_types) = if exists {
        (
            table_names(session, &keyspace).await?,
            user_type_names(session, &keyspace).await?,
        )
    } else {
        (Vec::new(), Vec::new())
    };

    let missing_tables = catalogue
        .table_names()
        .filter(|name| !tables.iter().any(|t| t == name))
        .map(str::to_string)
        .collect();

    Ok(SchemaStatus {
        keyspace,
        keyspace_exists: exists,
        tables,
        missing_tables,
        user_types,
        health,
        cluster,
    })
}

/// Insert a small, recognisable data set through the domain services
pub async fn seed(session: &CassandraSession, catalogue: &SchemaCatalogue) -> Result<()> {
    let keyspace = &catalogue.keyspace.name;
    require_keyspace(session, keyspace).await?;
    use_keyspace(session, keyspace).await?;

    let users = UserService::new(CassandraUserRepository::new(session.clone()).await?);
    let videos = VideoService::new(
        CassandraVideoRepository::new(session.clone()).await?,
        CassandraVideoViewsRepository::new(session.clone()).await?,
    );
    let comments = CommentService::new(CassandraCommentRepository::new(session.clone()).await?);
    let files = CassandraFileRepository::new(session.clone()).await?;

    let owner = CreateUser {
        email: "clun@sample.com".to_string(),
        firstname: "Cedric".to_string(),
        lastname: "Lunven".to_string(),
    };
    match users.register(owner.clone()).await {
        Ok(_) => info!(email = %owner.email, "Registered user"),
        Err(VideoError::AlreadyExists(email)) => info!(%email, "User already registered"),
        Err(e) => return Err(e.into()),
    }

    let video = videos
        .publish(CreateVideo {
            title: "Introduction to Apache Cassandra".to_string(),
            email: owner.email.clone(),
            url: "https://killrvideo.test/v/intro-to-cassandra".to_string(),
            tags: BTreeSet::from(["cassandra".to_string(), "nosql".to_string()]),
            frames: vec![2, 3, 5, 8],
            formats: HashMap::from([
                ("mp4".to_string(), VideoFormat::new(640, 480)),
                ("ogg".to_string(), VideoFormat::new(1280, 720)),
            ]),
        })
        .await?;
    videos.record_view(video.videoid).await?;

    let userid = Uuid::new_v4();
    for text in ["Great introduction", "Could you cover data modeling next?"] {
        comments
            .post(NewComment {
                videoid: video.videoid,
                userid,
                comment: text.to_string(),
            })
            .await?;
    }

    files
        .save(&StoredFile {
            filename: "thumbnail".to_string(),
            upload: Utc::now().trunc_subsecs(3),
            extension: Some("png".to_string()),
            binary: vec![0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a],
        })
        .await?;

    info!(videoid = %video.videoid, "Seed data inserted");
    println!("{}", video.videoid);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_for_renames_keyspace() {
        let catalogue = catalogue_for("killrvideo_test", 3);
        assert_eq!(catalogue.keyspace.name, "killrvideo_test");
        assert!(catalogue.validate().is_ok());
    }

    #[test]
    fn test_dry_run_lists_keyspace_then_schema() {
        let statements = dry_run(&catalogue_for("killrvideo", 1)).unwrap();

        assert_eq!(statements.len(), 10);
        assert!(statements[0].cql.starts_with("CREATE KEYSPACE IF NOT EXISTS killrvideo"));
        assert!(statements[1].cql.starts_with("CREATE TYPE IF NOT EXISTS killrvideo.video_format"));
        assert!(
            statements
                .iter()
                .any(|s| s.cql.contains("killrvideo.comments_by_video"))
        );
    }

    #[test]
    fn test_dry_run_rejects_bad_keyspace() {
        assert!(dry_run(&catalogue_for("bad-name", 1)).is_err());
        assert!(dry_run(&catalogue_for("killrvideo", 0)).is_err());
    }
}
