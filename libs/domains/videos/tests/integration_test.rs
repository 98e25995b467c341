//! Repository tests against a real Cassandra node
//!
//! Run with: cargo test -p domain_videos -- --ignored

use chrono::{SubsecRound, Utc};
use cql_schema::{KeyspaceDescriptor, SchemaCatalogue, SchemaProvisioner};
use database::cassandra::{CassandraSession, use_keyspace};
use domain_videos::*;
use std::collections::{BTreeSet, HashMap, HashSet};
use test_utils::assertions::{assert_descending, assert_some};
use test_utils::{TestCassandra, TestDataBuilder};
use uuid::Uuid;

/// Provision the full schema into a keyspace of its own and select it
async fn setup(test_name: &str) -> (TestCassandra, CassandraSession, TestDataBuilder) {
    let cassandra = TestCassandra::new().await;
    let session = cassandra.session();
    let data = TestDataBuilder::from_test_name(test_name);

    let mut catalogue = SchemaCatalogue::killrvideo();
    catalogue.keyspace = KeyspaceDescriptor::simple(data.keyspace("videos"), 1);

    let provisioner = SchemaProvisioner::new(session.as_ref());
    provisioner.ensure_keyspace(&catalogue.keyspace).await.unwrap();
    provisioner
        .with_keyspace(&catalogue.keyspace.name)
        .provision(&catalogue)
        .await
        .unwrap();
    use_keyspace(&session, &catalogue.keyspace.name).await.unwrap();

    (cassandra, session, data)
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_user_crud_and_lightweight_transactions() {
    let (_cassandra, session, data) = setup("users").await;
    let repo = CassandraUserRepository::new(session).await.unwrap();

    let user = User {
        email: data.email("clun"),
        firstname: "Cedric".to_string(),
        lastname: "Lunven".to_string(),
    };

    assert!(repo.create_if_not_exists(&user).await.unwrap());
    assert!(!repo.create_if_not_exists(&user).await.unwrap());
    assert!(repo.exists(&user.email).await.unwrap());

    assert!(!repo.update_lastname_if(&user.email, "Wrong", "Smith").await.unwrap());
    assert!(repo.update_lastname_if(&user.email, "Lunven", "Smith").await.unwrap());
    let found = assert_some(repo.find(&user.email).await.unwrap(), "user after update");
    assert_eq!(found.lastname, "Smith");

    let json_user = User {
        email: data.email("json"),
        firstname: "Jason".to_string(),
        lastname: "Json".to_string(),
    };
    repo.insert_json(&json_user).await.unwrap();
    assert_eq!(repo.find(&json_user.email).await.unwrap(), Some(json_user));

    // page size smaller than the row count forces several pages
    for i in 0..5 {
        repo.create(&User {
            email: data.email(&format!("paged{i}")),
            firstname: "Page".to_string(),
            lastname: format!("{i}"),
        })
        .await
        .unwrap();
    }
    assert_eq!(repo.list(2).await.unwrap().len(), 7);

    repo.delete(&user.email).await.unwrap();
    assert!(!repo.exists(&user.email).await.unwrap());
    assert!(repo.find(&user.email).await.unwrap().is_none());
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_videos_collections_udt_and_counters() {
    let (_cassandra, session, data) = setup("videos").await;
    let videos = CassandraVideoRepository::new(session.clone()).await.unwrap();
    let views = CassandraVideoViewsRepository::new(session).await.unwrap();

    let video = CreateVideo {
        title: "Cassandra data modeling".to_string(),
        email: data.email("clun"),
        url: "https://killrvideo.test/v/1".to_string(),
        tags: BTreeSet::from(["cassandra".to_string()]),
        frames: vec![2, 3, 5],
        formats: HashMap::from([("mp4".to_string(), VideoFormat::new(640, 480))]),
    }
    .into_video(data.video_id(), Utc::now().trunc_subsecs(3));

    videos.create(&video).await.unwrap();
    assert_eq!(videos.find(video.videoid).await.unwrap(), Some(video.clone()));

    videos
        .add_tags(video.videoid, BTreeSet::from(["nosql".to_string()]))
        .await
        .unwrap();
    videos
        .put_format(video.videoid, "ogg", VideoFormat::new(1280, 720))
        .await
        .unwrap();
    let updated = videos.find(video.videoid).await.unwrap().unwrap();
    assert_eq!(updated.tags.len(), 2);
    assert_eq!(updated.formats["ogg"], VideoFormat::new(1280, 720));

    assert_eq!(videos.list(1).await.unwrap().len(), 1);

    assert_eq!(views.views(video.videoid).await.unwrap(), 0);
    views.increment(video.videoid, 1).await.unwrap();
    views.increment(video.videoid, 10).await.unwrap();
    views.decrement(video.videoid, 3).await.unwrap();
    assert_eq!(views.views(video.videoid).await.unwrap(), 8);

    views.delete(video.videoid).await.unwrap();
    videos.delete(video.videoid).await.unwrap();
    assert!(videos.find(video.videoid).await.unwrap().is_none());
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_comments_written_to_both_tables() {
    let (_cassandra, session, data) = setup("comments").await;
    let service = CommentService::new(CassandraCommentRepository::new(session).await.unwrap());

    let videoid = data.video_id();
    let userid = data.user_id();
    let mut posted = Vec::new();
    for text in ["first", "second", "third"] {
        let comment = service
            .post(NewComment {
                videoid,
                userid,
                comment: text.to_string(),
            })
            .await
            .unwrap();
        posted.push(comment);
    }

    let by_video = service.for_video(videoid).await.unwrap();
    let by_user = service.by_user(userid).await.unwrap();
    assert_eq!(by_video, by_user);
    assert_eq!(by_video.len(), 3);
    assert_eq!(by_video[0].comment, "third");
    assert_descending(&by_video, |c| c.created_at(), "comments newest first");

    service.delete(&posted[0]).await.unwrap();
    assert_eq!(service.for_video(videoid).await.unwrap().len(), 2);
    assert_eq!(service.by_user(userid).await.unwrap().len(), 2);
    assert!(service.for_video(Uuid::new_v4()).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_file_versions_share_static_extension() {
    let (_cassandra, session, data) = setup("files").await;
    let repo = CassandraFileRepository::new(session).await.unwrap();
    let filename = data.name("file", "logo");

    let first = StoredFile {
        filename: filename.clone(),
        upload: Utc::now().trunc_subsecs(3) - chrono::Duration::minutes(5),
        extension: Some("png".to_string()),
        binary: vec![0x89, 0x50, 0x4e, 0x47],
    };
    let second = StoredFile {
        upload: Utc::now().trunc_subsecs(3),
        binary: vec![0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a],
        ..first.clone()
    };
    repo.save(&first).await.unwrap();
    repo.save(&second).await.unwrap();

    let latest = repo.latest(&filename).await.unwrap().unwrap();
    assert_eq!(latest, second);

    let versions = repo.versions(&filename).await.unwrap();
    assert_eq!(versions, vec![second.upload, first.upload]);
    assert!(repo.latest("missing.bin").await.unwrap().is_none());
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_resumed_pages_cover_every_user_once() {
    let (_cassandra, session, data) = setup("paging").await;
    let service = UserService::new(CassandraUserRepository::new(session).await.unwrap());

    for i in 0..7 {
        service
            .register(CreateUser {
                email: data.email(&format!("page{i}")),
                firstname: "Page".to_string(),
                lastname: format!("Reader{i}"),
            })
            .await
            .unwrap();
    }

    let mut seen = HashSet::new();
    let mut pages = 0;
    let mut token = None;
    loop {
        let page = service.list_users_page(3, token).await.unwrap();
        assert!(page.items.len() <= 3);
        pages += 1;
        for user in page.items {
            assert!(seen.insert(user.email.clone()), "{} listed twice", user.email);
        }
        // tokens survive a trip through their string form
        token = page.next.map(|next| PageToken::from(next.to_string()));
        if token.is_none() {
            break;
        }
    }

    assert_eq!(seen.len(), 7);
    assert!(pages >= 3);
}

fn pet_supplies() -> Vec<PetSupply> {
    [
        ("pf1843", "HealthyFresh - Chicken raw dog food", [1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
        ("pf1844", "HealthyFresh - Beef raw dog food", [1, 0, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0]),
        ("pt0021", "Dog Tennis Ball Toy", [0, 0, 0, 1, 0, 0, 0, 0, 0, 1, 1, 1, 0, 0]),
        ("pt0041", "Dog Ring Chew Toy", [0, 0, 0, 1, 0, 0, 0, 1, 1, 1, 0, 0, 0, 0]),
        ("pf7043", "PupperSausage Bacon dog Treats", [0, 0, 0, 1, 0, 0, 1, 0, 0, 0, 0, 0, 1, 1]),
        ("pf7044", "PupperSausage Beef dog Treats", [0, 0, 0, 1, 0, 1, 1, 0, 0, 0, 0, 0, 1, 0]),
    ]
    .into_iter()
    .map(|(id, name, bits)| PetSupply::new(id, name, bits.iter().map(|&b| b as f32).collect()))
    .collect()
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_vector_search_finds_nearest_products() {
    let (_cassandra, session, _data) = setup("vectors").await;
    let repo = CassandraPetSupplyRepository::new(session.clone()).await.unwrap();
    for product in pet_supplies() {
        repo.insert(&product).await.unwrap();
    }

    let chicken = assert_some(repo.find("pf1843").await.unwrap(), "pf1843");
    assert_eq!(chicken.product_name, "HealthyFresh - Chicken raw dog food");
    assert!(repo.find("missing").await.unwrap().is_none());

    let nearest = repo.similar(&chicken.product_vector, 2).await.unwrap();
    let ids: Vec<_> = nearest.iter().map(|p| p.product_id.as_str()).collect();
    assert_eq!(ids, vec!["pf1843", "pf1844"]);

    let service = PetSupplyService::new(CassandraPetSupplyRepository::new(session).await.unwrap());
    let similar = service.similar_to("pf1843", 1).await.unwrap();
    assert_eq!(similar.len(), 1);
    assert_eq!(similar[0].product_id, "pf1844");

    assert!(matches!(
        repo.similar(&[1.0; 3], 2).await,
        Err(VideoError::Validation(_))
    ));
}
