use dealshub_core::db::open_db_in_memory;
use dealshub_core::model::comment::{CommentTarget, NewComment};
use dealshub_core::model::deal::{Deal, NewDeal};
use dealshub_core::model::forum::NewForumPost;
use dealshub_core::model::reaction::Reaction;
use dealshub_core::repo::comment_repo::SqliteCommentRepository;
use dealshub_core::repo::deal_repo::{DealRepository, SqliteDealRepository};
use dealshub_core::repo::forum_repo::SqliteForumRepository;
use dealshub_core::repo::reaction_repo::SqliteReactionRepository;
use dealshub_core::service::forum_service::ForumService;
use dealshub_core::{CommentService, CommentServiceError};
use rusqlite::Connection;
use uuid::Uuid;

fn comment_service(
    conn: &Connection,
) -> CommentService<SqliteCommentRepository<'_>, SqliteReactionRepository<'_>> {
    CommentService::new(
        SqliteCommentRepository::new(conn),
        SqliteReactionRepository::new(conn),
    )
}

fn seed_deal(conn: &Connection, title: &str) -> Deal {
    let deal = Deal::from_new(
        NewDeal {
            title: title.to_string(),
            original_price: Some(10.0),
            discounted_price: Some(8.0),
            ..NewDeal::default()
        },
        Uuid::new_v4(),
        1,
    )
    .unwrap();
    SqliteDealRepository::new(conn).insert_deal(&deal).unwrap();
    deal
}

fn comment(name: &str, body: &str, parent: Option<String>) -> NewComment {
    NewComment {
        author_name: name.to_string(),
        body: body.to_string(),
        parent_id: parent,
        ..NewComment::default()
    }
}

#[test]
fn replies_nest_under_their_parent() {
    let conn = open_db_in_memory().unwrap();
    let deal = seed_deal(&conn, "Speaker");
    let service = comment_service(&conn);

    let root = service
        .add_comment(CommentTarget::Deal, deal.id, comment("Ada", "  Nice deal ", None))
        .unwrap();
    assert_eq!(root.body, "Nice deal");
    assert_eq!(root.author.image, "https://via.placeholder.com/40");
    let reply = service
        .add_comment(
            CommentTarget::Deal,
            deal.id,
            comment("Bob", "Agreed", Some(root.id.to_string())),
        )
        .unwrap();
    service
        .add_comment(
            CommentTarget::Deal,
            deal.id,
            comment("Cy", "Top level again", Some("0".to_string())),
        )
        .unwrap();

    let tree = service.comment_tree(CommentTarget::Deal, deal.id).unwrap();
    assert_eq!(tree.len(), 2);
    assert_eq!(tree[0].comment.id, root.id);
    assert_eq!(tree[0].replies.len(), 1);
    assert_eq!(tree[0].replies[0].comment.id, reply.id);
    assert_eq!(tree[1].comment.body, "Top level again");
}

#[test]
fn add_comment_validates_input_and_thread_membership() {
    let conn = open_db_in_memory().unwrap();
    let first = seed_deal(&conn, "First");
    let second = seed_deal(&conn, "Second");
    let service = comment_service(&conn);

    assert!(matches!(
        service.add_comment(CommentTarget::Deal, first.id, comment(" ", "text", None)),
        Err(CommentServiceError::Validation(_))
    ));
    assert!(matches!(
        service.add_comment(CommentTarget::Deal, first.id, comment("Ada", "  ", None)),
        Err(CommentServiceError::Validation(_))
    ));
    assert!(matches!(
        service.add_comment(
            CommentTarget::Deal,
            first.id,
            comment("Ada", "text", Some("nope".into()))
        ),
        Err(CommentServiceError::Validation(_))
    ));
    assert!(matches!(
        service.add_comment(CommentTarget::Vendor, first.id, comment("Ada", "text", None)),
        Err(CommentServiceError::NotFound { entity: "vendor", .. })
    ));

    let foreign = service
        .add_comment(CommentTarget::Deal, second.id, comment("Ada", "other thread", None))
        .unwrap();
    assert!(matches!(
        service.add_comment(
            CommentTarget::Deal,
            first.id,
            comment("Bob", "reply", Some(foreign.id.to_string()))
        ),
        Err(CommentServiceError::ParentNotInThread(id)) if id == foreign.id
    ));
}

#[test]
fn comment_reactions_toggle_and_switch() {
    let conn = open_db_in_memory().unwrap();
    let deal = seed_deal(&conn, "Router");
    let service = comment_service(&conn);
    let target = service
        .add_comment(CommentTarget::Deal, deal.id, comment("Ada", "Fast wifi", None))
        .unwrap();
    let bob = Uuid::new_v4();
    let cy = Uuid::new_v4();

    let liked = service
        .react_to_comment(CommentTarget::Deal, deal.id, target.id, bob, Reaction::Like)
        .unwrap();
    assert_eq!((liked.likes, liked.dislikes), (1, 0));
    assert_eq!(liked.liked_by, vec![bob]);

    let switched = service
        .react_to_comment(CommentTarget::Deal, deal.id, target.id, bob, Reaction::Dislike)
        .unwrap();
    assert_eq!((switched.likes, switched.dislikes), (0, 1));

    service
        .react_to_comment(CommentTarget::Deal, deal.id, target.id, cy, Reaction::Dislike)
        .unwrap();
    let cleared = service
        .react_to_comment(CommentTarget::Deal, deal.id, target.id, bob, Reaction::Dislike)
        .unwrap();
    assert_eq!((cleared.likes, cleared.dislikes), (0, 1));
    assert_eq!(cleared.disliked_by, vec![cy]);

    let tree = service.comment_tree(CommentTarget::Deal, deal.id).unwrap();
    assert_eq!(tree[0].comment.reactions.dislikes, 1);

    assert!(matches!(
        service.react_to_comment(
            CommentTarget::Deal,
            deal.id,
            Uuid::new_v4(),
            bob,
            Reaction::Like
        ),
        Err(CommentServiceError::NotFound { entity: "comment", .. })
    ));
}

#[test]
fn forum_post_threads_and_reactions() {
    let conn = open_db_in_memory().unwrap();
    let forum = ForumService::new(
        SqliteForumRepository::new(&conn),
        SqliteReactionRepository::new(&conn),
    );
    let post = forum
        .create_post(NewForumPost {
            title: "Is this store legit?".into(),
            content: "I saw a deal that looks too good to be true.".into(),
            post_type: "question".into(),
            author_name: "Ada".into(),
            tags: vec!["scam".into(), "scam".into(), "help".into()],
            ..NewForumPost::default()
        })
        .unwrap();
    assert_eq!(post.tags, vec!["scam", "help"]);

    let service = comment_service(&conn);
    let reply = service
        .add_comment(
            CommentTarget::ForumPost,
            post.id,
            comment("Bob", "Looks fine to me", None),
        )
        .unwrap();
    assert_eq!(reply.author.image, "");

    let user = Uuid::new_v4();
    let summary = forum.react_to_post(post.id, user, Reaction::Like).unwrap();
    assert_eq!(summary.likes, 1);
    let summary = forum.react_to_post(post.id, user, Reaction::Like).unwrap();
    assert_eq!(summary.likes, 0);

    let loaded = forum.get_post(post.id).unwrap();
    assert_eq!(loaded.comments_count, 1);

    forum.delete_post(post.id).unwrap();
    let leftovers: i64 = conn
        .query_row(
            "SELECT (SELECT COUNT(*) FROM comments) + (SELECT COUNT(*) FROM reactions);",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(leftovers, 0);
}
