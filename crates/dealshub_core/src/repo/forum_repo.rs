//! Forum post repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Likes/dislikes come from the reactions table; comment counts from the
//!   comments table.
//! - Deleting a post removes its reactions and comment thread atomically.

use crate::model::comment::{Author, CommentTarget};
use crate::model::forum::{ForumFilter, ForumPost, PostType};
use crate::model::reaction::{ReactionSummary, ReactionTarget};
use crate::model::PostId;
use crate::repo::comment_repo::{count_thread, delete_comment_thread};
use crate::repo::reaction_repo::{delete_for_target, load_summary};
use crate::repo::{
    bool_to_int, count_rows, get_json, get_optional_uuid, get_uuid, invalid_value, like_contains,
    parse_bool, to_json, Page, PageRequest, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};

const POST_SELECT_SQL: &str = "SELECT
    id,
    title,
    content,
    post_type,
    author_user_id,
    author_name,
    author_image,
    author_is_verified,
    author_reputation,
    views,
    is_pinned,
    tags,
    reported_scam_url,
    related_deal_id,
    report_reason,
    is_reported,
    created_at,
    updated_at
FROM forum_posts";

/// Repository interface for forum posts.
pub trait ForumRepository {
    fn insert_post(&self, post: &ForumPost) -> RepoResult<()>;
    /// Overwrites the editable columns of an existing post.
    fn update_post(&self, post: &ForumPost) -> RepoResult<()>;
    fn get_post(&self, id: PostId) -> RepoResult<Option<ForumPost>>;
    /// Lists posts newest first.
    fn list_posts(&self, filter: &ForumFilter, page: PageRequest) -> RepoResult<Page<ForumPost>>;
    fn increment_views(&self, id: PostId) -> RepoResult<()>;
    /// Flags the post as reported with the given reason.
    fn report_post(&self, id: PostId, reason: &str, updated_at: i64) -> RepoResult<()>;
    fn delete_post(&self, id: PostId) -> RepoResult<()>;
}

pub struct SqliteForumRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteForumRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_posts(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<ForumPost>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut posts = Vec::new();
        while let Some(row) = rows.next()? {
            posts.push(parse_post_row(row)?);
        }
        for post in &mut posts {
            post.reactions = load_summary(self.conn, ReactionTarget::ForumPost, post.id)?;
            post.comments_count = count_thread(self.conn, CommentTarget::ForumPost, post.id)?;
        }
        Ok(posts)
    }

    fn touch(&self, sql: &str, id: PostId, extra: Vec<Value>) -> RepoResult<()> {
        let mut bind_values = vec![Value::Text(id.to_string())];
        bind_values.extend(extra);
        let changed = self.conn.execute(sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Err(RepoError::not_found("forum post", id));
        }
        Ok(())
    }
}

impl ForumRepository for SqliteForumRepository<'_> {
    fn insert_post(&self, post: &ForumPost) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO forum_posts (
                id, title, content, post_type, author_user_id, author_name,
                author_image, author_is_verified, author_reputation, views, is_pinned,
                tags, reported_scam_url, related_deal_id, report_reason, is_reported,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                ?17, ?18
            );",
            params![
                post.id.to_string(),
                post.title.as_str(),
                post.content.as_str(),
                post.post_type.as_str(),
                post.author.user_id.map(|id| id.to_string()),
                post.author.name.as_str(),
                post.author.image.as_str(),
                bool_to_int(post.author.is_verified),
                post.author.reputation,
                post.views,
                bool_to_int(post.is_pinned),
                to_json(&post.tags)?,
                post.reported_scam_url.as_deref(),
                post.related_deal_id.map(|id| id.to_string()),
                post.report_reason.as_str(),
                bool_to_int(post.is_reported),
                post.created_at,
                post.updated_at,
            ],
        )?;
        Ok(())
    }

    fn update_post(&self, post: &ForumPost) -> RepoResult<()> {
        self.touch(
            "UPDATE forum_posts
             SET title = ?2, content = ?3, post_type = ?4, is_pinned = ?5, tags = ?6,
                 reported_scam_url = ?7, related_deal_id = ?8, updated_at = ?9
             WHERE id = ?1;",
            post.id,
            vec![
                Value::Text(post.title.clone()),
                Value::Text(post.content.clone()),
                Value::Text(post.post_type.as_str().to_string()),
                Value::Integer(bool_to_int(post.is_pinned)),
                Value::Text(to_json(&post.tags)?),
                post.reported_scam_url
                    .clone()
                    .map_or(Value::Null, Value::Text),
                post.related_deal_id
                    .map_or(Value::Null, |id| Value::Text(id.to_string())),
                Value::Integer(post.updated_at),
            ],
        )
    }

    fn get_post(&self, id: PostId) -> RepoResult<Option<ForumPost>> {
        let mut posts = self.query_posts(
            &format!("{POST_SELECT_SQL} WHERE id = ?;"),
            vec![Value::Text(id.to_string())],
        )?;
        Ok(posts.pop())
    }

    fn list_posts(&self, filter: &ForumFilter, page: PageRequest) -> RepoResult<Page<ForumPost>> {
        let mut where_sql = String::from("WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(post_type) = filter.post_type {
            where_sql.push_str(" AND post_type = ?");
            bind_values.push(Value::Text(post_type.as_str().to_string()));
        }
        if !filter.tags.is_empty() {
            let placeholders = vec!["?"; filter.tags.len()].join(", ");
            where_sql.push_str(&format!(
                " AND EXISTS (
                    SELECT 1 FROM json_each(forum_posts.tags) AS tag
                    WHERE tag.value IN ({placeholders})
                )"
            ));
            bind_values.extend(filter.tags.iter().cloned().map(Value::Text));
        }
        if let Some(search) = filter.search.as_deref() {
            where_sql.push_str(" AND (title LIKE ? ESCAPE '\\' OR content LIKE ? ESCAPE '\\')");
            let pattern = like_contains(search);
            bind_values.push(Value::Text(pattern.clone()));
            bind_values.push(Value::Text(pattern));
        }

        let total = count_rows(
            self.conn,
            &format!("FROM forum_posts {where_sql}"),
            &bind_values,
        )?;
        bind_values.push(Value::Integer(i64::from(page.limit)));
        bind_values.push(Value::Integer(page.offset()));
        let posts = self.query_posts(
            &format!(
                "{POST_SELECT_SQL} {where_sql}
                 ORDER BY created_at DESC, id ASC LIMIT ? OFFSET ?;"
            ),
            bind_values,
        )?;
        Ok(Page::new(posts, total, page))
    }

    fn increment_views(&self, id: PostId) -> RepoResult<()> {
        self.touch(
            "UPDATE forum_posts SET views = views + 1 WHERE id = ?1;",
            id,
            Vec::new(),
        )
    }

    fn report_post(&self, id: PostId, reason: &str, updated_at: i64) -> RepoResult<()> {
        self.touch(
            "UPDATE forum_posts
             SET is_reported = 1, report_reason = ?2, updated_at = ?3
             WHERE id = ?1;",
            id,
            vec![Value::Text(reason.to_string()), Value::Integer(updated_at)],
        )
    }

    fn delete_post(&self, id: PostId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute("DELETE FROM forum_posts WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("forum post", id));
        }
        delete_for_target(&tx, ReactionTarget::ForumPost, id)?;
        delete_comment_thread(&tx, CommentTarget::ForumPost, id)?;
        tx.commit()?;
        Ok(())
    }
}

fn parse_post_row(row: &Row<'_>) -> RepoResult<ForumPost> {
    let post_type: String = row.get("post_type")?;

    Ok(ForumPost {
        id: get_uuid(row, "id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        post_type: PostType::parse(&post_type)
            .ok_or_else(|| invalid_value("forum_posts.post_type", &post_type))?,
        author: Author {
            user_id: get_optional_uuid(row, "author_user_id")?,
            name: row.get("author_name")?,
            image: row.get("author_image")?,
            is_verified: parse_bool(row, "author_is_verified")?,
            reputation: row.get("author_reputation")?,
        },
        reactions: ReactionSummary::default(),
        comments_count: 0,
        views: row.get("views")?,
        is_pinned: parse_bool(row, "is_pinned")?,
        tags: get_json(row, "tags")?,
        reported_scam_url: row.get("reported_scam_url")?,
        related_deal_id: get_optional_uuid(row, "related_deal_id")?,
        report_reason: row.get("report_reason")?,
        is_reported: parse_bool(row, "is_reported")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
