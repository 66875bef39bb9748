//! Comment thread repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist flat comment records for deal, vendor and forum threads.
//! - Hydrate comments with their reaction summaries.
//!
//! # Invariants
//! - A thread is addressed by `(target_kind, target_id)`.
//! - Listing order is `created_at ASC, rowid ASC` (insertion order on ties).

use crate::model::comment::{Author, Comment, CommentTarget};
use crate::model::reaction::{ReactionSummary, ReactionTarget};
use crate::model::CommentId;
use crate::repo::reaction_repo::{load_summary, load_thread_summaries};
use crate::repo::{bool_to_int, get_optional_uuid, get_uuid, parse_bool, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const COMMENT_SELECT_SQL: &str = "SELECT
    id,
    target_kind,
    target_id,
    parent_id,
    author_user_id,
    author_name,
    author_image,
    author_is_verified,
    author_reputation,
    body,
    created_at
FROM comments";

/// Repository interface for comment threads.
pub trait CommentRepository {
    /// Returns whether the thread owner record exists.
    fn owner_exists(&self, target: CommentTarget, target_id: Uuid) -> RepoResult<bool>;
    /// Loads one comment if it belongs to the given thread.
    fn get_comment(
        &self,
        target: CommentTarget,
        target_id: Uuid,
        comment_id: CommentId,
    ) -> RepoResult<Option<Comment>>;
    fn insert_comment(&self, comment: &Comment) -> RepoResult<()>;
    /// Lists all comments of a thread, flat, with reactions attached.
    fn list_thread(&self, target: CommentTarget, target_id: Uuid) -> RepoResult<Vec<Comment>>;
}

pub struct SqliteCommentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCommentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CommentRepository for SqliteCommentRepository<'_> {
    fn owner_exists(&self, target: CommentTarget, target_id: Uuid) -> RepoResult<bool> {
        owner_exists(self.conn, target, target_id)
    }

    fn get_comment(
        &self,
        target: CommentTarget,
        target_id: Uuid,
        comment_id: CommentId,
    ) -> RepoResult<Option<Comment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{COMMENT_SELECT_SQL}
             WHERE id = ?1 AND target_kind = ?2 AND target_id = ?3;"
        ))?;
        let mut rows = stmt.query(params![
            comment_id.to_string(),
            target.as_str(),
            target_id.to_string()
        ])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let mut comment = parse_comment_row(row)?;
        comment.reactions = load_summary(self.conn, ReactionTarget::Comment, comment.id)?;
        Ok(Some(comment))
    }

    fn insert_comment(&self, comment: &Comment) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO comments (
                id,
                target_kind,
                target_id,
                parent_id,
                author_user_id,
                author_name,
                author_image,
                author_is_verified,
                author_reputation,
                body,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                comment.id.to_string(),
                comment.target.as_str(),
                comment.target_id.to_string(),
                comment.parent_id.map(|id| id.to_string()),
                comment.author.user_id.map(|id| id.to_string()),
                comment.author.name.as_str(),
                comment.author.image.as_str(),
                bool_to_int(comment.author.is_verified),
                comment.author.reputation,
                comment.body.as_str(),
                comment.created_at,
            ],
        )?;
        Ok(())
    }

    fn list_thread(&self, target: CommentTarget, target_id: Uuid) -> RepoResult<Vec<Comment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{COMMENT_SELECT_SQL}
             WHERE target_kind = ?1 AND target_id = ?2
             ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query(params![target.as_str(), target_id.to_string()])?;
        let mut summaries = load_thread_summaries(self.conn, target, target_id)?;
        let mut comments = Vec::new();
        while let Some(row) = rows.next()? {
            let mut comment = parse_comment_row(row)?;
            comment.reactions = summaries.remove(&comment.id).unwrap_or_default();
            comments.push(comment);
        }
        Ok(comments)
    }
}

pub(crate) fn owner_exists(
    conn: &Connection,
    target: CommentTarget,
    target_id: Uuid,
) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1);",
            target.owner_table()
        ),
        [target_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Number of comments in a thread.
pub(crate) fn count_thread(
    conn: &Connection,
    target: CommentTarget,
    target_id: Uuid,
) -> RepoResult<u32> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM comments WHERE target_kind = ?1 AND target_id = ?2;",
        params![target.as_str(), target_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count.max(0) as u32)
}

/// Deletes a thread's comments and the reactions on them.
pub(crate) fn delete_comment_thread(
    conn: &Connection,
    target: CommentTarget,
    target_id: Uuid,
) -> RepoResult<()> {
    conn.execute(
        "DELETE FROM reactions
         WHERE target_kind = 'comment'
           AND target_id IN (
             SELECT id FROM comments WHERE target_kind = ?1 AND target_id = ?2
           );",
        params![target.as_str(), target_id.to_string()],
    )?;
    conn.execute(
        "DELETE FROM comments WHERE target_kind = ?1 AND target_id = ?2;",
        params![target.as_str(), target_id.to_string()],
    )?;
    Ok(())
}

fn parse_comment_row(row: &Row<'_>) -> RepoResult<Comment> {
    let kind: String = row.get("target_kind")?;
    let target = CommentTarget::parse(&kind).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid target kind `{kind}` in comments.target_kind"))
    })?;

    Ok(Comment {
        id: get_uuid(row, "id")?,
        target,
        target_id: get_uuid(row, "target_id")?,
        author: Author {
            user_id: get_optional_uuid(row, "author_user_id")?,
            name: row.get("author_name")?,
            image: row.get("author_image")?,
            is_verified: parse_bool(row, "author_is_verified")?,
            reputation: row.get("author_reputation")?,
        },
        body: row.get("body")?,
        parent_id: get_optional_uuid(row, "parent_id")?,
        created_at: row.get("created_at")?,
        reactions: ReactionSummary::default(),
    })
}
