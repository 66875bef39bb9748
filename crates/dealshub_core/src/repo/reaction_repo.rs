//! Reaction repository contracts and SQLite implementation.
//!
//! # Invariants
//! - `(target_kind, target_id, user_id)` is the primary key, so a user can
//!   never hold like and dislike on the same target.
//! - Toggles read and write inside one immediate transaction.

use crate::model::comment::CommentTarget;
use crate::model::reaction::{toggle, Reaction, ReactionSummary, ReactionTarget};
use crate::model::{now_epoch_ms, UserId};
use crate::repo::{parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::HashMap;
use uuid::Uuid;

/// Repository interface for like/dislike state.
pub trait ReactionRepository {
    /// Applies a toggle request and returns the user's resulting reaction.
    fn apply_toggle(
        &self,
        target: ReactionTarget,
        target_id: Uuid,
        user_id: UserId,
        requested: Reaction,
    ) -> RepoResult<Option<Reaction>>;
    /// Loads the aggregated reactions for one target.
    fn summary(&self, target: ReactionTarget, target_id: Uuid) -> RepoResult<ReactionSummary>;
}

pub struct SqliteReactionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteReactionRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ReactionRepository for SqliteReactionRepository<'_> {
    fn apply_toggle(
        &self,
        target: ReactionTarget,
        target_id: Uuid,
        user_id: UserId,
        requested: Reaction,
    ) -> RepoResult<Option<Reaction>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let current = tx
            .query_row(
                "SELECT reaction FROM reactions
                 WHERE target_kind = ?1 AND target_id = ?2 AND user_id = ?3;",
                params![target.as_str(), target_id.to_string(), user_id.to_string()],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .map(|value| parse_reaction(&value))
            .transpose()?;

        let next = toggle(current, requested);
        match next {
            None => {
                tx.execute(
                    "DELETE FROM reactions
                     WHERE target_kind = ?1 AND target_id = ?2 AND user_id = ?3;",
                    params![target.as_str(), target_id.to_string(), user_id.to_string()],
                )?;
            }
            Some(reaction) => {
                tx.execute(
                    "INSERT INTO reactions (target_kind, target_id, user_id, reaction, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT (target_kind, target_id, user_id)
                     DO UPDATE SET reaction = excluded.reaction, created_at = excluded.created_at;",
                    params![
                        target.as_str(),
                        target_id.to_string(),
                        user_id.to_string(),
                        reaction.as_str(),
                        now_epoch_ms(),
                    ],
                )?;
            }
        }
        tx.commit()?;
        Ok(next)
    }

    fn summary(&self, target: ReactionTarget, target_id: Uuid) -> RepoResult<ReactionSummary> {
        load_summary(self.conn, target, target_id)
    }
}

/// Aggregates reactions for one target, oldest reactor first.
pub(crate) fn load_summary(
    conn: &Connection,
    target: ReactionTarget,
    target_id: Uuid,
) -> RepoResult<ReactionSummary> {
    let mut stmt = conn.prepare(
        "SELECT target_id, user_id, reaction FROM reactions
         WHERE target_kind = ?1 AND target_id = ?2
         ORDER BY created_at ASC, user_id ASC;",
    )?;
    let mut rows = stmt.query(params![target.as_str(), target_id.to_string()])?;
    let mut summary = ReactionSummary::default();
    while let Some(row) = rows.next()? {
        let (_, user_id, reaction) = parse_reaction_row(row)?;
        summary.record(user_id, reaction);
    }
    Ok(summary)
}

/// Aggregates reactions for every comment in one thread, keyed by comment id.
pub(crate) fn load_thread_summaries(
    conn: &Connection,
    thread: CommentTarget,
    thread_id: Uuid,
) -> RepoResult<HashMap<Uuid, ReactionSummary>> {
    let mut stmt = conn.prepare(
        "SELECT r.target_id AS target_id, r.user_id AS user_id, r.reaction AS reaction
         FROM reactions r
         JOIN comments c ON c.id = r.target_id
         WHERE r.target_kind = 'comment'
           AND c.target_kind = ?1
           AND c.target_id = ?2
         ORDER BY r.created_at ASC, r.user_id ASC;",
    )?;
    let mut rows = stmt.query(params![thread.as_str(), thread_id.to_string()])?;
    let mut summaries: HashMap<Uuid, ReactionSummary> = HashMap::new();
    while let Some(row) = rows.next()? {
        let (comment_id, user_id, reaction) = parse_reaction_row(row)?;
        summaries
            .entry(comment_id)
            .or_default()
            .record(user_id, reaction);
    }
    Ok(summaries)
}

/// Removes every reaction attached to one target.
pub(crate) fn delete_for_target(
    conn: &Connection,
    target: ReactionTarget,
    target_id: Uuid,
) -> RepoResult<()> {
    conn.execute(
        "DELETE FROM reactions WHERE target_kind = ?1 AND target_id = ?2;",
        params![target.as_str(), target_id.to_string()],
    )?;
    Ok(())
}

fn parse_reaction_row(row: &Row<'_>) -> RepoResult<(Uuid, UserId, Reaction)> {
    let target_id: String = row.get("target_id")?;
    let user_id: String = row.get("user_id")?;
    let reaction: String = row.get("reaction")?;
    Ok((
        parse_uuid(&target_id, "reactions.target_id")?,
        parse_uuid(&user_id, "reactions.user_id")?,
        parse_reaction(&reaction)?,
    ))
}

fn parse_reaction(value: &str) -> RepoResult<Reaction> {
    Reaction::parse(value).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid reaction `{value}` in reactions.reaction"))
    })
}
