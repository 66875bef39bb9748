//! Trending search repository contracts and SQLite implementation.

use crate::model::trending::TrendingSearch;
use crate::repo::{get_count, RepoError, RepoResult};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

pub trait TrendingRepository {
    /// Bumps `term` by one, creating it at count 1. Returns the row and whether it was created.
    fn record(&self, term: &str, now: i64) -> RepoResult<(TrendingSearch, bool)>;
    /// Highest count first; ties broken by most recent activity.
    fn top(&self, limit: u32) -> RepoResult<Vec<TrendingSearch>>;
}

pub struct SqliteTrendingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTrendingRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl TrendingRepository for SqliteTrendingRepository<'_> {
    fn record(&self, term: &str, now: i64) -> RepoResult<(TrendingSearch, bool)> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let bumped = tx.execute(
            "UPDATE trending_searches SET count = count + 1, updated_at = ?2 WHERE term = ?1;",
            params![term, now],
        )?;
        let created = bumped == 0;
        if created {
            tx.execute(
                "INSERT INTO trending_searches (term, count, created_at, updated_at)
                 VALUES (?1, 1, ?2, ?2);",
                params![term, now],
            )?;
        }
        let search = {
            let mut stmt = tx.prepare(
                "SELECT term, count, created_at, updated_at FROM trending_searches WHERE term = ?1;",
            )?;
            let mut rows = stmt.query([term])?;
            match rows.next()? {
                Some(row) => parse_trending_row(row)?,
                None => return Err(RepoError::not_found("trending search", term)),
            }
        };
        tx.commit()?;
        Ok((search, created))
    }

    fn top(&self, limit: u32) -> RepoResult<Vec<TrendingSearch>> {
        let mut stmt = self.conn.prepare(
            "SELECT term, count, created_at, updated_at FROM trending_searches
             ORDER BY count DESC, updated_at DESC, term ASC
             LIMIT ?1;",
        )?;
        let mut rows = stmt.query([i64::from(limit)])?;
        let mut searches = Vec::new();
        while let Some(row) = rows.next()? {
            searches.push(parse_trending_row(row)?);
        }
        Ok(searches)
    }
}

fn parse_trending_row(row: &Row<'_>) -> RepoResult<TrendingSearch> {
    Ok(TrendingSearch {
        term: row.get("term")?,
        count: get_count(row, "count")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
