//! Curated category repository contracts and SQLite implementation.
//!
//! # Invariants
//! - A duplicate category id surfaces as `RepoError::Conflict`.

use crate::model::curated::CuratedCategory;
use crate::repo::{get_count, is_unique_violation, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const CURATED_SELECT_SQL: &str = "SELECT
    id, title, description, image, deals_count, max_discount, color, created_at, updated_at
FROM curated_categories";

pub trait CuratedCategoryRepository {
    fn insert_category(&self, category: &CuratedCategory) -> RepoResult<()>;
    fn update_category(&self, category: &CuratedCategory) -> RepoResult<()>;
    fn get_category(&self, id: i64) -> RepoResult<Option<CuratedCategory>>;
    /// Lists categories by id ascending.
    fn list_categories(&self) -> RepoResult<Vec<CuratedCategory>>;
    fn delete_category(&self, id: i64) -> RepoResult<()>;
}

pub struct SqliteCuratedCategoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCuratedCategoryRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query(&self, sql: &str, id: Option<i64>) -> RepoResult<Vec<CuratedCategory>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = match id {
            Some(id) => stmt.query([id])?,
            None => stmt.query([])?,
        };
        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            categories.push(parse_category_row(row)?);
        }
        Ok(categories)
    }
}

impl CuratedCategoryRepository for SqliteCuratedCategoryRepository<'_> {
    fn insert_category(&self, category: &CuratedCategory) -> RepoResult<()> {
        let result = self.conn.execute(
            "INSERT INTO curated_categories (
                id, title, description, image, deals_count, max_discount, color,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                category.id,
                category.title.as_str(),
                category.description.as_str(),
                category.image.as_str(),
                category.deals_count,
                category.max_discount,
                category.color.as_str(),
                category.created_at,
                category.updated_at,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(RepoError::Conflict(format!(
                "curated category {} already exists",
                category.id
            ))),
            Err(err) => Err(err.into()),
        }
    }

    fn update_category(&self, category: &CuratedCategory) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE curated_categories
             SET title = ?2, description = ?3, image = ?4, deals_count = ?5,
                 max_discount = ?6, color = ?7, updated_at = ?8
             WHERE id = ?1;",
            params![
                category.id,
                category.title.as_str(),
                category.description.as_str(),
                category.image.as_str(),
                category.deals_count,
                category.max_discount,
                category.color.as_str(),
                category.updated_at,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("curated category", category.id));
        }
        Ok(())
    }

    fn get_category(&self, id: i64) -> RepoResult<Option<CuratedCategory>> {
        Ok(self
            .query(&format!("{CURATED_SELECT_SQL} WHERE id = ?1;"), Some(id))?
            .into_iter()
            .next())
    }

    fn list_categories(&self) -> RepoResult<Vec<CuratedCategory>> {
        self.query(&format!("{CURATED_SELECT_SQL} ORDER BY id ASC;"), None)
    }

    fn delete_category(&self, id: i64) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM curated_categories WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("curated category", id));
        }
        Ok(())
    }
}

fn parse_category_row(row: &Row<'_>) -> RepoResult<CuratedCategory> {
    Ok(CuratedCategory {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        image: row.get("image")?,
        deals_count: get_count(row, "deals_count")?,
        max_discount: row.get("max_discount")?,
        color: row.get("color")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
