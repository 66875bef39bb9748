//! Hero banner repository contracts and SQLite implementation.

use crate::model::hero::Hero;
use crate::model::HeroId;
use crate::repo::{get_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const HERO_SELECT_SQL: &str = "SELECT
    id, title, subtitle, description, image, gradient, created_at, updated_at
FROM heroes";

pub trait HeroRepository {
    fn insert_hero(&self, hero: &Hero) -> RepoResult<()>;
    fn update_hero(&self, hero: &Hero) -> RepoResult<()>;
    fn get_hero(&self, id: HeroId) -> RepoResult<Option<Hero>>;
    /// Lists heroes newest first.
    fn list_heroes(&self) -> RepoResult<Vec<Hero>>;
    fn delete_hero(&self, id: HeroId) -> RepoResult<()>;
}

pub struct SqliteHeroRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteHeroRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl HeroRepository for SqliteHeroRepository<'_> {
    fn insert_hero(&self, hero: &Hero) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO heroes (
                id, title, subtitle, description, image, gradient, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                hero.id.to_string(),
                hero.title.as_str(),
                hero.subtitle.as_str(),
                hero.description.as_str(),
                hero.image.as_str(),
                hero.gradient.as_str(),
                hero.created_at,
                hero.updated_at,
            ],
        )?;
        Ok(())
    }

    fn update_hero(&self, hero: &Hero) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE heroes
             SET title = ?2, subtitle = ?3, description = ?4, image = ?5, gradient = ?6,
                 updated_at = ?7
             WHERE id = ?1;",
            params![
                hero.id.to_string(),
                hero.title.as_str(),
                hero.subtitle.as_str(),
                hero.description.as_str(),
                hero.image.as_str(),
                hero.gradient.as_str(),
                hero.updated_at,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("hero", hero.id));
        }
        Ok(())
    }

    fn get_hero(&self, id: HeroId) -> RepoResult<Option<Hero>> {
        self.conn
            .query_row(
                &format!("{HERO_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_hero_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_heroes(&self) -> RepoResult<Vec<Hero>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{HERO_SELECT_SQL} ORDER BY created_at DESC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut heroes = Vec::new();
        while let Some(row) = rows.next()? {
            heroes.push(parse_hero_row(row)?);
        }
        Ok(heroes)
    }

    fn delete_hero(&self, id: HeroId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM heroes WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("hero", id));
        }
        Ok(())
    }
}

fn parse_hero_row(row: &Row<'_>) -> RepoResult<Hero> {
    Ok(Hero {
        id: get_uuid(row, "id")?,
        title: row.get("title")?,
        subtitle: row.get("subtitle")?,
        description: row.get("description")?,
        image: row.get("image")?,
        gradient: row.get("gradient")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
