//! User account repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Email uniqueness violations surface as `RepoError::Conflict`.
//! - Consuming a magic token clears it in the same transaction that matched it.

use crate::model::user::{Plan, Role, User, UserStatus, UserType};
use crate::model::UserId;
use crate::repo::{
    get_json, get_uuid, invalid_value, is_unique_violation, to_json, RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const USER_SELECT_SQL: &str = "SELECT
    id,
    google_id,
    display_name,
    first_name,
    last_name,
    email,
    photo,
    deals_count,
    user_type,
    brand,
    status,
    deals_posted,
    plan,
    preferences,
    role,
    created_at
FROM users";

/// Counter adjustments exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCounter {
    /// Remaining deal allowance, decremented per posted deal.
    DealsCount,
    /// Lifetime number of posted deals.
    DealsPosted,
}

impl UserCounter {
    fn column(self) -> &'static str {
        match self {
            Self::DealsCount => "deals_count",
            Self::DealsPosted => "deals_posted",
        }
    }
}

/// Repository interface for user accounts.
pub trait UserRepository {
    fn insert_user(&self, user: &User) -> RepoResult<()>;
    /// Overwrites every mutable profile column of an existing user.
    fn update_user(&self, user: &User) -> RepoResult<()>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    fn find_by_google_id(&self, google_id: &str) -> RepoResult<Option<User>>;
    /// Lists all users, oldest first.
    fn list_users(&self) -> RepoResult<Vec<User>>;
    /// Adds `delta` to a counter and returns the updated user.
    fn adjust_counter(&self, id: UserId, counter: UserCounter, delta: i64) -> RepoResult<User>;
    fn set_magic_token(&self, id: UserId, token_hash: &str, expires_at: i64) -> RepoResult<()>;
    /// Finds the user holding a live token with this hash and clears it.
    fn consume_magic_token(&self, token_hash: &str, now: i64) -> RepoResult<Option<User>>;
}

pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn find_one(&self, clause: &str, value: &str) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE {clause} = ?1;"))?;
        let mut rows = stmt.query([value])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_user_row(row)?)),
            None => Ok(None),
        }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn insert_user(&self, user: &User) -> RepoResult<()> {
        let result = self.conn.execute(
            "INSERT INTO users (
                id,
                google_id,
                display_name,
                first_name,
                last_name,
                email,
                photo,
                deals_count,
                user_type,
                brand,
                status,
                deals_posted,
                plan,
                preferences,
                role,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16);",
            params![
                user.id.to_string(),
                user.google_id.as_deref(),
                user.display_name.as_deref(),
                user.first_name.as_deref(),
                user.last_name.as_deref(),
                user.email.as_str(),
                user.photo.as_deref(),
                user.deals_count,
                user.user_type.as_str(),
                user.brand.as_deref(),
                user.status.as_str(),
                user.deals_posted,
                user.plan.as_str(),
                to_json(&user.preferences)?,
                user.role.as_str(),
                user.created_at,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(RepoError::Conflict(format!(
                "user with email {} already exists",
                user.email
            ))),
            Err(err) => Err(err.into()),
        }
    }

    fn update_user(&self, user: &User) -> RepoResult<()> {
        let result = self.conn.execute(
            "UPDATE users
             SET
                google_id = ?2,
                display_name = ?3,
                first_name = ?4,
                last_name = ?5,
                email = ?6,
                photo = ?7,
                user_type = ?8,
                brand = ?9,
                status = ?10,
                plan = ?11,
                preferences = ?12,
                role = ?13
             WHERE id = ?1;",
            params![
                user.id.to_string(),
                user.google_id.as_deref(),
                user.display_name.as_deref(),
                user.first_name.as_deref(),
                user.last_name.as_deref(),
                user.email.as_str(),
                user.photo.as_deref(),
                user.user_type.as_str(),
                user.brand.as_deref(),
                user.status.as_str(),
                user.plan.as_str(),
                to_json(&user.preferences)?,
                user.role.as_str(),
            ],
        );
        match result {
            Ok(0) => Err(RepoError::not_found("user", user.id)),
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(RepoError::Conflict(format!(
                "email {} is already in use",
                user.email
            ))),
            Err(err) => Err(err.into()),
        }
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        self.find_one("id", &id.to_string())
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        self.find_one("email", email)
    }

    fn find_by_google_id(&self, google_id: &str) -> RepoResult<Option<User>> {
        self.find_one("google_id", google_id)
    }

    fn list_users(&self) -> RepoResult<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} ORDER BY created_at ASC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        Ok(users)
    }

    fn adjust_counter(&self, id: UserId, counter: UserCounter, delta: i64) -> RepoResult<User> {
        let column = counter.column();
        let changed = self.conn.execute(
            &format!("UPDATE users SET {column} = MAX({column} + ?2, 0) WHERE id = ?1;"),
            params![id.to_string(), delta],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("user", id));
        }
        self.get_user(id)?
            .ok_or_else(|| RepoError::not_found("user", id))
    }

    fn set_magic_token(&self, id: UserId, token_hash: &str, expires_at: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users SET magic_token_hash = ?2, magic_token_expires_at = ?3 WHERE id = ?1;",
            params![id.to_string(), token_hash, expires_at],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("user", id));
        }
        Ok(())
    }

    fn consume_magic_token(&self, token_hash: &str, now: i64) -> RepoResult<Option<User>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let user = {
            let mut stmt = tx.prepare(&format!(
                "{USER_SELECT_SQL}
                 WHERE magic_token_hash = ?1 AND magic_token_expires_at > ?2;"
            ))?;
            let mut rows = stmt.query(params![token_hash, now])?;
            match rows.next()? {
                Some(row) => Some(parse_user_row(row)?),
                None => None,
            }
        };
        if let Some(user) = &user {
            tx.execute(
                "UPDATE users SET magic_token_hash = NULL, magic_token_expires_at = NULL
                 WHERE id = ?1;",
                [user.id.to_string()],
            )?;
        }
        tx.commit()?;
        Ok(user)
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let user_type: String = row.get("user_type")?;
    let status: String = row.get("status")?;
    let plan: String = row.get("plan")?;
    let role: String = row.get("role")?;

    Ok(User {
        id: get_uuid(row, "id")?,
        google_id: row.get("google_id")?,
        display_name: row.get("display_name")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        email: row.get("email")?,
        photo: row.get("photo")?,
        deals_count: row.get("deals_count")?,
        user_type: UserType::parse(&user_type)
            .ok_or_else(|| invalid_value("users.user_type", &user_type))?,
        brand: row.get("brand")?,
        status: UserStatus::parse(&status).ok_or_else(|| invalid_value("users.status", &status))?,
        deals_posted: row.get("deals_posted")?,
        plan: Plan::parse(&plan).ok_or_else(|| invalid_value("users.plan", &plan))?,
        preferences: get_json(row, "preferences")?,
        role: Role::parse(&role).ok_or_else(|| invalid_value("users.role", &role))?,
        created_at: row.get("created_at")?,
    })
}
