//! Coupon repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Duplicate codes surface as `RepoError::Conflict`.

use crate::model::coupon::Coupon;
use crate::model::CouponId;
use crate::repo::{bool_to_int, get_uuid, is_unique_violation, parse_bool, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const COUPON_SELECT_SQL: &str = "SELECT
    id,
    background_color,
    is_popular,
    discount,
    title,
    description,
    vendor,
    expires_at,
    code,
    created_at,
    updated_at
FROM coupons";

pub trait CouponRepository {
    fn insert_coupon(&self, coupon: &Coupon) -> RepoResult<()>;
    fn update_coupon(&self, coupon: &Coupon) -> RepoResult<()>;
    fn get_coupon(&self, id: CouponId) -> RepoResult<Option<Coupon>>;
    /// Lists coupons newest first.
    fn list_coupons(&self) -> RepoResult<Vec<Coupon>>;
    fn delete_coupon(&self, id: CouponId) -> RepoResult<()>;
}

pub struct SqliteCouponRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCouponRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CouponRepository for SqliteCouponRepository<'_> {
    fn insert_coupon(&self, coupon: &Coupon) -> RepoResult<()> {
        let result = self.conn.execute(
            "INSERT INTO coupons (
                id, background_color, is_popular, discount, title, description,
                vendor, expires_at, code, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                coupon.id.to_string(),
                coupon.background_color.as_str(),
                bool_to_int(coupon.is_popular),
                coupon.discount.as_str(),
                coupon.title.as_str(),
                coupon.description.as_str(),
                coupon.vendor.as_str(),
                coupon.expires_at,
                coupon.code.as_str(),
                coupon.created_at,
                coupon.updated_at,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(duplicate_code(&coupon.code)),
            Err(err) => Err(err.into()),
        }
    }

    fn update_coupon(&self, coupon: &Coupon) -> RepoResult<()> {
        let result = self.conn.execute(
            "UPDATE coupons
             SET background_color = ?2, is_popular = ?3, discount = ?4, title = ?5,
                 description = ?6, vendor = ?7, expires_at = ?8, code = ?9, updated_at = ?10
             WHERE id = ?1;",
            params![
                coupon.id.to_string(),
                coupon.background_color.as_str(),
                bool_to_int(coupon.is_popular),
                coupon.discount.as_str(),
                coupon.title.as_str(),
                coupon.description.as_str(),
                coupon.vendor.as_str(),
                coupon.expires_at,
                coupon.code.as_str(),
                coupon.updated_at,
            ],
        );
        match result {
            Ok(0) => Err(RepoError::not_found("coupon", coupon.id)),
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(duplicate_code(&coupon.code)),
            Err(err) => Err(err.into()),
        }
    }

    fn get_coupon(&self, id: CouponId) -> RepoResult<Option<Coupon>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{COUPON_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_coupon_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_coupons(&self) -> RepoResult<Vec<Coupon>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{COUPON_SELECT_SQL} ORDER BY created_at DESC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut coupons = Vec::new();
        while let Some(row) = rows.next()? {
            coupons.push(parse_coupon_row(row)?);
        }
        Ok(coupons)
    }

    fn delete_coupon(&self, id: CouponId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM coupons WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("coupon", id));
        }
        Ok(())
    }
}

fn duplicate_code(code: &str) -> RepoError {
    RepoError::Conflict(format!("coupon code {code} already exists"))
}

fn parse_coupon_row(row: &Row<'_>) -> RepoResult<Coupon> {
    Ok(Coupon {
        id: get_uuid(row, "id")?,
        background_color: row.get("background_color")?,
        is_popular: parse_bool(row, "is_popular")?,
        discount: row.get("discount")?,
        title: row.get("title")?,
        description: row.get("description")?,
        vendor: row.get("vendor")?,
        expires_at: row.get("expires_at")?,
        code: row.get("code")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
