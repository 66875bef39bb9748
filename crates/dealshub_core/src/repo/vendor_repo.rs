//! Vendor repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Name lookup is case-insensitive exact match.
//! - `total_deals` adjustments are floored at zero.

use crate::model::comment::CommentTarget;
use crate::model::vendor::{BusinessDetails, Vendor, VendorFilter, VendorType};
use crate::model::VendorId;
use crate::repo::comment_repo::delete_comment_thread;
use crate::repo::{
    bool_to_int, count_rows, get_count, get_json, get_uuid, invalid_value, like_contains,
    parse_bool, to_json, Page, PageRequest, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};

const VENDOR_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    location,
    country,
    vendor_type,
    rating,
    total_deals,
    total_reviews,
    logo,
    cover_image,
    is_verified,
    categories,
    joined_at,
    response_time,
    posted_by,
    cac_number,
    business_website,
    business_phone,
    business_email,
    business_address,
    cac_document,
    business_logo,
    business_banner,
    identity_img,
    passport_photo,
    identity_match_score,
    created_at,
    updated_at
FROM vendors";

/// Repository interface for vendors.
pub trait VendorRepository {
    fn insert_vendor(&self, vendor: &Vendor) -> RepoResult<()>;
    /// Overwrites every mutable column of an existing vendor.
    fn update_vendor(&self, vendor: &Vendor) -> RepoResult<()>;
    fn get_vendor(&self, id: VendorId) -> RepoResult<Option<Vendor>>;
    fn find_by_name(&self, name: &str) -> RepoResult<Option<Vendor>>;
    /// Lists vendors newest first.
    fn list_vendors(&self, filter: &VendorFilter, page: PageRequest) -> RepoResult<Page<Vendor>>;
    /// Adds `delta` to `total_deals`, never going below zero.
    fn adjust_total_deals(&self, id: VendorId, delta: i64) -> RepoResult<()>;
    fn delete_vendor(&self, id: VendorId) -> RepoResult<()>;
}

pub struct SqliteVendorRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVendorRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_vendors(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Vendor>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut vendors = Vec::new();
        while let Some(row) = rows.next()? {
            vendors.push(parse_vendor_row(row)?);
        }
        Ok(vendors)
    }
}

impl VendorRepository for SqliteVendorRepository<'_> {
    fn insert_vendor(&self, vendor: &Vendor) -> RepoResult<()> {
        let business = &vendor.business;
        self.conn.execute(
            "INSERT INTO vendors (
                id, name, description, location, country, vendor_type, rating,
                total_deals, total_reviews, logo, cover_image, is_verified, categories,
                joined_at, response_time, posted_by, cac_number, business_website,
                business_phone, business_email, business_address, cac_document,
                business_logo, business_banner, identity_img, passport_photo,
                identity_match_score, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29
            );",
            params![
                vendor.id.to_string(),
                vendor.name.as_str(),
                vendor.description.as_deref(),
                vendor.location.as_deref(),
                vendor.country.as_deref(),
                vendor.vendor_type.as_str(),
                vendor.rating,
                i64::from(vendor.total_deals),
                i64::from(vendor.total_reviews),
                vendor.logo.as_deref(),
                vendor.cover_image.as_deref(),
                bool_to_int(vendor.is_verified),
                to_json(&vendor.categories)?,
                vendor.joined_at,
                vendor.response_time.as_deref(),
                vendor.posted_by.to_string(),
                business.cac_number.as_deref(),
                business.business_website.as_deref(),
                business.business_phone.as_deref(),
                business.business_email.as_deref(),
                business.business_address.as_deref(),
                business.cac_document.as_deref(),
                business.business_logo.as_deref(),
                business.business_banner.as_deref(),
                vendor.identity_img.as_str(),
                vendor.passport_photo.as_str(),
                vendor.identity_match_score,
                vendor.created_at,
                vendor.updated_at,
            ],
        )?;
        Ok(())
    }

    fn update_vendor(&self, vendor: &Vendor) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE vendors
             SET
                name = ?2, description = ?3, location = ?4, country = ?5,
                vendor_type = ?6, rating = ?7, total_reviews = ?8, logo = ?9,
                cover_image = ?10, is_verified = ?11, categories = ?12,
                response_time = ?13, identity_match_score = ?14, updated_at = ?15
             WHERE id = ?1;",
            params![
                vendor.id.to_string(),
                vendor.name.as_str(),
                vendor.description.as_deref(),
                vendor.location.as_deref(),
                vendor.country.as_deref(),
                vendor.vendor_type.as_str(),
                vendor.rating,
                i64::from(vendor.total_reviews),
                vendor.logo.as_deref(),
                vendor.cover_image.as_deref(),
                bool_to_int(vendor.is_verified),
                to_json(&vendor.categories)?,
                vendor.response_time.as_deref(),
                vendor.identity_match_score,
                vendor.updated_at,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("vendor", vendor.id));
        }
        Ok(())
    }

    fn get_vendor(&self, id: VendorId) -> RepoResult<Option<Vendor>> {
        let mut vendors = self.query_vendors(
            &format!("{VENDOR_SELECT_SQL} WHERE id = ?;"),
            vec![Value::Text(id.to_string())],
        )?;
        Ok(vendors.pop())
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Option<Vendor>> {
        let mut vendors = self.query_vendors(
            &format!(
                "{VENDOR_SELECT_SQL} WHERE name = ? COLLATE NOCASE
                 ORDER BY created_at ASC LIMIT 1;"
            ),
            vec![Value::Text(name.trim().to_string())],
        )?;
        Ok(vendors.pop())
    }

    fn list_vendors(&self, filter: &VendorFilter, page: PageRequest) -> RepoResult<Page<Vendor>> {
        let mut where_sql = String::from("WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(vendor_type) = filter.vendor_type {
            where_sql.push_str(" AND vendor_type = ?");
            bind_values.push(Value::Text(vendor_type.as_str().to_string()));
        }
        if let Some(country) = filter.country.as_deref() {
            where_sql.push_str(" AND country = ?");
            bind_values.push(Value::Text(country.to_string()));
        }
        if let Some(search) = filter.search.as_deref() {
            where_sql.push_str(
                " AND (name LIKE ? ESCAPE '\\'
                    OR description LIKE ? ESCAPE '\\'
                    OR categories LIKE ? ESCAPE '\\')",
            );
            let pattern = like_contains(search);
            for _ in 0..3 {
                bind_values.push(Value::Text(pattern.clone()));
            }
        }

        let total = count_rows(self.conn, &format!("FROM vendors {where_sql}"), &bind_values)?;
        bind_values.push(Value::Integer(i64::from(page.limit)));
        bind_values.push(Value::Integer(page.offset()));
        let vendors = self.query_vendors(
            &format!(
                "{VENDOR_SELECT_SQL} {where_sql}
                 ORDER BY created_at DESC, id ASC LIMIT ? OFFSET ?;"
            ),
            bind_values,
        )?;
        Ok(Page::new(vendors, total, page))
    }

    fn adjust_total_deals(&self, id: VendorId, delta: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE vendors SET total_deals = MAX(total_deals + ?2, 0) WHERE id = ?1;",
            params![id.to_string(), delta],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("vendor", id));
        }
        Ok(())
    }

    fn delete_vendor(&self, id: VendorId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute("DELETE FROM vendors WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("vendor", id));
        }
        delete_comment_thread(&tx, CommentTarget::Vendor, id)?;
        tx.commit()?;
        Ok(())
    }
}

fn parse_vendor_row(row: &Row<'_>) -> RepoResult<Vendor> {
    let vendor_type: String = row.get("vendor_type")?;

    Ok(Vendor {
        id: get_uuid(row, "id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        location: row.get("location")?,
        country: row.get("country")?,
        vendor_type: VendorType::parse(&vendor_type)
            .ok_or_else(|| invalid_value("vendors.vendor_type", &vendor_type))?,
        rating: row.get("rating")?,
        total_deals: get_count(row, "total_deals")?,
        total_reviews: get_count(row, "total_reviews")?,
        logo: row.get("logo")?,
        cover_image: row.get("cover_image")?,
        is_verified: parse_bool(row, "is_verified")?,
        categories: get_json(row, "categories")?,
        joined_at: row.get("joined_at")?,
        response_time: row.get("response_time")?,
        posted_by: get_uuid(row, "posted_by")?,
        business: BusinessDetails {
            cac_number: row.get("cac_number")?,
            business_website: row.get("business_website")?,
            business_phone: row.get("business_phone")?,
            business_email: row.get("business_email")?,
            business_address: row.get("business_address")?,
            cac_document: row.get("cac_document")?,
            business_logo: row.get("business_logo")?,
            business_banner: row.get("business_banner")?,
        },
        identity_img: row.get("identity_img")?,
        passport_photo: row.get("passport_photo")?,
        identity_match_score: row.get("identity_match_score")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
