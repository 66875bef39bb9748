//! Deal repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist deals plus their per-user votes and ratings.
//! - Build filtered, sorted and paginated listing queries.
//!
//! # Invariants
//! - Like/upvote/bookmark counts and rating aggregates are derived from the
//!   vote and rating tables, never stored on the deal row.
//! - Deleting a deal removes its comment thread in the same transaction.

use crate::model::comment::CommentTarget;
use crate::model::deal::{Availability, Deal, DealFilter, DealSort, DealStatus, VoteKind};
use crate::model::{now_epoch_ms, DealId, UserId};
use crate::repo::comment_repo::delete_comment_thread;
use crate::repo::{
    bool_to_int, count_rows, get_count, get_json, get_optional_uuid, get_uuid, invalid_value,
    like_contains, parse_bool, to_json, Page, PageRequest, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};

const DEAL_SELECT_SQL: &str = "SELECT
    id,
    url,
    title,
    slug,
    description,
    images,
    category,
    tags,
    original_price,
    discounted_price,
    discount_percentage,
    currency,
    currency_symbol,
    shipping_cost,
    coupon_code,
    affiliate_url,
    brand,
    platform,
    colors,
    sizes,
    specifications,
    availability,
    expiration_date,
    expires_at,
    views,
    is_verified,
    is_saved,
    free_shipping,
    featured,
    created_by,
    updated_by,
    status,
    created_at,
    updated_at,
    (SELECT COUNT(*) FROM deal_votes v WHERE v.deal_id = d.id AND v.kind = 'like') AS likes,
    (SELECT COUNT(*) FROM deal_votes v WHERE v.deal_id = d.id AND v.kind = 'upvote') AS upvotes,
    (SELECT COUNT(*) FROM deal_votes v WHERE v.deal_id = d.id AND v.kind = 'bookmark') AS bookmarks,
    (SELECT AVG(r.value) FROM deal_ratings r WHERE r.deal_id = d.id) AS average_rating,
    (SELECT COUNT(*) FROM deal_ratings r WHERE r.deal_id = d.id) AS ratings_count";

/// Aggregate rating after a rate call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    /// Mean rating rounded to one decimal.
    pub average: f64,
    pub count: u32,
}

/// Repository interface for deals.
pub trait DealRepository {
    fn insert_deal(&self, deal: &Deal) -> RepoResult<()>;
    /// Overwrites every mutable column of an existing deal.
    fn update_deal(&self, deal: &Deal) -> RepoResult<()>;
    fn get_deal(&self, id: DealId) -> RepoResult<Option<Deal>>;
    fn increment_views(&self, id: DealId) -> RepoResult<()>;
    fn list_deals(&self, filter: &DealFilter, page: PageRequest) -> RepoResult<Page<Deal>>;
    /// Case-insensitive substring match on brand.
    fn list_by_brand(&self, brand: &str, sort: DealSort, page: PageRequest)
        -> RepoResult<Page<Deal>>;
    fn list_featured(&self, limit: u32) -> RepoResult<Vec<Deal>>;
    /// Deals created by one user, newest first.
    fn list_by_creator(&self, user_id: UserId) -> RepoResult<Vec<Deal>>;
    fn count_by_creator(&self, user_id: UserId) -> RepoResult<u64>;
    fn set_status(&self, id: DealId, status: DealStatus, updated_at: i64) -> RepoResult<()>;
    /// Flips one user's vote and returns whether it is now set.
    fn toggle_vote(&self, id: DealId, user_id: UserId, kind: VoteKind) -> RepoResult<bool>;
    /// Inserts or replaces one user's rating.
    fn rate(&self, id: DealId, user_id: UserId, value: u8) -> RepoResult<RatingSummary>;
    fn delete_deal(&self, id: DealId) -> RepoResult<()>;
}

pub struct SqliteDealRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDealRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_deals(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Deal>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut deals = Vec::new();
        while let Some(row) = rows.next()? {
            deals.push(parse_deal_row(row)?);
        }
        Ok(deals)
    }

    fn page_deals(
        &self,
        where_sql: &str,
        mut bind_values: Vec<Value>,
        sort: DealSort,
        page: PageRequest,
    ) -> RepoResult<Page<Deal>> {
        let total = count_rows(self.conn, &format!("FROM deals d {where_sql}"), &bind_values)?;
        let sql = format!(
            "{DEAL_SELECT_SQL} FROM deals d {where_sql} ORDER BY {} LIMIT ? OFFSET ?;",
            sort.order_by()
        );
        bind_values.push(Value::Integer(i64::from(page.limit)));
        bind_values.push(Value::Integer(page.offset()));
        let deals = self.query_deals(&sql, bind_values)?;
        Ok(Page::new(deals, total, page))
    }
}

impl DealRepository for SqliteDealRepository<'_> {
    fn insert_deal(&self, deal: &Deal) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO deals (
                id, url, title, slug, description, images, category, tags,
                original_price, discounted_price, discount_percentage,
                currency, currency_symbol, shipping_cost, coupon_code, affiliate_url,
                brand, platform, colors, sizes, specifications, availability,
                expiration_date, expires_at, views, is_verified, is_saved,
                free_shipping, featured, created_by, updated_by, status,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30,
                ?31, ?32, ?33, ?34
            );",
            params![
                deal.id.to_string(),
                deal.url.as_deref(),
                deal.title.as_str(),
                deal.slug.as_str(),
                deal.description.as_deref(),
                to_json(&deal.images)?,
                deal.category.as_deref(),
                to_json(&deal.tags)?,
                deal.original_price,
                deal.discounted_price,
                deal.discount_percentage,
                deal.currency.as_str(),
                deal.currency_symbol.as_str(),
                deal.shipping_cost.as_str(),
                deal.coupon_code.as_deref(),
                deal.affiliate_url.as_deref(),
                deal.brand.as_deref(),
                deal.platform.as_deref(),
                to_json(&deal.colors)?,
                to_json(&deal.sizes)?,
                to_json(&deal.specifications)?,
                deal.availability.as_db(),
                deal.expiration_date.as_deref(),
                deal.expires_at,
                deal.views,
                bool_to_int(deal.is_verified),
                bool_to_int(deal.is_saved),
                bool_to_int(deal.free_shipping),
                bool_to_int(deal.featured),
                deal.created_by.map(|id| id.to_string()),
                deal.updated_by.map(|id| id.to_string()),
                deal.status.as_str(),
                deal.created_at,
                deal.updated_at,
            ],
        )?;
        Ok(())
    }

    fn update_deal(&self, deal: &Deal) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE deals
             SET
                url = ?2, title = ?3, slug = ?4, description = ?5, images = ?6,
                category = ?7, tags = ?8, original_price = ?9, discounted_price = ?10,
                discount_percentage = ?11, currency = ?12, currency_symbol = ?13,
                shipping_cost = ?14, coupon_code = ?15, affiliate_url = ?16, brand = ?17,
                platform = ?18, colors = ?19, sizes = ?20, specifications = ?21,
                availability = ?22, expiration_date = ?23, expires_at = ?24,
                is_verified = ?25, is_saved = ?26, free_shipping = ?27, featured = ?28,
                updated_by = ?29, status = ?30, updated_at = ?31
             WHERE id = ?1;",
            params![
                deal.id.to_string(),
                deal.url.as_deref(),
                deal.title.as_str(),
                deal.slug.as_str(),
                deal.description.as_deref(),
                to_json(&deal.images)?,
                deal.category.as_deref(),
                to_json(&deal.tags)?,
                deal.original_price,
                deal.discounted_price,
                deal.discount_percentage,
                deal.currency.as_str(),
                deal.currency_symbol.as_str(),
                deal.shipping_cost.as_str(),
                deal.coupon_code.as_deref(),
                deal.affiliate_url.as_deref(),
                deal.brand.as_deref(),
                deal.platform.as_deref(),
                to_json(&deal.colors)?,
                to_json(&deal.sizes)?,
                to_json(&deal.specifications)?,
                deal.availability.as_db(),
                deal.expiration_date.as_deref(),
                deal.expires_at,
                bool_to_int(deal.is_verified),
                bool_to_int(deal.is_saved),
                bool_to_int(deal.free_shipping),
                bool_to_int(deal.featured),
                deal.updated_by.map(|id| id.to_string()),
                deal.status.as_str(),
                deal.updated_at,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("deal", deal.id));
        }
        Ok(())
    }

    fn get_deal(&self, id: DealId) -> RepoResult<Option<Deal>> {
        let mut deals = self.query_deals(
            &format!("{DEAL_SELECT_SQL} FROM deals d WHERE d.id = ?;"),
            vec![Value::Text(id.to_string())],
        )?;
        Ok(deals.pop())
    }

    fn increment_views(&self, id: DealId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE deals SET views = views + 1 WHERE id = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("deal", id));
        }
        Ok(())
    }

    fn list_deals(&self, filter: &DealFilter, page: PageRequest) -> RepoResult<Page<Deal>> {
        let mut where_sql = String::from("WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(category) = filter
            .category
            .as_deref()
            .filter(|category| !category.eq_ignore_ascii_case("all"))
        {
            where_sql.push_str(" AND d.category = ? COLLATE NOCASE");
            bind_values.push(Value::Text(category.to_string()));
        }
        if let Some(brand) = filter.brand.as_deref() {
            where_sql.push_str(" AND d.brand = ?");
            bind_values.push(Value::Text(brand.to_string()));
        }
        if let Some(platform) = filter.platform.as_deref() {
            where_sql.push_str(" AND d.platform = ?");
            bind_values.push(Value::Text(platform.to_string()));
        }
        if let Some(search) = filter.search.as_deref() {
            where_sql.push_str(
                " AND (d.title LIKE ? ESCAPE '\\'
                    OR d.description LIKE ? ESCAPE '\\'
                    OR d.brand LIKE ? ESCAPE '\\'
                    OR d.platform LIKE ? ESCAPE '\\')",
            );
            let pattern = like_contains(search);
            for _ in 0..4 {
                bind_values.push(Value::Text(pattern.clone()));
            }
        }
        if let Some(min_price) = filter.min_price {
            where_sql.push_str(" AND d.discounted_price >= ?");
            bind_values.push(Value::Real(min_price));
        }
        if let Some(max_price) = filter.max_price {
            where_sql.push_str(" AND d.discounted_price <= ?");
            bind_values.push(Value::Real(max_price));
        }
        if let Some(min_discount) = filter.min_discount {
            where_sql.push_str(" AND d.discount_percentage >= ?");
            bind_values.push(Value::Real(min_discount));
        }
        if let Some(max_discount) = filter.max_discount {
            where_sql.push_str(" AND d.discount_percentage <= ?");
            bind_values.push(Value::Real(max_discount));
        }
        if filter.saved_only {
            where_sql.push_str(" AND d.is_saved = 1");
        }

        self.page_deals(&where_sql, bind_values, filter.sort, page)
    }

    fn list_by_brand(
        &self,
        brand: &str,
        sort: DealSort,
        page: PageRequest,
    ) -> RepoResult<Page<Deal>> {
        self.page_deals(
            "WHERE d.brand LIKE ? ESCAPE '\\'",
            vec![Value::Text(like_contains(brand.trim()))],
            sort,
            page,
        )
    }

    fn list_featured(&self, limit: u32) -> RepoResult<Vec<Deal>> {
        self.query_deals(
            &format!(
                "{DEAL_SELECT_SQL} FROM deals d WHERE d.featured = 1
                 ORDER BY d.created_at DESC, d.id ASC LIMIT ?;"
            ),
            vec![Value::Integer(i64::from(limit))],
        )
    }

    fn list_by_creator(&self, user_id: UserId) -> RepoResult<Vec<Deal>> {
        self.query_deals(
            &format!(
                "{DEAL_SELECT_SQL} FROM deals d WHERE d.created_by = ?
                 ORDER BY d.created_at DESC, d.id ASC;"
            ),
            vec![Value::Text(user_id.to_string())],
        )
    }

    fn count_by_creator(&self, user_id: UserId) -> RepoResult<u64> {
        count_rows(
            self.conn,
            "FROM deals WHERE created_by = ?",
            &[Value::Text(user_id.to_string())],
        )
    }

    fn set_status(&self, id: DealId, status: DealStatus, updated_at: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE deals SET status = ?2, updated_at = ?3 WHERE id = ?1;",
            params![id.to_string(), status.as_str(), updated_at],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("deal", id));
        }
        Ok(())
    }

    fn toggle_vote(&self, id: DealId, user_id: UserId, kind: VoteKind) -> RepoResult<bool> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_deal_exists(&tx, id)?;
        let removed = tx.execute(
            "DELETE FROM deal_votes WHERE deal_id = ?1 AND user_id = ?2 AND kind = ?3;",
            params![id.to_string(), user_id.to_string(), kind.as_str()],
        )?;
        if removed == 0 {
            tx.execute(
                "INSERT INTO deal_votes (deal_id, user_id, kind, created_at)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    id.to_string(),
                    user_id.to_string(),
                    kind.as_str(),
                    now_epoch_ms()
                ],
            )?;
        }
        tx.commit()?;
        Ok(removed == 0)
    }

    fn rate(&self, id: DealId, user_id: UserId, value: u8) -> RepoResult<RatingSummary> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_deal_exists(&tx, id)?;
        tx.execute(
            "INSERT INTO deal_ratings (deal_id, user_id, value) VALUES (?1, ?2, ?3)
             ON CONFLICT (deal_id, user_id) DO UPDATE SET value = excluded.value;",
            params![id.to_string(), user_id.to_string(), i64::from(value)],
        )?;
        let (average, count): (f64, i64) = tx.query_row(
            "SELECT COALESCE(AVG(value), 0), COUNT(*) FROM deal_ratings WHERE deal_id = ?1;",
            [id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        tx.commit()?;
        Ok(RatingSummary {
            average: round_one_decimal(average),
            count: count.max(0) as u32,
        })
    }

    fn delete_deal(&self, id: DealId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute("DELETE FROM deals WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("deal", id));
        }
        delete_comment_thread(&tx, CommentTarget::Deal, id)?;
        tx.commit()?;
        Ok(())
    }
}

fn ensure_deal_exists(conn: &Connection, id: DealId) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM deals WHERE id = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Err(RepoError::not_found("deal", id));
    }
    Ok(())
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn parse_deal_row(row: &Row<'_>) -> RepoResult<Deal> {
    let availability: String = row.get("availability")?;
    let status: String = row.get("status")?;
    let average_rating: Option<f64> = row.get("average_rating")?;

    Ok(Deal {
        id: get_uuid(row, "id")?,
        url: row.get("url")?,
        title: row.get("title")?,
        slug: row.get("slug")?,
        description: row.get("description")?,
        images: get_json(row, "images")?,
        category: row.get("category")?,
        tags: get_json(row, "tags")?,
        original_price: row.get("original_price")?,
        discounted_price: row.get("discounted_price")?,
        discount_percentage: row.get("discount_percentage")?,
        currency: row.get("currency")?,
        currency_symbol: row.get("currency_symbol")?,
        shipping_cost: row.get("shipping_cost")?,
        coupon_code: row.get("coupon_code")?,
        affiliate_url: row.get("affiliate_url")?,
        brand: row.get("brand")?,
        platform: row.get("platform")?,
        colors: get_json(row, "colors")?,
        sizes: get_json(row, "sizes")?,
        specifications: get_json(row, "specifications")?,
        availability: Availability::parse_db(&availability)
            .ok_or_else(|| invalid_value("deals.availability", &availability))?,
        expiration_date: row.get("expiration_date")?,
        expires_at: row.get("expires_at")?,
        views: row.get("views")?,
        is_verified: parse_bool(row, "is_verified")?,
        is_saved: parse_bool(row, "is_saved")?,
        free_shipping: parse_bool(row, "free_shipping")?,
        featured: parse_bool(row, "featured")?,
        created_by: get_optional_uuid(row, "created_by")?,
        updated_by: get_optional_uuid(row, "updated_by")?,
        status: DealStatus::parse(&status).ok_or_else(|| invalid_value("deals.status", &status))?,
        average_rating: round_one_decimal(average_rating.unwrap_or(0.0)),
        ratings_count: get_count(row, "ratings_count")?,
        likes: get_count(row, "likes")?,
        upvotes: get_count(row, "upvotes")?,
        bookmarks: get_count(row, "bookmarks")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
