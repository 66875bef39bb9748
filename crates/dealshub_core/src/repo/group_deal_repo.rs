//! Group deal repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist group deals with their materialized slot rows.
//! - Apply slot transitions atomically under concurrent requests.
//!
//! # Invariants
//! - Every transition loads, mutates and writes back inside one immediate
//!   transaction, so two callers can never claim the same slot.
//! - The partial unique index on `(group_deal_id, user_id)` backs the
//!   one-slot-per-user rule at the storage level.
//! - Vendor `total_deals` moves together with group deal create/delete.

use crate::db::DbError;
use crate::model::group_deal::{
    GroupDeal, GroupDealFilter, GroupDealStatus, ShippingType, Slot, SlotError, SlotStatus,
};
use crate::model::{GroupDealId, UserId, VendorId};
use crate::repo::{
    bool_to_int, count_rows, get_count, get_json, get_optional_uuid, get_uuid, invalid_value,
    is_unique_violation, parse_bool, to_json, Page, PageRequest, RepoError,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const GROUP_DEAL_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    images,
    category,
    original_price,
    discounted_price,
    discount_percentage,
    currency,
    total_slots,
    status,
    expires_at,
    shipping_type,
    shipping_note,
    delivery_estimate,
    vendor_id,
    vendor_name,
    is_verified,
    views,
    created_by,
    created_at,
    updated_at
FROM group_deals";

pub type GroupDealRepoResult<T> = Result<T, GroupDealRepoError>;

/// Errors from group deal repository operations.
#[derive(Debug)]
pub enum GroupDealRepoError {
    /// Underlying SQLite error.
    Db(DbError),
    /// Target group deal does not exist.
    NotFound(GroupDealId),
    /// Requested slot transition is not allowed.
    Slot(SlotError),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for GroupDealRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "group deal not found: {id}"),
            Self::Slot(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid group deal data: {message}"),
        }
    }
}

impl Error for GroupDealRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Slot(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for GroupDealRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for GroupDealRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<SlotError> for GroupDealRepoError {
    fn from(value: SlotError) -> Self {
        Self::Slot(value)
    }
}

impl From<RepoError> for GroupDealRepoError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Db(err) => Self::Db(err),
            other => Self::InvalidData(other.to_string()),
        }
    }
}

/// Repository interface for group deals and their slots.
pub trait GroupDealRepository {
    /// Inserts the deal, its slots, and bumps the vendor's `total_deals`.
    fn create(&self, deal: &GroupDeal) -> GroupDealRepoResult<()>;
    fn get(&self, id: GroupDealId) -> GroupDealRepoResult<Option<GroupDeal>>;
    /// Lists deals newest first.
    fn list(
        &self,
        filter: &GroupDealFilter,
        page: PageRequest,
    ) -> GroupDealRepoResult<Page<GroupDeal>>;
    /// Active deals whose expiry is still ahead of `now`, newest first.
    fn list_active(&self, now: i64) -> GroupDealRepoResult<Vec<GroupDeal>>;
    fn list_by_vendor(&self, vendor_id: VendorId) -> GroupDealRepoResult<Vec<GroupDeal>>;
    /// Reserves the lowest available slot; returns the updated deal.
    fn reserve(&self, id: GroupDealId, user_id: UserId, now: i64)
        -> GroupDealRepoResult<GroupDeal>;
    /// Pays the user's reserved slot; returns the updated deal.
    fn confirm_payment(
        &self,
        id: GroupDealId,
        user_id: UserId,
        now: i64,
    ) -> GroupDealRepoResult<GroupDeal>;
    /// Deletes a deal with no paid slots and decrements the vendor's `total_deals`.
    fn delete(&self, id: GroupDealId) -> GroupDealRepoResult<()>;
    /// Marks active deals past expiry as expired; returns how many changed.
    fn expire_overdue(&self, now: i64) -> GroupDealRepoResult<usize>;
}

pub struct SqliteGroupDealRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGroupDealRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl GroupDealRepository for SqliteGroupDealRepository<'_> {
    fn create(&self, deal: &GroupDeal) -> GroupDealRepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO group_deals (
                id, title, description, images, category, original_price,
                discounted_price, discount_percentage, currency, total_slots, status,
                expires_at, shipping_type, shipping_note, delivery_estimate, vendor_id,
                vendor_name, is_verified, views, created_by, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                ?17, ?18, ?19, ?20, ?21, ?22
            );",
            params![
                deal.id.to_string(),
                deal.title.as_str(),
                deal.description.as_str(),
                to_json(&deal.images)?,
                deal.category.as_str(),
                deal.original_price,
                deal.discounted_price,
                deal.discount_percentage,
                deal.currency.as_str(),
                i64::from(deal.total_slots),
                deal.status.as_str(),
                deal.expires_at,
                deal.shipping_type.as_str(),
                deal.shipping_note.as_str(),
                deal.delivery_estimate.as_str(),
                deal.vendor_id.to_string(),
                deal.vendor_name.as_str(),
                bool_to_int(deal.is_verified),
                deal.views,
                deal.created_by.to_string(),
                deal.created_at,
                deal.updated_at,
            ],
        )?;
        {
            let mut insert_slot = tx.prepare(
                "INSERT INTO group_deal_slots
                    (group_deal_id, position, user_id, status, reserved_at, paid_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            )?;
            for slot in &deal.slots {
                insert_slot.execute(params![
                    deal.id.to_string(),
                    i64::from(slot.position),
                    slot.user_id.map(|id| id.to_string()),
                    slot.status.as_str(),
                    slot.reserved_at,
                    slot.paid_at,
                ])?;
            }
        }
        tx.execute(
            "UPDATE vendors SET total_deals = total_deals + 1 WHERE id = ?1;",
            [deal.vendor_id.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn get(&self, id: GroupDealId) -> GroupDealRepoResult<Option<GroupDeal>> {
        load_group_deal(self.conn, id)
    }

    fn list(
        &self,
        filter: &GroupDealFilter,
        page: PageRequest,
    ) -> GroupDealRepoResult<Page<GroupDeal>> {
        let mut where_sql = String::from("WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(status) = filter.status {
            where_sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(vendor_id) = filter.vendor_id {
            where_sql.push_str(" AND vendor_id = ?");
            bind_values.push(Value::Text(vendor_id.to_string()));
        }

        let total = count_rows(
            self.conn,
            &format!("FROM group_deals {where_sql}"),
            &bind_values,
        )?;
        bind_values.push(Value::Integer(i64::from(page.limit)));
        bind_values.push(Value::Integer(page.offset()));
        let deals = query_group_deals(
            self.conn,
            &format!(
                "{GROUP_DEAL_SELECT_SQL} {where_sql}
                 ORDER BY created_at DESC, id ASC LIMIT ? OFFSET ?;"
            ),
            bind_values,
        )?;
        Ok(Page::new(deals, total, page))
    }

    fn list_active(&self, now: i64) -> GroupDealRepoResult<Vec<GroupDeal>> {
        query_group_deals(
            self.conn,
            &format!(
                "{GROUP_DEAL_SELECT_SQL}
                 WHERE status = 'active' AND expires_at > ?
                 ORDER BY created_at DESC, id ASC;"
            ),
            vec![Value::Integer(now)],
        )
    }

    fn list_by_vendor(&self, vendor_id: VendorId) -> GroupDealRepoResult<Vec<GroupDeal>> {
        query_group_deals(
            self.conn,
            &format!(
                "{GROUP_DEAL_SELECT_SQL} WHERE vendor_id = ?
                 ORDER BY created_at DESC, id ASC;"
            ),
            vec![Value::Text(vendor_id.to_string())],
        )
    }

    fn reserve(
        &self,
        id: GroupDealId,
        user_id: UserId,
        now: i64,
    ) -> GroupDealRepoResult<GroupDeal> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut deal = load_group_deal(&tx, id)?.ok_or(GroupDealRepoError::NotFound(id))?;
        let position = deal.reserve(user_id, now)?;
        let slot = slot_at(&deal, position)?;
        match write_slot(&tx, id, slot) {
            Ok(()) => {}
            Err(GroupDealRepoError::Db(DbError::Sqlite(err))) if is_unique_violation(&err) => {
                return Err(SlotError::AlreadyJoined(user_id).into());
            }
            Err(err) => return Err(err),
        }
        write_deal_state(&tx, &deal)?;
        tx.commit()?;
        Ok(deal)
    }

    fn confirm_payment(
        &self,
        id: GroupDealId,
        user_id: UserId,
        now: i64,
    ) -> GroupDealRepoResult<GroupDeal> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut deal = load_group_deal(&tx, id)?.ok_or(GroupDealRepoError::NotFound(id))?;
        deal.confirm_payment(user_id, now)?;
        let position = deal
            .slot_of(user_id)
            .map(|slot| slot.position)
            .ok_or(SlotError::NoReservedSlot(user_id))?;
        write_slot(&tx, id, slot_at(&deal, position)?)?;
        write_deal_state(&tx, &deal)?;
        tx.commit()?;
        Ok(deal)
    }

    fn delete(&self, id: GroupDealId) -> GroupDealRepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let deal = load_group_deal(&tx, id)?.ok_or(GroupDealRepoError::NotFound(id))?;
        deal.ensure_deletable()?;
        tx.execute(
            "UPDATE vendors SET total_deals = MAX(total_deals - 1, 0) WHERE id = ?1;",
            [deal.vendor_id.to_string()],
        )?;
        tx.execute(
            "DELETE FROM group_deal_slots WHERE group_deal_id = ?1;",
            [id.to_string()],
        )?;
        tx.execute("DELETE FROM group_deals WHERE id = ?1;", [id.to_string()])?;
        tx.commit()?;
        Ok(())
    }

    fn expire_overdue(&self, now: i64) -> GroupDealRepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE group_deals SET status = 'expired', updated_at = ?1
             WHERE status = 'active' AND expires_at <= ?1;",
            [now],
        )?;
        Ok(changed)
    }
}

fn slot_at(deal: &GroupDeal, position: u32) -> GroupDealRepoResult<&Slot> {
    deal.slots
        .iter()
        .find(|slot| slot.position == position)
        .ok_or_else(|| GroupDealRepoError::InvalidData(format!("missing slot {position}")))
}

fn write_slot(conn: &Connection, id: GroupDealId, slot: &Slot) -> GroupDealRepoResult<()> {
    conn.execute(
        "UPDATE group_deal_slots
         SET user_id = ?3, status = ?4, reserved_at = ?5, paid_at = ?6
         WHERE group_deal_id = ?1 AND position = ?2;",
        params![
            id.to_string(),
            i64::from(slot.position),
            slot.user_id.map(|user_id| user_id.to_string()),
            slot.status.as_str(),
            slot.reserved_at,
            slot.paid_at,
        ],
    )?;
    Ok(())
}

fn write_deal_state(conn: &Connection, deal: &GroupDeal) -> GroupDealRepoResult<()> {
    conn.execute(
        "UPDATE group_deals SET status = ?2, updated_at = ?3 WHERE id = ?1;",
        params![deal.id.to_string(), deal.status.as_str(), deal.updated_at],
    )?;
    Ok(())
}

fn load_group_deal(conn: &Connection, id: GroupDealId) -> GroupDealRepoResult<Option<GroupDeal>> {
    let mut deals = query_group_deals(
        conn,
        &format!("{GROUP_DEAL_SELECT_SQL} WHERE id = ?;"),
        vec![Value::Text(id.to_string())],
    )?;
    Ok(deals.pop())
}

fn query_group_deals(
    conn: &Connection,
    sql: &str,
    bind_values: Vec<Value>,
) -> GroupDealRepoResult<Vec<GroupDeal>> {
    let mut deals = {
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut deals = Vec::new();
        while let Some(row) = rows.next()? {
            deals.push(parse_group_deal_row(row)?);
        }
        deals
    };
    let mut slot_stmt = conn.prepare(
        "SELECT position, user_id, status, reserved_at, paid_at
         FROM group_deal_slots
         WHERE group_deal_id = ?1
         ORDER BY position ASC;",
    )?;
    for deal in &mut deals {
        let mut rows = slot_stmt.query([deal.id.to_string()])?;
        while let Some(row) = rows.next()? {
            deal.slots.push(parse_slot_row(row)?);
        }
        if deal.slots.len() != deal.total_slots as usize {
            return Err(GroupDealRepoError::InvalidData(format!(
                "group deal {} has {} slots, expected {}",
                deal.id,
                deal.slots.len(),
                deal.total_slots
            )));
        }
    }
    Ok(deals)
}

fn parse_group_deal_row(row: &Row<'_>) -> GroupDealRepoResult<GroupDeal> {
    let status: String = row.get("status")?;
    let shipping_type: String = row.get("shipping_type")?;

    Ok(GroupDeal {
        id: get_uuid(row, "id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        images: get_json(row, "images")?,
        category: row.get("category")?,
        original_price: row.get("original_price")?,
        discounted_price: row.get("discounted_price")?,
        discount_percentage: row.get("discount_percentage")?,
        currency: row.get("currency")?,
        total_slots: get_count(row, "total_slots")?,
        slots: Vec::new(),
        status: GroupDealStatus::parse(&status)
            .ok_or_else(|| invalid_value("group_deals.status", &status))?,
        expires_at: row.get("expires_at")?,
        shipping_type: ShippingType::parse(&shipping_type)
            .ok_or_else(|| invalid_value("group_deals.shipping_type", &shipping_type))?,
        shipping_note: row.get("shipping_note")?,
        delivery_estimate: row.get("delivery_estimate")?,
        vendor_id: get_uuid(row, "vendor_id")?,
        vendor_name: row.get("vendor_name")?,
        is_verified: parse_bool(row, "is_verified")?,
        views: row.get("views")?,
        created_by: get_uuid(row, "created_by")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_slot_row(row: &Row<'_>) -> GroupDealRepoResult<Slot> {
    let status: String = row.get("status")?;
    let position: i64 = row.get("position")?;
    Ok(Slot {
        position: u32::try_from(position)
            .map_err(|_| invalid_value("group_deal_slots.position", &position.to_string()))?,
        user_id: get_optional_uuid(row, "user_id")?,
        status: SlotStatus::parse(&status)
            .ok_or_else(|| invalid_value("group_deal_slots.status", &status))?,
        reserved_at: row.get("reserved_at")?,
        paid_at: row.get("paid_at")?,
    })
}
