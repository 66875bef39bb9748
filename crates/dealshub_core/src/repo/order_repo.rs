//! Order repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Line items, shipping address and shipping method are stored as JSON
//!   columns and read back whole.

use crate::model::order::{Order, OrderStatus};
use crate::model::{OrderId, UserId};
use crate::repo::{get_json, get_uuid, invalid_value, to_json, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const ORDER_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    items,
    currency,
    items_total,
    discount_total,
    shipping_fee,
    grand_total,
    status,
    payment_reference,
    shipping_address,
    shipping_method,
    created_at,
    updated_at
FROM orders";

pub trait OrderRepository {
    fn insert_order(&self, order: &Order) -> RepoResult<()>;
    fn update_order(&self, order: &Order) -> RepoResult<()>;
    fn get_order(&self, id: OrderId) -> RepoResult<Option<Order>>;
    /// Lists orders newest first, optionally for one user.
    fn list_orders(&self, user_id: Option<UserId>) -> RepoResult<Vec<Order>>;
    fn delete_order(&self, id: OrderId) -> RepoResult<()>;
}

pub struct SqliteOrderRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOrderRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn select(&self, clause: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Order>> {
        let mut stmt = self.conn.prepare(&format!("{ORDER_SELECT_SQL} {clause};"))?;
        let mut rows = stmt.query(params_from_iter(bind_values.iter()))?;
        let mut orders = Vec::new();
        while let Some(row) = rows.next()? {
            orders.push(parse_order_row(row)?);
        }
        Ok(orders)
    }
}

impl OrderRepository for SqliteOrderRepository<'_> {
    fn insert_order(&self, order: &Order) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO orders (
                id, user_id, items, currency, items_total, discount_total, shipping_fee,
                grand_total, status, payment_reference, shipping_address, shipping_method,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14);",
            params![
                order.id.to_string(),
                order.user_id.to_string(),
                to_json(&order.items)?,
                order.currency.as_str(),
                order.items_total,
                order.discount_total,
                order.shipping_fee,
                order.grand_total,
                order.status.as_str(),
                order.payment_reference.as_deref(),
                to_json(&order.shipping_address)?,
                to_json(&order.shipping_method)?,
                order.created_at,
                order.updated_at,
            ],
        )?;
        Ok(())
    }

    fn update_order(&self, order: &Order) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE orders
             SET items_total = ?2, discount_total = ?3, shipping_fee = ?4, grand_total = ?5,
                 status = ?6, payment_reference = ?7, shipping_address = ?8,
                 shipping_method = ?9, updated_at = ?10
             WHERE id = ?1;",
            params![
                order.id.to_string(),
                order.items_total,
                order.discount_total,
                order.shipping_fee,
                order.grand_total,
                order.status.as_str(),
                order.payment_reference.as_deref(),
                to_json(&order.shipping_address)?,
                to_json(&order.shipping_method)?,
                order.updated_at,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("order", order.id));
        }
        Ok(())
    }

    fn get_order(&self, id: OrderId) -> RepoResult<Option<Order>> {
        Ok(self
            .select("WHERE id = ?1", vec![Value::Text(id.to_string())])?
            .into_iter()
            .next())
    }

    fn list_orders(&self, user_id: Option<UserId>) -> RepoResult<Vec<Order>> {
        match user_id {
            Some(user_id) => self.select(
                "WHERE user_id = ?1 ORDER BY created_at DESC, id ASC",
                vec![Value::Text(user_id.to_string())],
            ),
            None => self.select("ORDER BY created_at DESC, id ASC", Vec::new()),
        }
    }

    fn delete_order(&self, id: OrderId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM orders WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("order", id));
        }
        Ok(())
    }
}

fn parse_order_row(row: &Row<'_>) -> RepoResult<Order> {
    let status: String = row.get("status")?;
    Ok(Order {
        id: get_uuid(row, "id")?,
        user_id: get_uuid(row, "user_id")?,
        items: get_json(row, "items")?,
        currency: row.get("currency")?,
        items_total: row.get("items_total")?,
        discount_total: row.get("discount_total")?,
        shipping_fee: row.get("shipping_fee")?,
        grand_total: row.get("grand_total")?,
        status: OrderStatus::parse(&status).ok_or_else(|| invalid_value("orders.status", &status))?,
        payment_reference: row.get("payment_reference")?,
        shipping_address: get_json(row, "shipping_address")?,
        shipping_method: get_json(row, "shipping_method")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
