//! Checkout order use-cases.
//!
//! # Responsibility
//! - Create orders for existing users with server-derived totals.
//! - Apply status and shipping updates under the order lifecycle rules.
//!
//! # Invariants
//! - Illegal status moves and shipping edits on settled orders are conflicts.

use crate::model::order::{NewOrder, Order, OrderPatch, OrderUpdateError};
use crate::model::{now_epoch_ms, OrderId, UserId};
use crate::repo::order_repo::OrderRepository;
use crate::repo::user_repo::UserRepository;
use crate::service::{ServiceError, ServiceResult};
use log::{info, warn};
use uuid::Uuid;

pub struct OrderService<O, U>
where
    O: OrderRepository,
    U: UserRepository,
{
    orders: O,
    users: U,
}

impl<O, U> OrderService<O, U>
where
    O: OrderRepository,
    U: UserRepository,
{
    pub fn new(orders: O, users: U) -> Self {
        Self { orders, users }
    }

    pub fn create_order(&self, input: NewOrder) -> ServiceResult<Order> {
        let order = Order::from_new(input, Uuid::new_v4(), now_epoch_ms())?;
        self.require_user(order.user_id)?;
        self.orders.insert_order(&order)?;
        info!(
            "event=order_create module=orders status=ok order_id={} user_id={} items={} grand_total={}",
            order.id,
            order.user_id,
            order.items.len(),
            order.grand_total
        );
        Ok(order)
    }

    /// Lists orders newest first, scoped to `user_id` when given.
    pub fn list_orders(&self, user_id: Option<UserId>) -> ServiceResult<Vec<Order>> {
        if let Some(user_id) = user_id {
            self.require_user(user_id)?;
        }
        Ok(self.orders.list_orders(user_id)?)
    }

    pub fn get_order(&self, id: OrderId) -> ServiceResult<Order> {
        self.orders
            .get_order(id)?
            .ok_or_else(|| ServiceError::not_found("order", id))
    }

    pub fn update_order(&self, id: OrderId, patch: OrderPatch) -> ServiceResult<Order> {
        let current = self.get_order(id)?;
        let updated = current
            .patched(patch, now_epoch_ms())
            .map_err(|err| match err {
                OrderUpdateError::Validation(err) => ServiceError::Validation(err),
                other => {
                    warn!(
                        "event=order_update module=orders status=rejected order_id={id} reason=\"{other}\""
                    );
                    ServiceError::Conflict(other.to_string())
                }
            })?;
        self.orders.update_order(&updated)?;
        info!(
            "event=order_update module=orders status=ok order_id={id} order_status={}",
            updated.status.as_str()
        );
        Ok(updated)
    }

    pub fn delete_order(&self, id: OrderId) -> ServiceResult<()> {
        self.orders.delete_order(id)?;
        info!("event=order_delete module=orders status=ok order_id={id}");
        Ok(())
    }

    fn require_user(&self, user_id: UserId) -> ServiceResult<()> {
        match self.users.get_user(user_id)? {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found("user", user_id)),
        }
    }
}
