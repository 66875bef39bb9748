//! Checkout orders with line items and shipping.
//!
//! # Responsibility
//! - Validate order input and derive every money total from the line items.
//! - Guard the order status lifecycle.
//!
//! # Invariants
//! - An order has at least one selected item; every item shares the order currency.
//! - `total_price = discounted_price * quantity`, rounded to two decimals.
//! - Totals only count selected items; `grand_total = items_total + shipping_fee`.
//! - Status moves `pending -> paid | cancelled` and `paid -> refunded` only.
//! - A paid order carries a payment reference.
//! - Shipping details change only while the order is pending.

use crate::model::{optional_text, require_amount, require_text, OrderId, UserId, ValidationError};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "cancelled" => Some(Self::Cancelled),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }

    pub fn can_become(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Paid) | (Self::Pending, Self::Cancelled) | (Self::Paid, Self::Refunded)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub title: String,
    pub original_price: f64,
    pub discounted_price: f64,
    pub quantity: u32,
    pub currency: String,
    pub images: Vec<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub selected: bool,
    pub total_price: f64,
    pub added_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewOrderItem {
    pub product_id: Option<String>,
    pub title: Option<String>,
    pub original_price: Option<f64>,
    pub discounted_price: Option<f64>,
    pub quantity: Option<i64>,
    pub currency: Option<String>,
    pub images: Vec<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub selected: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingAddress {
    pub name: String,
    pub address: String,
    pub lga: String,
    pub state: String,
    pub postal_code: String,
    pub phone: String,
}

impl ShippingAddress {
    fn validated(self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: require_text("shippingAddress.name", &self.name)?,
            address: require_text("shippingAddress.address", &self.address)?,
            lga: require_text("shippingAddress.lga", &self.lga)?,
            state: require_text("shippingAddress.state", &self.state)?,
            postal_code: require_text("shippingAddress.postalCode", &self.postal_code)?,
            phone: require_text("shippingAddress.phone", &self.phone)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingMethod {
    pub label: String,
    pub price: f64,
    pub delivery_dates: Option<String>,
    pub courier: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingMethodInput {
    pub label: Option<String>,
    pub price: Option<f64>,
    pub delivery_dates: Option<String>,
    pub courier: Option<String>,
}

impl ShippingMethodInput {
    fn validated(self) -> Result<ShippingMethod, ValidationError> {
        Ok(ShippingMethod {
            label: require_text("shippingMethod.label", self.label.as_deref().unwrap_or_default())?,
            price: require_amount(
                "shippingMethod.price",
                self.price.ok_or(ValidationError::Required("shippingMethod.price"))?,
            )?,
            delivery_dates: optional_text(self.delivery_dates.as_deref()),
            courier: optional_text(self.courier.as_deref()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub currency: String,
    pub items_total: f64,
    pub discount_total: f64,
    pub shipping_fee: f64,
    pub grand_total: f64,
    pub status: OrderStatus,
    pub payment_reference: Option<String>,
    pub shipping_address: ShippingAddress,
    pub shipping_method: ShippingMethod,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewOrder {
    pub user_id: Option<UserId>,
    pub items: Vec<NewOrderItem>,
    pub currency: Option<String>,
    pub shipping_address: Option<ShippingAddress>,
    pub shipping_method: Option<ShippingMethodInput>,
    pub payment_reference: Option<String>,
}

/// Partial order update; items are fixed once an order exists.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderPatch {
    pub status: Option<String>,
    pub payment_reference: Option<String>,
    pub shipping_address: Option<ShippingAddress>,
    pub shipping_method: Option<ShippingMethodInput>,
}

/// Why an order update was refused.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderUpdateError {
    Validation(ValidationError),
    Transition { from: OrderStatus, to: OrderStatus },
    ShippingLocked(OrderStatus),
    MissingPaymentReference,
}

impl Display for OrderUpdateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Transition { from, to } => write!(
                f,
                "order cannot move from {} to {}",
                from.as_str(),
                to.as_str()
            ),
            Self::ShippingLocked(status) => {
                write!(f, "shipping cannot change on a {} order", status.as_str())
            }
            Self::MissingPaymentReference => write!(f, "a paid order needs a payment reference"),
        }
    }
}

impl Error for OrderUpdateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for OrderUpdateError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl Order {
    pub fn from_new(input: NewOrder, id: OrderId, now: i64) -> Result<Self, ValidationError> {
        let user_id = input.user_id.ok_or(ValidationError::Required("userId"))?;
        let currency = require_text("currency", input.currency.as_deref().unwrap_or_default())?;
        if input.items.is_empty() {
            return Err(ValidationError::Required("items"));
        }
        let items = input
            .items
            .into_iter()
            .map(|item| build_item(item, &currency, now))
            .collect::<Result<Vec<_>, _>>()?;
        if !items.iter().any(|item| item.selected) {
            return Err(ValidationError::invalid("items", "at least one item must be selected"));
        }
        let shipping_address = input
            .shipping_address
            .ok_or(ValidationError::Required("shippingAddress"))?
            .validated()?;
        let shipping_method = input
            .shipping_method
            .ok_or(ValidationError::Required("shippingMethod"))?
            .validated()?;

        let mut order = Self {
            id,
            user_id,
            items,
            currency,
            items_total: 0.0,
            discount_total: 0.0,
            shipping_fee: 0.0,
            grand_total: 0.0,
            status: OrderStatus::Pending,
            payment_reference: optional_text(input.payment_reference.as_deref()),
            shipping_address,
            shipping_method,
            created_at: now,
            updated_at: now,
        };
        order.recompute_totals();
        Ok(order)
    }

    /// Applies `patch` to a copy of this order.
    pub fn patched(&self, patch: OrderPatch, now: i64) -> Result<Self, OrderUpdateError> {
        let mut order = self.clone();
        if patch.shipping_address.is_some() || patch.shipping_method.is_some() {
            if self.status != OrderStatus::Pending {
                return Err(OrderUpdateError::ShippingLocked(self.status));
            }
            if let Some(address) = patch.shipping_address {
                order.shipping_address = address.validated()?;
            }
            if let Some(method) = patch.shipping_method {
                order.shipping_method = method.validated()?;
            }
        }
        if let Some(reference) = patch.payment_reference {
            order.payment_reference = optional_text(Some(&reference));
        }
        if let Some(raw) = patch.status {
            let next = OrderStatus::parse(&raw).ok_or_else(|| {
                ValidationError::invalid("status", "must be pending, paid, cancelled or refunded")
            })?;
            if next != self.status && !self.status.can_become(next) {
                return Err(OrderUpdateError::Transition {
                    from: self.status,
                    to: next,
                });
            }
            order.status = next;
        }
        if order.status == OrderStatus::Paid && order.payment_reference.is_none() {
            return Err(OrderUpdateError::MissingPaymentReference);
        }
        order.recompute_totals();
        order.updated_at = now;
        Ok(order)
    }

    fn recompute_totals(&mut self) {
        let selected = || self.items.iter().filter(|item| item.selected);
        let items_total: f64 = selected().map(|item| item.total_price).sum();
        let discount_total: f64 = selected()
            .map(|item| {
                (item.original_price - item.discounted_price).max(0.0) * f64::from(item.quantity)
            })
            .sum();
        self.items_total = round_money(items_total);
        self.discount_total = round_money(discount_total);
        self.shipping_fee = round_money(self.shipping_method.price);
        self.grand_total = round_money(self.items_total + self.shipping_fee);
    }
}

fn build_item(item: NewOrderItem, currency: &str, now: i64) -> Result<OrderItem, ValidationError> {
    let price = |field: &'static str, value: Option<f64>| {
        require_amount(field, value.ok_or(ValidationError::Required(field))?)
    };
    let quantity = match item.quantity {
        None => return Err(ValidationError::Required("items.quantity")),
        Some(value) if value < 1 || value > i64::from(u32::MAX) => {
            return Err(ValidationError::invalid("items.quantity", "must be at least 1"))
        }
        Some(value) => value as u32,
    };
    let item_currency = optional_text(item.currency.as_deref())
        .ok_or(ValidationError::Required("items.currency"))?;
    if item_currency != currency {
        return Err(ValidationError::invalid(
            "items.currency",
            format!("must match the order currency {currency}"),
        ));
    }
    let discounted_price = price("items.discountedPrice", item.discounted_price)?;
    Ok(OrderItem {
        product_id: require_text("items.productId", item.product_id.as_deref().unwrap_or_default())?,
        title: require_text("items.title", item.title.as_deref().unwrap_or_default())?,
        original_price: price("items.originalPrice", item.original_price)?,
        discounted_price,
        quantity,
        currency: item_currency,
        images: item
            .images
            .iter()
            .filter_map(|image| optional_text(Some(image)))
            .collect(),
        size: optional_text(item.size.as_deref()),
        color: optional_text(item.color.as_deref()),
        selected: item.selected.unwrap_or(true),
        total_price: round_money(discounted_price * f64::from(quantity)),
        added_at: now,
    })
}

fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn item(product: &str, original: f64, discounted: f64, quantity: i64) -> NewOrderItem {
        NewOrderItem {
            product_id: Some(product.into()),
            title: Some(format!("Product {product}")),
            original_price: Some(original),
            discounted_price: Some(discounted),
            quantity: Some(quantity),
            currency: Some("NGN".into()),
            ..NewOrderItem::default()
        }
    }

    fn new_order(items: Vec<NewOrderItem>) -> NewOrder {
        NewOrder {
            user_id: Some(Uuid::new_v4()),
            items,
            currency: Some("NGN".into()),
            shipping_address: Some(ShippingAddress {
                name: "Ada Obi".into(),
                address: "12 Allen Avenue".into(),
                lga: "Ikeja".into(),
                state: "Lagos".into(),
                postal_code: "100001".into(),
                phone: "+2348000000000".into(),
            }),
            shipping_method: Some(ShippingMethodInput {
                label: Some("Standard".into()),
                price: Some(1_500.0),
                ..ShippingMethodInput::default()
            }),
            payment_reference: None,
        }
    }

    #[test]
    fn totals_count_selected_items_only() {
        let mut skipped = item("c", 100.0, 50.0, 1);
        skipped.selected = Some(false);
        let order = Order::from_new(
            new_order(vec![item("a", 1_000.0, 800.0, 2), item("b", 300.0, 300.0, 1), skipped]),
            Uuid::new_v4(),
            1,
        )
        .unwrap();

        assert_eq!(order.items[0].total_price, 1_600.0);
        assert_eq!(order.items_total, 1_900.0);
        assert_eq!(order.discount_total, 400.0);
        assert_eq!(order.shipping_fee, 1_500.0);
        assert_eq!(order.grand_total, 3_400.0);
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn item_rules_are_enforced() {
        assert!(Order::from_new(new_order(vec![item("a", 10.0, 8.0, 0)]), Uuid::new_v4(), 1).is_err());
        assert_eq!(
            Order::from_new(new_order(Vec::new()), Uuid::new_v4(), 1).unwrap_err(),
            ValidationError::Required("items")
        );

        let mut dollars = item("a", 10.0, 8.0, 1);
        dollars.currency = Some("USD".into());
        assert!(matches!(
            Order::from_new(new_order(vec![dollars]), Uuid::new_v4(), 1),
            Err(ValidationError::Invalid {
                field: "items.currency",
                ..
            })
        ));

        let mut none_selected = item("a", 10.0, 8.0, 1);
        none_selected.selected = Some(false);
        assert!(Order::from_new(new_order(vec![none_selected]), Uuid::new_v4(), 1).is_err());
    }

    #[test]
    fn status_lifecycle_is_guarded() {
        let order = Order::from_new(new_order(vec![item("a", 10.0, 8.0, 1)]), Uuid::new_v4(), 1).unwrap();
        let status = |raw: &str| OrderPatch {
            status: Some(raw.into()),
            ..OrderPatch::default()
        };

        assert_eq!(
            order.patched(status("paid"), 2),
            Err(OrderUpdateError::MissingPaymentReference)
        );
        let paid = order
            .patched(
                OrderPatch {
                    status: Some("paid".into()),
                    payment_reference: Some("ref-1".into()),
                    ..OrderPatch::default()
                },
                2,
            )
            .unwrap();
        assert_eq!(paid.status, OrderStatus::Paid);
        assert_eq!(paid.updated_at, 2);

        assert_eq!(
            paid.patched(status("cancelled"), 3),
            Err(OrderUpdateError::Transition {
                from: OrderStatus::Paid,
                to: OrderStatus::Cancelled,
            })
        );
        assert_eq!(paid.patched(status("refunded"), 3).unwrap().status, OrderStatus::Refunded);
        assert!(matches!(
            paid.patched(status("shipped"), 3),
            Err(OrderUpdateError::Validation(_))
        ));
    }

    #[test]
    fn shipping_changes_reprice_pending_orders_only() {
        let order = Order::from_new(new_order(vec![item("a", 10.0, 8.0, 1)]), Uuid::new_v4(), 1).unwrap();
        let pickup = || OrderPatch {
            shipping_method: Some(ShippingMethodInput {
                label: Some("Pickup".into()),
                price: Some(0.0),
                ..ShippingMethodInput::default()
            }),
            ..OrderPatch::default()
        };

        let repriced = order.patched(pickup(), 2).unwrap();
        assert_eq!(repriced.shipping_fee, 0.0);
        assert_eq!(repriced.grand_total, 8.0);

        let cancelled = order
            .patched(
                OrderPatch {
                    status: Some("cancelled".into()),
                    ..OrderPatch::default()
                },
                2,
            )
            .unwrap();
        assert_eq!(
            cancelled.patched(pickup(), 3),
            Err(OrderUpdateError::ShippingLocked(OrderStatus::Cancelled))
        );
    }
}
