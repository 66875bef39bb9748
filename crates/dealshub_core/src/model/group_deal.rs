//! Group deals and their slot lifecycle.
//!
//! # Responsibility
//! - Define the group deal record and its fixed set of participation slots.
//! - Encode slot transitions as pure state changes on the record.
//!
//! # Invariants
//! - A deal owns exactly `total_slots` slots, positioned `0..total_slots`,
//!   with `total_slots` in `1..=MAX_GROUP_DEAL_SLOTS`.
//! - A slot is `Available` iff it has no holder.
//! - A user holds at most one slot per deal.
//! - Slots only move forward: available -> reserved -> paid.
//! - The deal is `Completed` once every slot is paid.

use crate::model::{
    optional_text, require_amount, require_text, GroupDealId, UserId, ValidationError, VendorId,
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Upper bound on slots per deal; every slot is a stored row.
pub const MAX_GROUP_DEAL_SLOTS: u32 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Available,
    Reserved,
    Paid,
}

impl SlotStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Reserved => "reserved",
            Self::Paid => "paid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "available" => Some(Self::Available),
            "reserved" => Some(Self::Reserved),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupDealStatus {
    #[default]
    Active,
    Pending,
    Completed,
    Expired,
}

impl GroupDealStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Expired => "expired",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "active" => Some(Self::Active),
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingType {
    Free,
    #[default]
    Paid,
}

impl ShippingType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Paid => "paid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "free" => Some(Self::Free),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub position: u32,
    #[serde(rename = "user")]
    pub user_id: Option<UserId>,
    pub status: SlotStatus,
    pub reserved_at: Option<i64>,
    pub paid_at: Option<i64>,
}

impl Slot {
    pub fn available(position: u32) -> Self {
        Self {
            position,
            user_id: None,
            status: SlotStatus::Available,
            reserved_at: None,
            paid_at: None,
        }
    }
}

/// Rejected slot transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    /// Deal is not `Active`.
    DealNotActive(GroupDealStatus),
    /// Deal is past `expires_at`.
    DealExpired,
    /// User already holds a slot on this deal.
    AlreadyJoined(UserId),
    /// Every slot is taken.
    NoSlotsAvailable,
    /// User holds no reserved slot to pay for.
    NoReservedSlot(UserId),
    /// Deal has paid participants and cannot be removed.
    HasPaidSlots,
}

impl Display for SlotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DealNotActive(status) => {
                write!(f, "deal not available: status is {}", status.as_str())
            }
            Self::DealExpired => write!(f, "deal not available: expired"),
            Self::AlreadyJoined(_) => write!(f, "user already has a slot"),
            Self::NoSlotsAvailable => write!(f, "no slots available"),
            Self::NoReservedSlot(_) => write!(f, "no reserved slot found"),
            Self::HasPaidSlots => write!(f, "cannot delete deal with paid slots"),
        }
    }
}

impl Error for SlotError {}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDeal {
    pub id: GroupDealId,
    pub title: String,
    pub description: String,
    pub images: Vec<String>,
    pub category: String,
    pub original_price: f64,
    pub discounted_price: f64,
    pub discount_percentage: f64,
    pub currency: String,
    pub total_slots: u32,
    pub slots: Vec<Slot>,
    pub status: GroupDealStatus,
    pub expires_at: i64,
    pub shipping_type: ShippingType,
    pub shipping_note: String,
    pub delivery_estimate: String,
    #[serde(rename = "vendor")]
    pub vendor_id: VendorId,
    pub vendor_name: String,
    pub is_verified: bool,
    pub views: i64,
    pub created_by: UserId,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Caller input for a new group deal.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewGroupDeal {
    pub user_id: Option<UserId>,
    pub vendor_id: Option<VendorId>,
    pub title: String,
    pub description: String,
    pub images: Vec<String>,
    pub original_price: Option<f64>,
    pub discounted_price: Option<f64>,
    pub discount_percentage: Option<f64>,
    pub currency: Option<String>,
    pub total_slots: Option<i64>,
    pub expires_at: Option<i64>,
    pub shipping_type: Option<String>,
    pub shipping_note: Option<String>,
    pub delivery_estimate: Option<String>,
}

impl GroupDeal {
    /// Builds a validated deal with every slot available.
    pub fn from_new(
        input: NewGroupDeal,
        id: GroupDealId,
        vendor_name: &str,
        now: i64,
    ) -> Result<Self, ValidationError> {
        let created_by = input.user_id.ok_or(ValidationError::Required("userId"))?;
        let vendor_id = input.vendor_id.ok_or(ValidationError::Required("vendorId"))?;
        let total_slots = match input.total_slots {
            None => return Err(ValidationError::Required("totalSlots")),
            Some(value) if value <= 0 => {
                return Err(ValidationError::invalid(
                    "totalSlots",
                    "must be a positive number",
                ));
            }
            Some(value) if value > i64::from(MAX_GROUP_DEAL_SLOTS) => {
                return Err(ValidationError::invalid(
                    "totalSlots",
                    format!("must be at most {MAX_GROUP_DEAL_SLOTS}"),
                ));
            }
            Some(value) => value as u32,
        };
        let shipping_type = match optional_text(input.shipping_type.as_deref()) {
            None => ShippingType::default(),
            Some(raw) => ShippingType::parse(&raw)
                .ok_or_else(|| ValidationError::invalid("shippingType", "must be free or paid"))?,
        };
        let price = |field: &'static str, value: Option<f64>| {
            require_amount(field, value.ok_or(ValidationError::Required(field))?)
        };

        Ok(Self {
            id,
            title: require_text("title", &input.title)?,
            description: require_text("description", &input.description)?,
            images: input
                .images
                .into_iter()
                .filter_map(|image| optional_text(Some(&image)))
                .collect(),
            category: "group-deals".to_string(),
            original_price: price("originalPrice", input.original_price)?,
            discounted_price: price("discountedPrice", input.discounted_price)?,
            discount_percentage: price("discountPercentage", input.discount_percentage)?,
            currency: optional_text(input.currency.as_deref()).unwrap_or_else(|| "NGN".into()),
            total_slots,
            slots: (0..total_slots).map(Slot::available).collect(),
            status: GroupDealStatus::Active,
            expires_at: input.expires_at.ok_or(ValidationError::Required("expiresAt"))?,
            shipping_type,
            shipping_note: optional_text(input.shipping_note.as_deref())
                .unwrap_or_else(|| "Delivery fee excluded".into()),
            delivery_estimate: optional_text(input.delivery_estimate.as_deref())
                .unwrap_or_else(|| "2-3 business days".into()),
            vendor_id,
            vendor_name: require_text("vendorName", vendor_name)?,
            is_verified: false,
            views: 0,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }

    pub fn available_slots(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.status == SlotStatus::Available)
            .count()
    }

    pub fn has_paid_slot(&self) -> bool {
        self.slots.iter().any(|slot| slot.status == SlotStatus::Paid)
    }

    pub fn slot_of(&self, user_id: UserId) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.user_id == Some(user_id))
    }

    /// Reserves the lowest available slot for `user_id`.
    ///
    /// Returns the reserved slot position.
    pub fn reserve(&mut self, user_id: UserId, now: i64) -> Result<u32, SlotError> {
        if self.status != GroupDealStatus::Active {
            return Err(SlotError::DealNotActive(self.status));
        }
        if self.is_expired(now) {
            return Err(SlotError::DealExpired);
        }
        if self.slot_of(user_id).is_some() {
            return Err(SlotError::AlreadyJoined(user_id));
        }
        let slot = self
            .slots
            .iter_mut()
            .filter(|slot| slot.status == SlotStatus::Available)
            .min_by_key(|slot| slot.position)
            .ok_or(SlotError::NoSlotsAvailable)?;
        slot.user_id = Some(user_id);
        slot.status = SlotStatus::Reserved;
        slot.reserved_at = Some(now);
        let position = slot.position;
        self.updated_at = now;
        Ok(position)
    }

    /// Marks the user's reserved slot as paid, completing the deal when full.
    pub fn confirm_payment(
        &mut self,
        user_id: UserId,
        now: i64,
    ) -> Result<GroupDealStatus, SlotError> {
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.user_id == Some(user_id) && slot.status == SlotStatus::Reserved)
            .ok_or(SlotError::NoReservedSlot(user_id))?;
        slot.status = SlotStatus::Paid;
        slot.paid_at = Some(now);
        if self
            .slots
            .iter()
            .all(|slot| slot.status == SlotStatus::Paid)
        {
            self.status = GroupDealStatus::Completed;
        }
        self.updated_at = now;
        Ok(self.status)
    }

    /// Rejects deletion while any participant has paid.
    pub fn ensure_deletable(&self) -> Result<(), SlotError> {
        if self.has_paid_slot() {
            return Err(SlotError::HasPaidSlots);
        }
        Ok(())
    }
}

/// Filters for group deal listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupDealFilter {
    pub status: Option<GroupDealStatus>,
    pub vendor_id: Option<VendorId>,
}
