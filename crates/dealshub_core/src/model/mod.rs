//! Marketplace domain model.
//!
//! # Responsibility
//! - Define canonical records for deals, vendors, forum posts, coupons,
//!   group deals, users and their comment threads.
//! - Define storefront records: heroes, curated categories, vendor plans
//!   and orders.
//! - Keep field-level validation next to the data it guards.
//!
//! # Invariants
//! - Every record is identified by a stable UUID v4.
//! - Timestamps are Unix epoch milliseconds.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub mod comment;
pub mod coupon;
pub mod curated;
pub mod deal;
pub mod forum;
pub mod group_deal;
pub mod hero;
pub mod order;
pub mod reaction;
pub mod trending;
pub mod user;
pub mod vendor;
pub mod vendor_plan;

pub type UserId = Uuid;
pub type DealId = Uuid;
pub type VendorId = Uuid;
pub type PostId = Uuid;
pub type CommentId = Uuid;
pub type CouponId = Uuid;
pub type GroupDealId = Uuid;
pub type HeroId = Uuid;
pub type VendorPlanId = Uuid;
pub type OrderId = Uuid;

/// Field-level validation failure shared by all domain records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Field is missing or blank after trim.
    Required(&'static str),
    /// Field is shorter than the minimum number of characters.
    TooShort { field: &'static str, min: usize },
    /// Field is present but violates a domain rule.
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl ValidationError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Required(field) => write!(f, "{field} is required"),
            Self::TooShort { field, min } => {
                write!(f, "{field} must be at least {min} characters")
            }
            Self::Invalid { field, message } => write!(f, "invalid {field}: {message}"),
        }
    }
}

impl Error for ValidationError {}

/// Current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}

/// Trims a required text field and rejects blank values.
pub fn require_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(trimmed.to_string())
}

/// Trims an optional text field, collapsing blank values to `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Rejects negative or non-finite money amounts.
pub fn require_amount(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::invalid(field, "must be a non-negative number"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::{optional_text, require_amount, require_text, ValidationError};

    #[test]
    fn require_text_trims_and_rejects_blank() {
        assert_eq!(require_text("title", "  hi ").unwrap(), "hi");
        assert_eq!(
            require_text("title", "   ").unwrap_err(),
            ValidationError::Required("title")
        );
    }

    #[test]
    fn optional_text_collapses_blank_to_none() {
        assert_eq!(optional_text(Some("  ")), None);
        assert_eq!(optional_text(Some(" x ")), Some("x".to_string()));
        assert_eq!(optional_text(None), None);
    }

    #[test]
    fn require_amount_rejects_negative_and_nan() {
        assert!(require_amount("price", -1.0).is_err());
        assert!(require_amount("price", f64::NAN).is_err());
        assert_eq!(require_amount("price", 0.0).unwrap(), 0.0);
    }
}
