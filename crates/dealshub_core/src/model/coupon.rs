//! Promotional coupon codes.
//!
//! # Invariants
//! - `code` is trimmed, uppercased and unique across coupons.
//! - Every text field except `is_popular` is required.

use crate::model::{optional_text, require_text, CouponId, ValidationError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: CouponId,
    pub background_color: String,
    pub is_popular: bool,
    pub discount: String,
    pub title: String,
    pub description: String,
    pub vendor: String,
    pub expires_at: i64,
    pub code: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Caller input for creating a coupon, and the field set of a patch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CouponInput {
    pub background_color: Option<String>,
    pub is_popular: Option<bool>,
    pub discount: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub vendor: Option<String>,
    pub expires_at: Option<i64>,
    pub code: Option<String>,
}

impl Coupon {
    pub fn from_input(input: CouponInput, id: CouponId, now: i64) -> Result<Self, ValidationError> {
        Ok(Self {
            id,
            background_color: required("backgroundColor", input.background_color)?,
            is_popular: input.is_popular.unwrap_or(false),
            discount: required("discount", input.discount)?,
            title: required("title", input.title)?,
            description: required("description", input.description)?,
            vendor: required("vendor", input.vendor)?,
            expires_at: input.expires_at.ok_or(ValidationError::Required("expiresAt"))?,
            code: normalize_code(input.code.as_deref().unwrap_or_default())?,
            created_at: now,
            updated_at: now,
        })
    }

    /// Merges `patch` over this coupon and re-validates the result.
    pub fn merged(&self, patch: CouponInput, now: i64) -> Result<Self, ValidationError> {
        let merged = CouponInput {
            background_color: patch
                .background_color
                .or_else(|| Some(self.background_color.clone())),
            is_popular: patch.is_popular.or(Some(self.is_popular)),
            discount: patch.discount.or_else(|| Some(self.discount.clone())),
            title: patch.title.or_else(|| Some(self.title.clone())),
            description: patch.description.or_else(|| Some(self.description.clone())),
            vendor: patch.vendor.or_else(|| Some(self.vendor.clone())),
            expires_at: patch.expires_at.or(Some(self.expires_at)),
            code: patch.code.or_else(|| Some(self.code.clone())),
        };
        let mut coupon = Self::from_input(merged, self.id, now)?;
        coupon.created_at = self.created_at;
        Ok(coupon)
    }
}

/// Trims and uppercases a coupon code.
pub fn normalize_code(raw: &str) -> Result<String, ValidationError> {
    Ok(require_text("code", raw)?.to_uppercase())
}

fn required(field: &'static str, value: Option<String>) -> Result<String, ValidationError> {
    optional_text(value.as_deref()).ok_or(ValidationError::Required(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn input() -> CouponInput {
        CouponInput {
            background_color: Some("#ff0000".into()),
            discount: Some("20%".into()),
            title: Some("Summer".into()),
            description: Some("Summer sale".into()),
            vendor: Some("Acme".into()),
            expires_at: Some(1_000),
            code: Some("  summer20 ".into()),
            ..CouponInput::default()
        }
    }

    #[test]
    fn code_is_trimmed_and_uppercased() {
        let coupon = Coupon::from_input(input(), Uuid::new_v4(), 1).unwrap();
        assert_eq!(coupon.code, "SUMMER20");
        assert!(!coupon.is_popular);
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let mut raw = input();
        raw.vendor = None;
        assert_eq!(
            Coupon::from_input(raw, Uuid::new_v4(), 1).unwrap_err(),
            ValidationError::Required("vendor")
        );
    }

    #[test]
    fn merged_keeps_creation_time_and_revalidates() {
        let coupon = Coupon::from_input(input(), Uuid::new_v4(), 1).unwrap();
        let updated = coupon
            .merged(
                CouponInput {
                    code: Some("winter".into()),
                    ..CouponInput::default()
                },
                9,
            )
            .unwrap();
        assert_eq!(updated.code, "WINTER");
        assert_eq!(updated.created_at, 1);
        assert_eq!(updated.updated_at, 9);

        let blank = coupon.merged(
            CouponInput {
                title: Some(" ".into()),
                ..CouponInput::default()
            },
            9,
        );
        assert_eq!(blank.unwrap_err(), ValidationError::Required("title"));
    }
}
