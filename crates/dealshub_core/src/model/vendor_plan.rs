//! Subscription plans offered to vendors.
//!
//! # Invariants
//! - `name` is required, `price` is a non-negative amount.
//! - `features` holds trimmed, non-blank entries.

use crate::model::{optional_text, require_amount, require_text, ValidationError, VendorPlanId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanDuration {
    #[default]
    Monthly,
    Yearly,
}

impl PlanDuration {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorPlan {
    pub id: VendorPlanId,
    pub name: String,
    pub price: f64,
    pub duration: PlanDuration,
    pub features: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Caller input for a plan; `duration` is raw so bad values read as validation errors.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VendorPlanInput {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub duration: Option<String>,
    pub features: Option<Vec<String>>,
}

impl VendorPlan {
    pub fn from_input(
        input: VendorPlanInput,
        id: VendorPlanId,
        now: i64,
    ) -> Result<Self, ValidationError> {
        let duration = match optional_text(input.duration.as_deref()) {
            None => PlanDuration::default(),
            Some(raw) => PlanDuration::parse(&raw)
                .ok_or_else(|| ValidationError::invalid("duration", "must be monthly or yearly"))?,
        };
        Ok(Self {
            id,
            name: require_text("name", input.name.as_deref().unwrap_or_default())?,
            price: require_amount("price", input.price.ok_or(ValidationError::Required("price"))?)?,
            duration,
            features: input
                .features
                .unwrap_or_default()
                .iter()
                .filter_map(|feature| optional_text(Some(feature)))
                .collect(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn merged(&self, patch: VendorPlanInput, now: i64) -> Result<Self, ValidationError> {
        let merged = VendorPlanInput {
            name: patch.name.or_else(|| Some(self.name.clone())),
            price: patch.price.or(Some(self.price)),
            duration: patch
                .duration
                .or_else(|| Some(self.duration.as_str().to_string())),
            features: patch.features.or_else(|| Some(self.features.clone())),
        };
        let mut plan = Self::from_input(merged, self.id, now)?;
        plan.created_at = self.created_at;
        Ok(plan)
    }
}
