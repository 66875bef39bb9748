//! Curated deal categories shown as homepage collections.
//!
//! # Invariants
//! - `id` is a caller-assigned positive number, unique and immutable.
//! - Collections are listed by `id` ascending.

use crate::model::{optional_text, require_amount, ValidationError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CuratedCategory {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub image: String,
    pub deals_count: u32,
    pub max_discount: f64,
    pub color: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CuratedCategoryInput {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub deals_count: Option<i64>,
    pub max_discount: Option<f64>,
    pub color: Option<String>,
}

impl CuratedCategory {
    pub fn from_input(input: CuratedCategoryInput, now: i64) -> Result<Self, ValidationError> {
        let id = match input.id {
            None => return Err(ValidationError::Required("id")),
            Some(id) if id <= 0 => {
                return Err(ValidationError::invalid("id", "must be a positive number"))
            }
            Some(id) => id,
        };
        let deals_count = input
            .deals_count
            .ok_or(ValidationError::Required("dealsCount"))
            .and_then(|count| {
                u32::try_from(count)
                    .map_err(|_| ValidationError::invalid("dealsCount", "must be a non-negative count"))
            })?;
        Ok(Self {
            id,
            title: required("title", input.title)?,
            description: required("description", input.description)?,
            image: required("image", input.image)?,
            deals_count,
            max_discount: require_amount(
                "maxDiscount",
                input.max_discount.ok_or(ValidationError::Required("maxDiscount"))?,
            )?,
            color: required("color", input.color)?,
            created_at: now,
            updated_at: now,
        })
    }

    /// Merges `patch` over this category; the id never changes.
    pub fn merged(&self, patch: CuratedCategoryInput, now: i64) -> Result<Self, ValidationError> {
        if patch.id.is_some_and(|id| id != self.id) {
            return Err(ValidationError::invalid("id", "cannot be changed"));
        }
        let merged = CuratedCategoryInput {
            id: Some(self.id),
            title: patch.title.or_else(|| Some(self.title.clone())),
            description: patch.description.or_else(|| Some(self.description.clone())),
            image: patch.image.or_else(|| Some(self.image.clone())),
            deals_count: patch.deals_count.or(Some(i64::from(self.deals_count))),
            max_discount: patch.max_discount.or(Some(self.max_discount)),
            color: patch.color.or_else(|| Some(self.color.clone())),
        };
        let mut category = Self::from_input(merged, now)?;
        category.created_at = self.created_at;
        Ok(category)
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String, ValidationError> {
    optional_text(value.as_deref()).ok_or(ValidationError::Required(field))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> CuratedCategoryInput {
        CuratedCategoryInput {
            id: Some(1),
            title: Some("Tech Deals".into()),
            description: Some("Gadgets under 50k".into()),
            image: Some("https://cdn.example.com/tech.png".into()),
            deals_count: Some(24),
            max_discount: Some(60.0),
            color: Some("bg-blue-500".into()),
        }
    }

    #[test]
    fn id_and_counts_are_validated() {
        assert_eq!(CuratedCategory::from_input(input(), 1).unwrap().deals_count, 24);

        let mut raw = input();
        raw.id = Some(0);
        assert!(CuratedCategory::from_input(raw, 1).is_err());

        let mut raw = input();
        raw.deals_count = Some(-1);
        assert!(matches!(
            CuratedCategory::from_input(raw, 1),
            Err(ValidationError::Invalid {
                field: "dealsCount",
                ..
            })
        ));

        let mut raw = input();
        raw.max_discount = None;
        assert_eq!(
            CuratedCategory::from_input(raw, 1).unwrap_err(),
            ValidationError::Required("maxDiscount")
        );
    }

    #[test]
    fn merged_keeps_the_id() {
        let category = CuratedCategory::from_input(input(), 1).unwrap();
        let updated = category
            .merged(
                CuratedCategoryInput {
                    id: Some(1),
                    deals_count: Some(30),
                    ..CuratedCategoryInput::default()
                },
                5,
            )
            .unwrap();
        assert_eq!(updated.deals_count, 30);
        assert_eq!(updated.created_at, 1);

        let moved = category.merged(
            CuratedCategoryInput {
                id: Some(2),
                ..CuratedCategoryInput::default()
            },
            5,
        );
        assert!(moved.is_err());
    }
}
