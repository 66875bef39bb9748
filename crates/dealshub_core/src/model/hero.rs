//! Homepage hero banners.
//!
//! # Invariants
//! - Every text field is required and stored trimmed.

use crate::model::{optional_text, HeroId, ValidationError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hero {
    pub id: HeroId,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub image: String,
    pub gradient: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Caller input for creating a hero, and the field set of a patch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeroInput {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub gradient: Option<String>,
}

impl Hero {
    pub fn from_input(input: HeroInput, id: HeroId, now: i64) -> Result<Self, ValidationError> {
        Ok(Self {
            id,
            title: required("title", input.title)?,
            subtitle: required("subtitle", input.subtitle)?,
            description: required("description", input.description)?,
            image: required("image", input.image)?,
            gradient: required("gradient", input.gradient)?,
            created_at: now,
            updated_at: now,
        })
    }

    /// Merges `patch` over this hero and re-validates the result.
    pub fn merged(&self, patch: HeroInput, now: i64) -> Result<Self, ValidationError> {
        let merged = HeroInput {
            title: patch.title.or_else(|| Some(self.title.clone())),
            subtitle: patch.subtitle.or_else(|| Some(self.subtitle.clone())),
            description: patch.description.or_else(|| Some(self.description.clone())),
            image: patch.image.or_else(|| Some(self.image.clone())),
            gradient: patch.gradient.or_else(|| Some(self.gradient.clone())),
        };
        let mut hero = Self::from_input(merged, self.id, now)?;
        hero.created_at = self.created_at;
        Ok(hero)
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String, ValidationError> {
    optional_text(value.as_deref()).ok_or(ValidationError::Required(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn input() -> HeroInput {
        HeroInput {
            title: Some(" Black Friday ".into()),
            subtitle: Some("Up to 70% off".into()),
            description: Some("Electronics, fashion and more".into()),
            image: Some("https://cdn.example.com/hero.png".into()),
            gradient: Some("from-purple-600 to-pink-500".into()),
        }
    }

    #[test]
    fn from_input_trims_and_requires_every_field() {
        let hero = Hero::from_input(input(), Uuid::new_v4(), 3).unwrap();
        assert_eq!(hero.title, "Black Friday");

        let mut raw = input();
        raw.gradient = Some("   ".into());
        assert_eq!(
            Hero::from_input(raw, Uuid::new_v4(), 3).unwrap_err(),
            ValidationError::Required("gradient")
        );
    }

    #[test]
    fn merged_only_replaces_supplied_fields() {
        let hero = Hero::from_input(input(), Uuid::new_v4(), 3).unwrap();
        let updated = hero
            .merged(
                HeroInput {
                    subtitle: Some("Ends tonight".into()),
                    ..HeroInput::default()
                },
                8,
            )
            .unwrap();
        assert_eq!(updated.subtitle, "Ends tonight");
        assert_eq!(updated.title, hero.title);
        assert_eq!((updated.created_at, updated.updated_at), (3, 8));
    }
}
