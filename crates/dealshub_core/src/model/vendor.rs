//! Vendor storefront model.
//!
//! # Invariants
//! - `name`, `posted_by`, `identity_img` and `passport_photo` are always set.
//! - `total_deals` never goes below zero.

use crate::model::{optional_text, require_text, UserId, ValidationError, VendorId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VendorType {
    #[default]
    Local,
    International,
}

impl VendorType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::International => "international",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "local" => Some(Self::Local),
            "international" => Some(Self::International),
            _ => None,
        }
    }
}

/// Registered business details, all optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BusinessDetails {
    pub cac_number: Option<String>,
    pub business_website: Option<String>,
    pub business_phone: Option<String>,
    pub business_email: Option<String>,
    pub business_address: Option<String>,
    pub cac_document: Option<String>,
    pub business_logo: Option<String>,
    pub business_banner: Option<String>,
}

impl BusinessDetails {
    fn normalized(self) -> Self {
        Self {
            cac_number: optional_text(self.cac_number.as_deref()),
            business_website: optional_text(self.business_website.as_deref()),
            business_phone: optional_text(self.business_phone.as_deref()),
            business_email: optional_text(self.business_email.as_deref()),
            business_address: optional_text(self.business_address.as_deref()),
            cac_document: optional_text(self.cac_document.as_deref()),
            business_logo: optional_text(self.business_logo.as_deref()),
            business_banner: optional_text(self.business_banner.as_deref()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    pub id: VendorId,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub country: Option<String>,
    #[serde(rename = "type")]
    pub vendor_type: VendorType,
    pub rating: f64,
    pub total_deals: u32,
    pub total_reviews: u32,
    pub logo: Option<String>,
    pub cover_image: Option<String>,
    pub is_verified: bool,
    pub categories: Vec<String>,
    #[serde(rename = "joinedDate")]
    pub joined_at: i64,
    pub response_time: Option<String>,
    pub posted_by: UserId,
    #[serde(flatten)]
    pub business: BusinessDetails,
    pub identity_img: String,
    pub passport_photo: String,
    pub identity_match_score: Option<f64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Caller input for registering a vendor. Upload URLs are filled in by the caller.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewVendor {
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub country: Option<String>,
    #[serde(rename = "type")]
    pub vendor_type: Option<String>,
    pub categories: Vec<String>,
    pub posted_by: Option<UserId>,
    pub response_time: Option<String>,
    #[serde(flatten)]
    pub business: BusinessDetails,
    pub identity_img: Option<String>,
    pub passport_photo: Option<String>,
}

impl Vendor {
    pub fn from_new(input: NewVendor, id: VendorId, now: i64) -> Result<Self, ValidationError> {
        let name = require_text("name", &input.name)?;
        let posted_by = input.posted_by.ok_or(ValidationError::Required("postedBy"))?;
        let identity_img = optional_text(input.identity_img.as_deref())
            .ok_or(ValidationError::Required("identityImg"))?;
        let passport_photo = optional_text(input.passport_photo.as_deref())
            .ok_or(ValidationError::Required("passportPhoto"))?;
        let vendor_type = parse_vendor_type(input.vendor_type.as_deref())?;
        let business = input.business.normalized();

        Ok(Self {
            id,
            name,
            description: optional_text(input.description.as_deref()),
            location: optional_text(input.location.as_deref()),
            country: optional_text(input.country.as_deref()),
            vendor_type,
            rating: 0.0,
            total_deals: 0,
            total_reviews: 0,
            logo: business.business_logo.clone(),
            cover_image: business.business_banner.clone(),
            is_verified: false,
            categories: clean_categories(input.categories),
            joined_at: now,
            response_time: optional_text(input.response_time.as_deref()),
            posted_by,
            business,
            identity_img,
            passport_photo,
            identity_match_score: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial vendor update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VendorPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub country: Option<String>,
    #[serde(rename = "type")]
    pub vendor_type: Option<String>,
    pub rating: Option<f64>,
    pub total_reviews: Option<u32>,
    pub logo: Option<String>,
    pub cover_image: Option<String>,
    pub is_verified: Option<bool>,
    pub categories: Option<Vec<String>>,
    pub response_time: Option<String>,
    pub identity_match_score: Option<f64>,
}

impl VendorPatch {
    pub fn apply(self, vendor: &mut Vendor, now: i64) -> Result<(), ValidationError> {
        if let Some(name) = self.name {
            vendor.name = require_text("name", &name)?;
        }
        if self.vendor_type.is_some() {
            vendor.vendor_type = parse_vendor_type(self.vendor_type.as_deref())?;
        }
        if let Some(rating) = self.rating {
            if !(0.0..=5.0).contains(&rating) {
                return Err(ValidationError::invalid("rating", "must be between 0 and 5"));
            }
            vendor.rating = rating;
        }
        if let Some(description) = self.description {
            vendor.description = optional_text(Some(&description));
        }
        if let Some(location) = self.location {
            vendor.location = optional_text(Some(&location));
        }
        if let Some(country) = self.country {
            vendor.country = optional_text(Some(&country));
        }
        if let Some(total_reviews) = self.total_reviews {
            vendor.total_reviews = total_reviews;
        }
        if let Some(logo) = self.logo {
            vendor.logo = optional_text(Some(&logo));
        }
        if let Some(cover_image) = self.cover_image {
            vendor.cover_image = optional_text(Some(&cover_image));
        }
        if let Some(is_verified) = self.is_verified {
            vendor.is_verified = is_verified;
        }
        if let Some(categories) = self.categories {
            vendor.categories = clean_categories(categories);
        }
        if let Some(response_time) = self.response_time {
            vendor.response_time = optional_text(Some(&response_time));
        }
        if self.identity_match_score.is_some() {
            vendor.identity_match_score = self.identity_match_score;
        }
        vendor.updated_at = now;
        Ok(())
    }
}

/// Filters for vendor listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VendorFilter {
    pub vendor_type: Option<VendorType>,
    pub country: Option<String>,
    pub search: Option<String>,
}

fn parse_vendor_type(value: Option<&str>) -> Result<VendorType, ValidationError> {
    match optional_text(value) {
        None => Ok(VendorType::default()),
        Some(raw) => VendorType::parse(&raw)
            .ok_or_else(|| ValidationError::invalid("type", "must be local or international")),
    }
}

fn clean_categories(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|value| optional_text(Some(&value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn sample() -> NewVendor {
        NewVendor {
            name: " Acme ".into(),
            posted_by: Some(Uuid::new_v4()),
            identity_img: Some("https://cdn/id.png".into()),
            passport_photo: Some("https://cdn/passport.png".into()),
            ..NewVendor::default()
        }
    }

    #[test]
    fn from_new_requires_identity_documents() {
        let mut input = sample();
        input.passport_photo = None;
        assert_eq!(
            Vendor::from_new(input, Uuid::new_v4(), 0).unwrap_err(),
            ValidationError::Required("passportPhoto")
        );
    }

    #[test]
    fn from_new_defaults_to_local_vendor() {
        let vendor = Vendor::from_new(sample(), Uuid::new_v4(), 5).unwrap();
        assert_eq!(vendor.name, "Acme");
        assert_eq!(vendor.vendor_type, VendorType::Local);
        assert_eq!(vendor.total_deals, 0);
        assert_eq!(vendor.joined_at, 5);
    }

    #[test]
    fn unknown_vendor_type_is_rejected() {
        let mut input = sample();
        input.vendor_type = Some("galactic".into());
        assert!(Vendor::from_new(input, Uuid::new_v4(), 0).is_err());
    }
}
