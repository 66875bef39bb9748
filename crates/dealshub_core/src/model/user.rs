//! Marketplace user accounts.
//!
//! # Invariants
//! - `email` is stored lowercased and unique.
//! - Magic-link token material is never serialized.

use crate::model::{optional_text, require_text, UserId, ValidationError};
use serde::{Deserialize, Serialize};

/// Deals a new account may post before upgrading.
pub const DEFAULT_DEALS_ALLOWANCE: i64 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    #[default]
    Regular,
    Vendor,
}

impl UserType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Vendor => "vendor",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "regular" => Some(Self::Regular),
            "vendor" => Some(Self::Vendor),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Suspended,
}

impl UserStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "active" => Some(Self::Active),
            "suspended" => Some(Self::Suspended),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Premium,
    Pro,
}

impl Plan {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Premium => "premium",
            Self::Pro => "pro",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "free" => Some(Self::Free),
            "premium" => Some(Self::Premium),
            "pro" => Some(Self::Pro),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::User => "User",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Admin" => Some(Self::Admin),
            "User" => Some(Self::User),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub google_id: Option<String>,
    pub display_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub photo: Option<String>,
    pub deals_count: i64,
    #[serde(rename = "type")]
    pub user_type: UserType,
    pub brand: Option<String>,
    pub status: UserStatus,
    pub deals_posted: i64,
    pub plan: Plan,
    pub preferences: Vec<String>,
    pub role: Role,
    pub created_at: i64,
}

impl User {
    /// Fresh account for `email` with default allowances.
    pub fn new(id: UserId, email: &str, now: i64) -> Result<Self, ValidationError> {
        Ok(Self {
            id,
            google_id: None,
            display_name: None,
            first_name: None,
            last_name: None,
            email: normalize_email(email)?,
            photo: None,
            deals_count: DEFAULT_DEALS_ALLOWANCE,
            user_type: UserType::Regular,
            brand: None,
            status: UserStatus::Active,
            deals_posted: 0,
            plan: Plan::Free,
            preferences: Vec::new(),
            role: Role::User,
            created_at: now,
        })
    }
}

/// Identity returned by an OAuth provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GoogleProfile {
    pub google_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub photo: Option<String>,
}

/// Profile update; at least one field must be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl ProfileUpdate {
    pub fn apply(self, user: &mut User) -> Result<(), ValidationError> {
        let email = optional_text(self.email.as_deref());
        let first_name = optional_text(self.first_name.as_deref());
        let last_name = optional_text(self.last_name.as_deref());
        if email.is_none() && first_name.is_none() && last_name.is_none() {
            return Err(ValidationError::invalid(
                "profile",
                "provide at least one field to update",
            ));
        }
        if let Some(email) = email {
            user.email = normalize_email(&email)?;
        }
        if first_name.is_some() {
            user.first_name = first_name;
        }
        if last_name.is_some() {
            user.last_name = last_name;
        }
        Ok(())
    }
}

/// Trims and lowercases an email address, requiring an `@` with text on both sides.
pub fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let email = require_text("email", raw)?.to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(ValidationError::invalid("email", "must be an email address")),
    }
}

/// Local part of an email, used as a fallback display name.
pub fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn new_user_gets_default_allowance() {
        let user = User::new(Uuid::new_v4(), " Ada@Example.COM ", 0).unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.deals_count, DEFAULT_DEALS_ALLOWANCE);
        assert_eq!(user.role, Role::User);
        assert_eq!(user.plan, Plan::Free);
    }

    #[test]
    fn normalize_email_rejects_malformed() {
        assert!(normalize_email("nobody").is_err());
        assert!(normalize_email("@host").is_err());
        assert!(normalize_email("").is_err());
    }

    #[test]
    fn profile_update_requires_a_field() {
        let mut user = User::new(Uuid::new_v4(), "a@b.c", 0).unwrap();
        assert!(ProfileUpdate::default().apply(&mut user).is_err());

        ProfileUpdate {
            first_name: Some("Ada".into()),
            ..ProfileUpdate::default()
        }
        .apply(&mut user)
        .unwrap();
        assert_eq!(user.first_name.as_deref(), Some("Ada"));
        assert_eq!(user.email, "a@b.c");
    }

    #[test]
    fn email_local_part_splits_at_sign() {
        assert_eq!(email_local_part("ada@example.com"), "ada");
    }
}
