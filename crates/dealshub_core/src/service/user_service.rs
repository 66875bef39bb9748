//! User account use-cases.
//!
//! # Invariants
//! - Emails are stored lowercased and unique.
//! - `deals_count` never goes below zero.
//! - Upgrading to a vendor requires a brand.

use crate::model::user::{
    email_local_part, normalize_email, GoogleProfile, Plan, ProfileUpdate, User, UserStatus,
    UserType,
};
use crate::model::{now_epoch_ms, optional_text, require_text, UserId, ValidationError};
use crate::repo::user_repo::{UserCounter, UserRepository};
use crate::service::{ServiceError, ServiceResult};
use log::info;
use uuid::Uuid;

pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// All users, oldest first.
    pub fn list_users(&self) -> ServiceResult<Vec<User>> {
        Ok(self.repo.list_users()?)
    }

    pub fn get_user(&self, id: UserId) -> ServiceResult<User> {
        require_user(&self.repo, id)
    }

    pub fn update_profile(&self, id: UserId, update: ProfileUpdate) -> ServiceResult<User> {
        let mut user = self.get_user(id)?;
        update.apply(&mut user)?;
        self.repo.update_user(&user)?;
        info!("event=user_profile_update module=users status=ok user_id={id}");
        Ok(user)
    }

    pub fn preferences(&self, id: UserId) -> ServiceResult<Vec<String>> {
        Ok(self.get_user(id)?.preferences)
    }

    /// Replaces the preference list, dropping blanks and duplicates.
    pub fn set_preferences(&self, id: UserId, preferences: Vec<String>) -> ServiceResult<User> {
        let mut user = self.get_user(id)?;
        let mut cleaned: Vec<String> = Vec::new();
        for preference in preferences
            .iter()
            .filter_map(|value| optional_text(Some(value)))
        {
            if !cleaned.contains(&preference) {
                cleaned.push(preference);
            }
        }
        user.preferences = cleaned;
        self.repo.update_user(&user)?;
        Ok(user)
    }

    pub fn set_status(&self, id: UserId, raw_status: &str) -> ServiceResult<User> {
        let status = UserStatus::parse(raw_status.trim())
            .ok_or_else(|| ValidationError::invalid("status", "must be active or suspended"))?;
        let mut user = self.get_user(id)?;
        user.status = status;
        self.repo.update_user(&user)?;
        info!(
            "event=user_status module=users status=ok user_id={id} user_status={}",
            status.as_str()
        );
        Ok(user)
    }

    /// Spends one unit of the user's deal allowance.
    pub fn decrement_deals_count(&self, id: UserId) -> ServiceResult<User> {
        let user = self.get_user(id)?;
        if user.deals_count <= 0 {
            return Err(ServiceError::Conflict(
                "no remaining deal allowance".to_string(),
            ));
        }
        Ok(self.repo.adjust_counter(id, UserCounter::DealsCount, -1)?)
    }

    pub fn increment_deals_posted(&self, id: UserId) -> ServiceResult<User> {
        Ok(self.repo.adjust_counter(id, UserCounter::DealsPosted, 1)?)
    }

    /// Turns a regular account into a vendor account.
    pub fn upgrade_to_vendor(
        &self,
        id: UserId,
        brand: &str,
        plan: Option<&str>,
    ) -> ServiceResult<User> {
        let brand = require_text("brand", brand)?;
        let plan = match optional_text(plan) {
            None => Plan::Free,
            Some(raw) => Plan::parse(&raw)
                .ok_or_else(|| ValidationError::invalid("plan", "must be free, premium or pro"))?,
        };
        let mut user = self.get_user(id)?;
        user.user_type = UserType::Vendor;
        user.brand = Some(brand);
        user.plan = plan;
        self.repo.update_user(&user)?;
        info!(
            "event=user_upgrade module=users status=ok user_id={id} plan={}",
            plan.as_str()
        );
        Ok(user)
    }

    pub fn upsert_google_profile(&self, profile: GoogleProfile) -> ServiceResult<User> {
        upsert_google_profile(&self.repo, profile)
    }
}

pub(crate) fn require_user<R: UserRepository>(repo: &R, id: UserId) -> ServiceResult<User> {
    repo.get_user(id)?
        .ok_or_else(|| ServiceError::not_found("user", id))
}

/// Refreshes the account linked to `google_id`, or links/creates one by email.
pub(crate) fn upsert_google_profile<R: UserRepository>(
    repo: &R,
    profile: GoogleProfile,
) -> ServiceResult<User> {
    let google_id = require_text("googleId", &profile.google_id)?;
    let existing = match repo.find_by_google_id(&google_id)? {
        Some(user) => Some(user),
        None => {
            let email = normalize_email(&profile.email)?;
            repo.find_by_email(&email)?
        }
    };

    let created = existing.is_none();
    let mut user = match existing {
        Some(user) => user,
        None => User::new(Uuid::new_v4(), &profile.email, now_epoch_ms())?,
    };
    user.google_id = Some(google_id);
    user.display_name = optional_text(profile.display_name.as_deref())
        .or(user.display_name)
        .or_else(|| Some(email_local_part(&user.email).to_string()));
    user.first_name = optional_text(profile.first_name.as_deref()).or(user.first_name);
    user.last_name = optional_text(profile.last_name.as_deref()).or(user.last_name);
    user.photo = optional_text(profile.photo.as_deref()).or(user.photo);

    if created {
        repo.insert_user(&user)?;
    } else {
        repo.update_user(&user)?;
    }
    info!("event=google_upsert module=users status=ok created={created}");
    Ok(user)
}
