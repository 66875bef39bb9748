//! Deal use-cases.
//!
//! # Responsibility
//! - Create, list, read, patch and delete deals.
//! - Moderation transitions, votes and ratings.
//!
//! # Invariants
//! - Reading one deal counts as a view.
//! - Moderation never re-applies the status a deal already has.
//! - Ratings are whole numbers in `1..=5`.

use crate::model::deal::{Deal, DealFilter, DealPatch, DealSort, DealStatus, NewDeal, VoteKind};
use crate::model::{now_epoch_ms, require_text, DealId, UserId, ValidationError};
use crate::repo::deal_repo::{DealRepository, RatingSummary};
use crate::repo::{Page, PageRequest, RepoError, MAX_PAGE_LIMIT};
use log::info;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Service error for deal use-cases.
#[derive(Debug)]
pub enum DealServiceError {
    Validation(ValidationError),
    /// Target deal does not exist.
    DealNotFound(DealId),
    /// User has not posted any deal.
    NoDealsForUser(UserId),
    /// Moderation target status is already set.
    StatusUnchanged(DealStatus),
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for DealServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::DealNotFound(id) => write!(f, "deal not found: {id}"),
            Self::NoDealsForUser(id) => write!(f, "no deals found for user {id}"),
            Self::StatusUnchanged(status) => write!(f, "deal is already {}", status.as_str()),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent deal state: {details}"),
        }
    }
}

impl Error for DealServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for DealServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for DealServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity: "deal", id } => match Uuid::parse_str(&id) {
                Ok(deal_id) => Self::DealNotFound(deal_id),
                Err(_) => Self::Repo(RepoError::NotFound { entity: "deal", id }),
            },
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

/// Result of a like/upvote/bookmark toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    /// Whether the user holds the vote after the toggle.
    pub active: bool,
    /// Total votes of this kind after the toggle.
    pub count: u32,
}

/// Deal service facade over repository implementations.
pub struct DealService<R: DealRepository> {
    repo: R,
}

impl<R: DealRepository> DealService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_deal(&self, input: NewDeal) -> Result<Deal, DealServiceError> {
        let deal = Deal::from_new(input, Uuid::new_v4(), now_epoch_ms())?;
        self.repo.insert_deal(&deal)?;
        info!(
            "event=deal_create module=deals status=ok deal_id={} deal_status={}",
            deal.id,
            deal.status.as_str()
        );
        self.repo
            .get_deal(deal.id)?
            .ok_or(DealServiceError::InconsistentState(
                "created deal not found in read-back",
            ))
    }

    pub fn list_deals(
        &self,
        filter: &DealFilter,
        page: PageRequest,
    ) -> Result<Page<Deal>, DealServiceError> {
        Ok(self.repo.list_deals(filter, page)?)
    }

    pub fn list_by_brand(
        &self,
        brand: &str,
        sort: DealSort,
        page: PageRequest,
    ) -> Result<Page<Deal>, DealServiceError> {
        let brand = require_text("brand", brand)?;
        Ok(self.repo.list_by_brand(&brand, sort, page)?)
    }

    pub fn list_featured(&self, limit: u32) -> Result<Vec<Deal>, DealServiceError> {
        Ok(self.repo.list_featured(limit.clamp(1, MAX_PAGE_LIMIT))?)
    }

    /// Loads one deal, counting the read as a view.
    pub fn view_deal(&self, id: DealId) -> Result<Deal, DealServiceError> {
        self.repo.increment_views(id)?;
        self.require_deal(id)
    }

    pub fn list_by_creator(&self, user_id: UserId) -> Result<Vec<Deal>, DealServiceError> {
        let deals = self.repo.list_by_creator(user_id)?;
        if deals.is_empty() {
            return Err(DealServiceError::NoDealsForUser(user_id));
        }
        Ok(deals)
    }

    pub fn update_deal(&self, id: DealId, patch: DealPatch) -> Result<Deal, DealServiceError> {
        let mut deal = self.require_deal(id)?;
        patch.apply(&mut deal, now_epoch_ms())?;
        self.repo.update_deal(&deal)?;
        info!("event=deal_update module=deals status=ok deal_id={id}");
        self.require_deal(id)
    }

    pub fn delete_deal(&self, id: DealId) -> Result<(), DealServiceError> {
        self.repo.delete_deal(id)?;
        info!("event=deal_delete module=deals status=ok deal_id={id}");
        Ok(())
    }

    pub fn approve_deal(&self, id: DealId) -> Result<Deal, DealServiceError> {
        self.moderate(id, DealStatus::Active)
    }

    pub fn reject_deal(&self, id: DealId) -> Result<Deal, DealServiceError> {
        self.moderate(id, DealStatus::Rejected)
    }

    /// Toggles one vote kind for `user_id`.
    pub fn toggle_vote(
        &self,
        id: DealId,
        user_id: UserId,
        kind: VoteKind,
    ) -> Result<VoteOutcome, DealServiceError> {
        let active = self.repo.toggle_vote(id, user_id, kind)?;
        let deal = self.require_deal(id)?;
        let count = match kind {
            VoteKind::Like => deal.likes,
            VoteKind::Upvote => deal.upvotes,
            VoteKind::Bookmark => deal.bookmarks,
        };
        info!(
            "event=deal_vote module=deals status=ok kind={} active={active}",
            kind.as_str()
        );
        Ok(VoteOutcome { active, count })
    }

    /// Records or replaces the user's rating.
    pub fn rate_deal(
        &self,
        id: DealId,
        user_id: UserId,
        rating: i64,
    ) -> Result<RatingSummary, DealServiceError> {
        let value = u8::try_from(rating)
            .ok()
            .filter(|value| (1..=5).contains(value))
            .ok_or_else(|| ValidationError::invalid("rating", "must be between 1 and 5"))?;
        Ok(self.repo.rate(id, user_id, value)?)
    }

    fn moderate(&self, id: DealId, status: DealStatus) -> Result<Deal, DealServiceError> {
        let deal = self.require_deal(id)?;
        if deal.status == status {
            return Err(DealServiceError::StatusUnchanged(status));
        }
        self.repo.set_status(id, status, now_epoch_ms())?;
        info!(
            "event=deal_moderate module=deals status=ok deal_id={id} deal_status={}",
            status.as_str()
        );
        self.require_deal(id)
    }

    fn require_deal(&self, id: DealId) -> Result<Deal, DealServiceError> {
        self.repo
            .get_deal(id)?
            .ok_or(DealServiceError::DealNotFound(id))
    }
}
