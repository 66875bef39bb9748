//! Group deal use-cases.
//!
//! # Responsibility
//! - Validate group deal creation against existing users and vendors.
//! - Drive the slot lifecycle: available, reserved, paid.
//!
//! # Invariants
//! - A user holds at most one slot per deal.
//! - A deal completes exactly when every slot is paid.
//! - Deals with paid slots cannot be deleted.

use crate::model::group_deal::{
    GroupDeal, GroupDealFilter, GroupDealStatus, NewGroupDeal, SlotError,
};
use crate::model::{now_epoch_ms, GroupDealId, UserId, ValidationError, VendorId};
use crate::repo::group_deal_repo::{GroupDealRepoError, GroupDealRepository};
use crate::repo::user_repo::UserRepository;
use crate::repo::vendor_repo::VendorRepository;
use crate::repo::{Page, PageRequest, RepoError};
use log::info;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Service error for group deal use-cases.
#[derive(Debug)]
pub enum GroupDealServiceError {
    Validation(ValidationError),
    UserNotFound(UserId),
    VendorNotFound(VendorId),
    GroupDealNotFound(GroupDealId),
    /// Slot transition rejected by lifecycle rules.
    Slot(SlotError),
    Repo(GroupDealRepoError),
    Lookup(RepoError),
}

impl Display for GroupDealServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::VendorNotFound(id) => write!(f, "vendor not found: {id}"),
            Self::GroupDealNotFound(id) => write!(f, "group deal not found: {id}"),
            Self::Slot(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Lookup(err) => write!(f, "{err}"),
        }
    }
}

impl Error for GroupDealServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Slot(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Lookup(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for GroupDealServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for GroupDealServiceError {
    fn from(value: RepoError) -> Self {
        Self::Lookup(value)
    }
}

impl From<GroupDealRepoError> for GroupDealServiceError {
    fn from(value: GroupDealRepoError) -> Self {
        match value {
            GroupDealRepoError::NotFound(id) => Self::GroupDealNotFound(id),
            GroupDealRepoError::Slot(err) => Self::Slot(err),
            other => Self::Repo(other),
        }
    }
}

/// Result of a successful slot reservation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub position: u32,
    pub available_slots: usize,
    pub group_deal: GroupDeal,
}

pub struct GroupDealService<G, U, V>
where
    G: GroupDealRepository,
    U: UserRepository,
    V: VendorRepository,
{
    deals: G,
    users: U,
    vendors: V,
}

impl<G, U, V> GroupDealService<G, U, V>
where
    G: GroupDealRepository,
    U: UserRepository,
    V: VendorRepository,
{
    pub fn new(deals: G, users: U, vendors: V) -> Self {
        Self {
            deals,
            users,
            vendors,
        }
    }

    /// Creates a deal with all slots available for an existing user and vendor.
    pub fn create_group_deal(
        &self,
        input: NewGroupDeal,
    ) -> Result<GroupDeal, GroupDealServiceError> {
        let user_id = input.user_id.ok_or(ValidationError::Required("userId"))?;
        let vendor_id = input.vendor_id.ok_or(ValidationError::Required("vendorId"))?;
        self.ensure_user(user_id)?;
        let vendor = self
            .vendors
            .get_vendor(vendor_id)?
            .ok_or(GroupDealServiceError::VendorNotFound(vendor_id))?;

        let deal = GroupDeal::from_new(input, Uuid::new_v4(), &vendor.name, now_epoch_ms())?;
        self.deals.create(&deal)?;
        info!(
            "event=group_deal_create module=group_deals status=ok group_deal_id={} slots={}",
            deal.id, deal.total_slots
        );
        Ok(deal)
    }

    pub fn list_group_deals(
        &self,
        filter: &GroupDealFilter,
        page: PageRequest,
    ) -> Result<Page<GroupDeal>, GroupDealServiceError> {
        Ok(self.deals.list(filter, page)?)
    }

    pub fn get_group_deal(&self, id: GroupDealId) -> Result<GroupDeal, GroupDealServiceError> {
        self.deals
            .get(id)?
            .ok_or(GroupDealServiceError::GroupDealNotFound(id))
    }

    pub fn active_group_deals(&self) -> Result<Vec<GroupDeal>, GroupDealServiceError> {
        Ok(self.deals.list_active(now_epoch_ms())?)
    }

    pub fn vendor_group_deals(
        &self,
        vendor_id: VendorId,
    ) -> Result<Vec<GroupDeal>, GroupDealServiceError> {
        Ok(self.deals.list_by_vendor(vendor_id)?)
    }

    /// Reserves the lowest open slot for `user_id`.
    pub fn reserve_slot(
        &self,
        id: GroupDealId,
        user_id: UserId,
    ) -> Result<Reservation, GroupDealServiceError> {
        self.ensure_user(user_id)?;
        let deal = self.deals.reserve(id, user_id, now_epoch_ms())?;
        let position = deal
            .slot_of(user_id)
            .map(|slot| slot.position)
            .ok_or(GroupDealServiceError::Slot(SlotError::NoReservedSlot(user_id)))?;
        info!(
            "event=group_deal_reserve module=group_deals status=ok group_deal_id={id} position={position}"
        );
        Ok(Reservation {
            position,
            available_slots: deal.available_slots(),
            group_deal: deal,
        })
    }

    /// Marks the user's reserved slot as paid and returns the resulting deal status.
    pub fn confirm_payment(
        &self,
        id: GroupDealId,
        user_id: UserId,
    ) -> Result<GroupDealStatus, GroupDealServiceError> {
        let deal = self.deals.confirm_payment(id, user_id, now_epoch_ms())?;
        info!(
            "event=group_deal_payment module=group_deals status=ok group_deal_id={id} deal_status={}",
            deal.status.as_str()
        );
        Ok(deal.status)
    }

    pub fn delete_group_deal(&self, id: GroupDealId) -> Result<(), GroupDealServiceError> {
        self.deals.delete(id)?;
        info!("event=group_deal_delete module=group_deals status=ok group_deal_id={id}");
        Ok(())
    }

    /// Expires active deals whose deadline passed.
    pub fn expire_overdue(&self, now: i64) -> Result<usize, GroupDealServiceError> {
        let expired = self.deals.expire_overdue(now)?;
        if expired > 0 {
            info!("event=group_deal_expire module=group_deals status=ok count={expired}");
        }
        Ok(expired)
    }

    fn ensure_user(&self, user_id: UserId) -> Result<(), GroupDealServiceError> {
        match self.users.get_user(user_id)? {
            Some(_) => Ok(()),
            None => Err(GroupDealServiceError::UserNotFound(user_id)),
        }
    }
}
