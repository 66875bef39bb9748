//! Vendor use-cases.
//!
//! # Invariants
//! - Vendor listings report the live number of deals posted by the vendor's
//!   owner, not the stored counter.
//! - Name lookup is case-insensitive and exact.

use crate::model::deal::Deal;
use crate::model::vendor::{NewVendor, Vendor, VendorFilter, VendorPatch};
use crate::model::{now_epoch_ms, require_text, VendorId};
use crate::repo::deal_repo::DealRepository;
use crate::repo::vendor_repo::VendorRepository;
use crate::repo::{Page, PageRequest};
use crate::service::{ServiceError, ServiceResult};
use log::info;
use serde::Serialize;
use uuid::Uuid;

/// Vendor profile together with the deals its owner posted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorWithDeals {
    pub vendor: Vendor,
    pub deals: Vec<Deal>,
}

pub struct VendorService<V: VendorRepository, D: DealRepository> {
    vendors: V,
    deals: D,
}

impl<V: VendorRepository, D: DealRepository> VendorService<V, D> {
    pub fn new(vendors: V, deals: D) -> Self {
        Self { vendors, deals }
    }

    pub fn create_vendor(&self, input: NewVendor) -> ServiceResult<Vendor> {
        let vendor = Vendor::from_new(input, Uuid::new_v4(), now_epoch_ms())?;
        self.vendors.insert_vendor(&vendor)?;
        info!(
            "event=vendor_create module=vendors status=ok vendor_id={}",
            vendor.id
        );
        Ok(vendor)
    }

    /// Lists vendors, replacing `total_deals` with the live deal count.
    pub fn list_vendors(
        &self,
        filter: &VendorFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<Vendor>> {
        let page = self.vendors.list_vendors(filter, page)?;
        let mut items = Vec::with_capacity(page.items.len());
        for mut vendor in page.items {
            let live = self.deals.count_by_creator(vendor.posted_by)?;
            vendor.total_deals = u32::try_from(live).unwrap_or(u32::MAX);
            items.push(vendor);
        }
        Ok(Page { items, ..page })
    }

    pub fn get_vendor(&self, id: VendorId) -> ServiceResult<Vendor> {
        self.vendors
            .get_vendor(id)?
            .ok_or_else(|| ServiceError::not_found("vendor", id))
    }

    pub fn vendor_by_name(&self, name: &str) -> ServiceResult<VendorWithDeals> {
        let name = require_text("name", name)?;
        let vendor = self
            .vendors
            .find_by_name(&name)?
            .ok_or_else(|| ServiceError::not_found("vendor", &name))?;
        let deals = self.deals.list_by_creator(vendor.posted_by)?;
        Ok(VendorWithDeals { vendor, deals })
    }

    /// Number of deals created by the vendor's owner.
    pub fn vendor_deal_count(&self, id: VendorId) -> ServiceResult<u64> {
        let vendor = self.get_vendor(id)?;
        Ok(self.deals.count_by_creator(vendor.posted_by)?)
    }

    pub fn update_vendor(&self, id: VendorId, patch: VendorPatch) -> ServiceResult<Vendor> {
        let mut vendor = self.get_vendor(id)?;
        patch.apply(&mut vendor, now_epoch_ms())?;
        self.vendors.update_vendor(&vendor)?;
        info!("event=vendor_update module=vendors status=ok vendor_id={id}");
        Ok(vendor)
    }

    pub fn delete_vendor(&self, id: VendorId) -> ServiceResult<()> {
        self.vendors.delete_vendor(id)?;
        info!("event=vendor_delete module=vendors status=ok vendor_id={id}");
        Ok(())
    }
}
