//! Vendor subscription plan use-cases.

use crate::model::vendor_plan::{VendorPlan, VendorPlanInput};
use crate::model::{now_epoch_ms, VendorPlanId};
use crate::repo::vendor_plan_repo::VendorPlanRepository;
use crate::service::{ServiceError, ServiceResult};
use log::info;
use uuid::Uuid;

pub struct VendorPlanService<R: VendorPlanRepository> {
    repo: R,
}

impl<R: VendorPlanRepository> VendorPlanService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_plan(&self, input: VendorPlanInput) -> ServiceResult<VendorPlan> {
        let plan = VendorPlan::from_input(input, Uuid::new_v4(), now_epoch_ms())?;
        self.repo.insert_plan(&plan)?;
        info!(
            "event=vendor_plan_create module=vendor_plans status=ok plan_id={} duration={}",
            plan.id,
            plan.duration.as_str()
        );
        Ok(plan)
    }

    pub fn list_plans(&self) -> ServiceResult<Vec<VendorPlan>> {
        Ok(self.repo.list_plans()?)
    }

    pub fn get_plan(&self, id: VendorPlanId) -> ServiceResult<VendorPlan> {
        self.repo
            .get_plan(id)?
            .ok_or_else(|| ServiceError::not_found("vendor plan", id))
    }

    pub fn update_plan(&self, id: VendorPlanId, patch: VendorPlanInput) -> ServiceResult<VendorPlan> {
        let updated = self.get_plan(id)?.merged(patch, now_epoch_ms())?;
        self.repo.update_plan(&updated)?;
        info!("event=vendor_plan_update module=vendor_plans status=ok plan_id={id}");
        Ok(updated)
    }

    pub fn delete_plan(&self, id: VendorPlanId) -> ServiceResult<()> {
        self.repo.delete_plan(id)?;
        info!("event=vendor_plan_delete module=vendor_plans status=ok plan_id={id}");
        Ok(())
    }
}
