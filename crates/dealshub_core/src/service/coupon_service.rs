//! Coupon use-cases.

use crate::model::coupon::{Coupon, CouponInput};
use crate::model::{now_epoch_ms, CouponId};
use crate::repo::coupon_repo::CouponRepository;
use crate::service::{ServiceError, ServiceResult};
use log::info;
use uuid::Uuid;

pub struct CouponService<R: CouponRepository> {
    repo: R,
}

impl<R: CouponRepository> CouponService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a coupon; a duplicate code is a conflict.
    pub fn create_coupon(&self, input: CouponInput) -> ServiceResult<Coupon> {
        let coupon = Coupon::from_input(input, Uuid::new_v4(), now_epoch_ms())?;
        self.repo.insert_coupon(&coupon)?;
        info!(
            "event=coupon_create module=coupons status=ok coupon_id={}",
            coupon.id
        );
        Ok(coupon)
    }

    pub fn list_coupons(&self) -> ServiceResult<Vec<Coupon>> {
        Ok(self.repo.list_coupons()?)
    }

    pub fn get_coupon(&self, id: CouponId) -> ServiceResult<Coupon> {
        self.repo
            .get_coupon(id)?
            .ok_or_else(|| ServiceError::not_found("coupon", id))
    }

    /// Merges a partial update and re-validates the whole coupon.
    pub fn update_coupon(&self, id: CouponId, patch: CouponInput) -> ServiceResult<Coupon> {
        let updated = self.get_coupon(id)?.merged(patch, now_epoch_ms())?;
        self.repo.update_coupon(&updated)?;
        info!("event=coupon_update module=coupons status=ok coupon_id={id}");
        Ok(updated)
    }

    pub fn delete_coupon(&self, id: CouponId) -> ServiceResult<()> {
        self.repo.delete_coupon(id)?;
        info!("event=coupon_delete module=coupons status=ok coupon_id={id}");
        Ok(())
    }
}
