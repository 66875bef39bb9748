//! Curated category use-cases.
//!
//! # Invariants
//! - Categories are addressed by their caller-chosen numeric id, which never changes.

use crate::model::curated::{CuratedCategory, CuratedCategoryInput};
use crate::model::now_epoch_ms;
use crate::repo::curated_repo::CuratedCategoryRepository;
use crate::service::{ServiceError, ServiceResult};
use log::info;

pub struct CuratedCategoryService<R: CuratedCategoryRepository> {
    repo: R,
}

impl<R: CuratedCategoryRepository> CuratedCategoryService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a category; a taken id is a conflict.
    pub fn create_category(&self, input: CuratedCategoryInput) -> ServiceResult<CuratedCategory> {
        let category = CuratedCategory::from_input(input, now_epoch_ms())?;
        self.repo.insert_category(&category)?;
        info!(
            "event=curated_create module=curated status=ok category_id={}",
            category.id
        );
        Ok(category)
    }

    pub fn list_categories(&self) -> ServiceResult<Vec<CuratedCategory>> {
        Ok(self.repo.list_categories()?)
    }

    pub fn get_category(&self, id: i64) -> ServiceResult<CuratedCategory> {
        self.repo
            .get_category(id)?
            .ok_or_else(|| ServiceError::not_found("curated category", id))
    }

    pub fn update_category(
        &self,
        id: i64,
        patch: CuratedCategoryInput,
    ) -> ServiceResult<CuratedCategory> {
        let updated = self.get_category(id)?.merged(patch, now_epoch_ms())?;
        self.repo.update_category(&updated)?;
        info!("event=curated_update module=curated status=ok category_id={id}");
        Ok(updated)
    }

    pub fn delete_category(&self, id: i64) -> ServiceResult<()> {
        self.repo.delete_category(id)?;
        info!("event=curated_delete module=curated status=ok category_id={id}");
        Ok(())
    }
}
