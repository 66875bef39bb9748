//! Homepage hero banner use-cases.

use crate::model::hero::{Hero, HeroInput};
use crate::model::{now_epoch_ms, HeroId};
use crate::repo::hero_repo::HeroRepository;
use crate::service::{ServiceError, ServiceResult};
use log::info;
use uuid::Uuid;

pub struct HeroService<R: HeroRepository> {
    repo: R,
}

impl<R: HeroRepository> HeroService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_hero(&self, input: HeroInput) -> ServiceResult<Hero> {
        let hero = Hero::from_input(input, Uuid::new_v4(), now_epoch_ms())?;
        self.repo.insert_hero(&hero)?;
        info!("event=hero_create module=heroes status=ok hero_id={}", hero.id);
        Ok(hero)
    }

    pub fn list_heroes(&self) -> ServiceResult<Vec<Hero>> {
        Ok(self.repo.list_heroes()?)
    }

    pub fn get_hero(&self, id: HeroId) -> ServiceResult<Hero> {
        self.repo
            .get_hero(id)?
            .ok_or_else(|| ServiceError::not_found("hero", id))
    }

    pub fn update_hero(&self, id: HeroId, patch: HeroInput) -> ServiceResult<Hero> {
        let updated = self.get_hero(id)?.merged(patch, now_epoch_ms())?;
        self.repo.update_hero(&updated)?;
        info!("event=hero_update module=heroes status=ok hero_id={id}");
        Ok(updated)
    }

    pub fn delete_hero(&self, id: HeroId) -> ServiceResult<()> {
        self.repo.delete_hero(id)?;
        info!("event=hero_delete module=heroes status=ok hero_id={id}");
        Ok(())
    }
}
