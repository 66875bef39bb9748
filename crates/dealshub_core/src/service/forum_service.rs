//! Forum use-cases.
//!
//! # Invariants
//! - Post reactions toggle through the shared reaction rules.
//! - Reporting always stores a non-empty reason.

use crate::model::forum::{report_reason, ForumFilter, ForumPost, ForumPostPatch, NewForumPost};
use crate::model::reaction::{Reaction, ReactionSummary, ReactionTarget};
use crate::model::{now_epoch_ms, PostId, UserId};
use crate::repo::forum_repo::ForumRepository;
use crate::repo::reaction_repo::ReactionRepository;
use crate::repo::{Page, PageRequest};
use crate::service::{ServiceError, ServiceResult};
use log::info;
use uuid::Uuid;

pub struct ForumService<F: ForumRepository, R: ReactionRepository> {
    posts: F,
    reactions: R,
}

impl<F: ForumRepository, R: ReactionRepository> ForumService<F, R> {
    pub fn new(posts: F, reactions: R) -> Self {
        Self { posts, reactions }
    }

    pub fn create_post(&self, input: NewForumPost) -> ServiceResult<ForumPost> {
        let post = ForumPost::from_new(input, Uuid::new_v4(), now_epoch_ms())?;
        self.posts.insert_post(&post)?;
        info!(
            "event=forum_post_create module=forum status=ok post_id={} post_type={}",
            post.id,
            post.post_type.as_str()
        );
        Ok(post)
    }

    pub fn list_posts(
        &self,
        filter: &ForumFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<ForumPost>> {
        Ok(self.posts.list_posts(filter, page)?)
    }

    pub fn get_post(&self, id: PostId) -> ServiceResult<ForumPost> {
        self.posts
            .get_post(id)?
            .ok_or_else(|| ServiceError::not_found("forum post", id))
    }

    /// Loads one post, counting the read as a view.
    pub fn view_post(&self, id: PostId) -> ServiceResult<ForumPost> {
        self.posts.increment_views(id)?;
        self.get_post(id)
    }

    /// Counts one view and returns the new total.
    pub fn record_view(&self, id: PostId) -> ServiceResult<i64> {
        self.posts.increment_views(id)?;
        Ok(self.get_post(id)?.views)
    }

    pub fn update_post(&self, id: PostId, patch: ForumPostPatch) -> ServiceResult<ForumPost> {
        let mut post = self.get_post(id)?;
        patch.apply(&mut post, now_epoch_ms())?;
        self.posts.update_post(&post)?;
        info!("event=forum_post_update module=forum status=ok post_id={id}");
        self.get_post(id)
    }

    pub fn delete_post(&self, id: PostId) -> ServiceResult<()> {
        self.posts.delete_post(id)?;
        info!("event=forum_post_delete module=forum status=ok post_id={id}");
        Ok(())
    }

    /// Toggles a like or dislike on a post.
    pub fn react_to_post(
        &self,
        id: PostId,
        user_id: UserId,
        reaction: Reaction,
    ) -> ServiceResult<ReactionSummary> {
        self.get_post(id)?;
        self.reactions
            .apply_toggle(ReactionTarget::ForumPost, id, user_id, reaction)?;
        info!(
            "event=forum_post_react module=forum status=ok reaction={}",
            reaction.as_str()
        );
        Ok(self.reactions.summary(ReactionTarget::ForumPost, id)?)
    }

    /// Flags a post as reported.
    pub fn report_post(&self, id: PostId, reason: Option<&str>) -> ServiceResult<ForumPost> {
        self.posts
            .report_post(id, &report_reason(reason), now_epoch_ms())?;
        info!("event=forum_post_report module=forum status=ok post_id={id}");
        self.get_post(id)
    }
}
