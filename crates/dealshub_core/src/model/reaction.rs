//! Like/dislike reactions.
//!
//! # Invariants
//! - A user holds at most one reaction per target.
//! - `likes`/`dislikes` always equal the size of the matching reactor set.

use crate::model::UserId;
use serde::{Deserialize, Serialize};

/// One user's opinion of a comment or forum post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reaction {
    Like,
    Dislike,
}

impl Reaction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Dislike => "dislike",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "like" => Some(Self::Like),
            "dislike" => Some(Self::Dislike),
            _ => None,
        }
    }
}

/// Kind of record a reaction is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionTarget {
    Comment,
    ForumPost,
}

impl ReactionTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::ForumPost => "forum_post",
        }
    }
}

/// Resolves the next reaction state for a toggle request.
///
/// Repeating the current reaction clears it; requesting the opposite one
/// switches over, so like and dislike are never held together.
pub fn toggle(current: Option<Reaction>, requested: Reaction) -> Option<Reaction> {
    match current {
        Some(existing) if existing == requested => None,
        _ => Some(requested),
    }
}

/// Aggregated reactions for one target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionSummary {
    pub likes: u32,
    pub dislikes: u32,
    #[serde(rename = "hasUserLiked")]
    pub liked_by: Vec<UserId>,
    #[serde(rename = "hasUserDisliked")]
    pub disliked_by: Vec<UserId>,
}

impl ReactionSummary {
    /// Adds one reactor, keeping counts in sync with the reactor sets.
    pub fn record(&mut self, user_id: UserId, reaction: Reaction) {
        match reaction {
            Reaction::Like => {
                self.liked_by.push(user_id);
                self.likes = self.liked_by.len() as u32;
            }
            Reaction::Dislike => {
                self.disliked_by.push(user_id);
                self.dislikes = self.disliked_by.len() as u32;
            }
        }
    }

    /// Returns the reaction currently held by `user_id`.
    pub fn reaction_of(&self, user_id: UserId) -> Option<Reaction> {
        if self.liked_by.contains(&user_id) {
            Some(Reaction::Like)
        } else if self.disliked_by.contains(&user_id) {
            Some(Reaction::Dislike)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{toggle, Reaction, ReactionSummary};
    use uuid::Uuid;

    #[test]
    fn toggle_adds_clears_and_switches() {
        assert_eq!(toggle(None, Reaction::Like), Some(Reaction::Like));
        assert_eq!(toggle(Some(Reaction::Like), Reaction::Like), None);
        assert_eq!(
            toggle(Some(Reaction::Dislike), Reaction::Like),
            Some(Reaction::Like)
        );
        assert_eq!(
            toggle(Some(Reaction::Like), Reaction::Dislike),
            Some(Reaction::Dislike)
        );
    }

    #[test]
    fn summary_counts_follow_reactor_sets() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let mut summary = ReactionSummary::default();
        summary.record(alice, Reaction::Like);
        summary.record(bob, Reaction::Dislike);

        assert_eq!(summary.likes, 1);
        assert_eq!(summary.dislikes, 1);
        assert_eq!(summary.reaction_of(alice), Some(Reaction::Like));
        assert_eq!(summary.reaction_of(bob), Some(Reaction::Dislike));
        assert_eq!(summary.reaction_of(Uuid::new_v4()), None);
    }

    #[test]
    fn summary_serializes_with_reactor_field_names() {
        let json = serde_json::to_value(ReactionSummary::default()).unwrap();
        assert!(json.get("hasUserLiked").is_some());
        assert!(json.get("hasUserDisliked").is_some());
    }
}
