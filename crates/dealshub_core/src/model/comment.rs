//! Comment threads shared by deals, vendors and forum posts.
//!
//! # Responsibility
//! - Define the flat comment record persisted per thread.
//! - Define the reply-tree shape returned to readers.
//!
//! # Invariants
//! - `parent_id = None` marks a top-level comment.
//! - A comment belongs to exactly one thread (`target` + `target_id`).

use crate::model::reaction::ReactionSummary;
use crate::model::{CommentId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Owner kind of a comment thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentTarget {
    Deal,
    Vendor,
    ForumPost,
}

impl CommentTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deal => "deal",
            Self::Vendor => "vendor",
            Self::ForumPost => "forum_post",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "deal" => Some(Self::Deal),
            "vendor" => Some(Self::Vendor),
            "forum_post" => Some(Self::ForumPost),
            _ => None,
        }
    }

    /// Table holding the thread owner rows.
    pub(crate) fn owner_table(self) -> &'static str {
        match self {
            Self::Deal => "deals",
            Self::Vendor => "vendors",
            Self::ForumPost => "forum_posts",
        }
    }

    /// Avatar used when a commenter supplies none.
    pub fn default_avatar(self) -> &'static str {
        match self {
            Self::Deal => "https://via.placeholder.com/40",
            Self::Vendor => "https://example.com/avatar.png",
            Self::ForumPost => "",
        }
    }
}

/// Public identity attached to posts and comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub user_id: Option<UserId>,
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub reputation: i64,
}

/// Flat comment record as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub target: CommentTarget,
    pub target_id: Uuid,
    pub author: Author,
    #[serde(rename = "comment")]
    pub body: String,
    #[serde(rename = "parentCommentId")]
    pub parent_id: Option<CommentId>,
    #[serde(rename = "date")]
    pub created_at: i64,
    #[serde(flatten)]
    pub reactions: ReactionSummary,
}

/// One comment with its replies, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    /// Number of comments in this subtree, including the root.
    pub fn subtree_len(&self) -> usize {
        1 + self
            .replies
            .iter()
            .map(CommentNode::subtree_len)
            .sum::<usize>()
    }
}

/// Caller input for a new comment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub author_user_id: Option<UserId>,
    pub author_name: String,
    pub author_image: Option<String>,
    pub author_is_verified: bool,
    pub author_reputation: i64,
    pub body: String,
    /// Raw parent reference; `None`, blank or `"0"` means top-level.
    pub parent_id: Option<String>,
}
