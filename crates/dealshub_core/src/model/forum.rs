//! Community forum posts.
//!
//! # Invariants
//! - `title` has at least 5 and `content` at least 20 characters after trim.
//! - Reaction counts are derived from stored reactions, never written directly.

use crate::model::comment::Author;
use crate::model::reaction::ReactionSummary;
use crate::model::{optional_text, require_text, DealId, PostId, UserId, ValidationError};
use serde::{Deserialize, Serialize};

pub const MIN_TITLE_CHARS: usize = 5;
pub const MIN_CONTENT_CHARS: usize = 20;
pub const DEFAULT_REPORT_REASON: &str = "No reason provided";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PostType {
    Question,
    ScamReport,
    General,
    DealDiscussion,
}

impl PostType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::ScamReport => "scam-report",
            Self::General => "general",
            Self::DealDiscussion => "deal-discussion",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "question" => Some(Self::Question),
            "scam-report" => Some(Self::ScamReport),
            "general" => Some(Self::General),
            "deal-discussion" => Some(Self::DealDiscussion),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumPost {
    pub id: PostId,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub post_type: PostType,
    pub author: Author,
    #[serde(flatten)]
    pub reactions: ReactionSummary,
    pub comments_count: u32,
    pub views: i64,
    pub is_pinned: bool,
    pub tags: Vec<String>,
    pub reported_scam_url: Option<String>,
    pub related_deal_id: Option<DealId>,
    pub report_reason: String,
    pub is_reported: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Caller input for a new forum post.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewForumPost {
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub post_type: String,
    pub author_user_id: Option<UserId>,
    pub author_name: String,
    pub author_image: Option<String>,
    pub author_is_verified: bool,
    pub author_reputation: i64,
    pub tags: Vec<String>,
    pub reported_scam_url: Option<String>,
    pub related_deal_id: Option<DealId>,
}

impl ForumPost {
    pub fn from_new(input: NewForumPost, id: PostId, now: i64) -> Result<Self, ValidationError> {
        let title = require_min_chars("title", &input.title, MIN_TITLE_CHARS)?;
        let content = require_min_chars("content", &input.content, MIN_CONTENT_CHARS)?;
        let post_type = PostType::parse(&input.post_type)
            .ok_or_else(|| ValidationError::invalid("type", "unknown post type"))?;
        let author_name = require_text("author.name", &input.author_name)?;

        Ok(Self {
            id,
            title,
            content,
            post_type,
            author: Author {
                user_id: input.author_user_id,
                name: author_name,
                image: optional_text(input.author_image.as_deref()).unwrap_or_default(),
                is_verified: input.author_is_verified,
                reputation: input.author_reputation,
            },
            reactions: ReactionSummary::default(),
            comments_count: 0,
            views: 0,
            is_pinned: false,
            tags: clean_tags(input.tags),
            reported_scam_url: optional_text(input.reported_scam_url.as_deref()),
            related_deal_id: input.related_deal_id,
            report_reason: String::new(),
            is_reported: false,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial post update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForumPostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub post_type: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_pinned: Option<bool>,
    pub reported_scam_url: Option<String>,
    pub related_deal_id: Option<DealId>,
}

impl ForumPostPatch {
    pub fn apply(self, post: &mut ForumPost, now: i64) -> Result<(), ValidationError> {
        if let Some(title) = self.title {
            post.title = require_min_chars("title", &title, MIN_TITLE_CHARS)?;
        }
        if let Some(content) = self.content {
            post.content = require_min_chars("content", &content, MIN_CONTENT_CHARS)?;
        }
        if let Some(post_type) = self.post_type {
            post.post_type = PostType::parse(&post_type)
                .ok_or_else(|| ValidationError::invalid("type", "unknown post type"))?;
        }
        if let Some(tags) = self.tags {
            post.tags = clean_tags(tags);
        }
        if let Some(is_pinned) = self.is_pinned {
            post.is_pinned = is_pinned;
        }
        if let Some(url) = self.reported_scam_url {
            post.reported_scam_url = optional_text(Some(&url));
        }
        if self.related_deal_id.is_some() {
            post.related_deal_id = self.related_deal_id;
        }
        post.updated_at = now;
        Ok(())
    }
}

/// Filters for forum listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForumFilter {
    pub post_type: Option<PostType>,
    /// Matches posts carrying any of these tags.
    pub tags: Vec<String>,
    pub search: Option<String>,
}

/// Report reason, defaulting when the caller gave none.
pub fn report_reason(raw: Option<&str>) -> String {
    optional_text(raw).unwrap_or_else(|| DEFAULT_REPORT_REASON.to_string())
}

fn require_min_chars(
    field: &'static str,
    value: &str,
    min: usize,
) -> Result<String, ValidationError> {
    let trimmed = require_text(field, value)?;
    if trimmed.chars().count() < min {
        return Err(ValidationError::TooShort { field, min });
    }
    Ok(trimmed)
}

fn clean_tags(values: Vec<String>) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in values.into_iter().filter_map(|tag| optional_text(Some(&tag))) {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn sample() -> NewForumPost {
        NewForumPost {
            title: "Is this legit?".into(),
            content: "Saw a suspicious listing for cheap phones today.".into(),
            post_type: "scam-report".into(),
            author_name: "ada".into(),
            tags: vec!["phones".into(), " phones ".into(), "".into()],
            ..NewForumPost::default()
        }
    }

    #[test]
    fn from_new_enforces_minimum_lengths() {
        let mut input = sample();
        input.title = "Hey".into();
        assert_eq!(
            ForumPost::from_new(input, Uuid::new_v4(), 0).unwrap_err(),
            ValidationError::TooShort {
                field: "title",
                min: MIN_TITLE_CHARS
            }
        );

        let mut input = sample();
        input.content = "too short".into();
        assert!(matches!(
            ForumPost::from_new(input, Uuid::new_v4(), 0),
            Err(ValidationError::TooShort { field: "content", .. })
        ));
    }

    #[test]
    fn from_new_parses_type_and_dedupes_tags() {
        let post = ForumPost::from_new(sample(), Uuid::new_v4(), 0).unwrap();
        assert_eq!(post.post_type, PostType::ScamReport);
        assert_eq!(post.tags, vec!["phones".to_string()]);
        assert_eq!(post.author.image, "");
    }

    #[test]
    fn report_reason_defaults_when_blank() {
        assert_eq!(report_reason(None), DEFAULT_REPORT_REASON);
        assert_eq!(report_reason(Some("  ")), DEFAULT_REPORT_REASON);
        assert_eq!(report_reason(Some("spam")), "spam");
    }
}
