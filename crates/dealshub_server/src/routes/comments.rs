//! Comment thread handlers shared by deals, vendors and forum posts.

use axum::{Json, http::StatusCode};
use dealshub_core::CommentService;
use dealshub_core::model::comment::{CommentNode, CommentTarget, NewComment};
use dealshub_core::model::reaction::Reaction;
use dealshub_core::repo::comment_repo::SqliteCommentRepository;
use dealshub_core::repo::reaction_repo::SqliteReactionRepository;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthorInput {
    #[serde(alias = "_id", alias = "id")]
    pub user_id: Option<Uuid>,
    pub name: String,
    pub image: Option<String>,
    pub is_verified: bool,
    pub reputation: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommentRequest {
    pub author: AuthorInput,
    #[serde(alias = "content")]
    pub comment: String,
    /// String id, `"0"`, `0` or null.
    pub parent_comment_id: Option<Value>,
}

impl CommentRequest {
    fn into_new_comment(self) -> NewComment {
        let parent_id = match self.parent_comment_id {
            Some(Value::String(raw)) => Some(raw),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
        NewComment {
            author_user_id: self.author.user_id,
            author_name: self.author.name,
            author_image: self.author.image,
            author_is_verified: self.author.is_verified,
            author_reputation: self.author.reputation,
            body: self.comment,
            parent_id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserRef {
    pub user_id: Option<Uuid>,
}

impl UserRef {
    pub fn require(&self) -> ApiResult<Uuid> {
        self.user_id
            .ok_or_else(|| ApiError::BadRequest("userId is required".to_string()))
    }
}

pub async fn add(
    state: &SharedState,
    target: CommentTarget,
    target_id: Uuid,
    request: CommentRequest,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let input = request.into_new_comment();
    let comment = state
        .with_db(move |conn| {
            let service = CommentService::new(
                SqliteCommentRepository::new(conn),
                SqliteReactionRepository::new(conn),
            );
            Ok(service.add_comment(target, target_id, input)?)
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Comment added successfully.", "comment": comment })),
    ))
}

pub async fn tree(
    state: &SharedState,
    target: CommentTarget,
    target_id: Uuid,
) -> ApiResult<Json<Vec<CommentNode>>> {
    let nodes = state
        .with_db(move |conn| {
            let service = CommentService::new(
                SqliteCommentRepository::new(conn),
                SqliteReactionRepository::new(conn),
            );
            Ok(service.comment_tree(target, target_id)?)
        })
        .await?;
    Ok(Json(nodes))
}

pub async fn react(
    state: &SharedState,
    target: CommentTarget,
    target_id: Uuid,
    comment_id: Uuid,
    user: UserRef,
    reaction: Reaction,
) -> ApiResult<Json<Value>> {
    let user_id = user.require()?;
    let summary = state
        .with_db(move |conn| {
            let service = CommentService::new(
                SqliteCommentRepository::new(conn),
                SqliteReactionRepository::new(conn),
            );
            Ok(service.react_to_comment(target, target_id, comment_id, user_id, reaction)?)
        })
        .await?;
    let message = match reaction {
        Reaction::Like => "Comment like updated",
        Reaction::Dislike => "Comment dislike updated",
    };
    Ok(Json(json!({
        "message": message,
        "likes": summary.likes,
        "dislikes": summary.dislikes,
        "hasUserLiked": summary.liked_by,
        "hasUserDisliked": summary.disliked_by,
    })))
}
