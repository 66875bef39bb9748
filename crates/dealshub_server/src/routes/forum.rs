//! `/api/forum` handlers.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, patch, post, put},
};
use dealshub_core::model::comment::{CommentNode, CommentTarget};
use dealshub_core::model::forum::{ForumFilter, ForumPost, ForumPostPatch, NewForumPost, PostType};
use dealshub_core::model::reaction::Reaction;
use dealshub_core::repo::forum_repo::SqliteForumRepository;
use dealshub_core::repo::reaction_repo::SqliteReactionRepository;
use dealshub_core::service::forum_service::ForumService;
use dealshub_core::PageRequest;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use super::comments::{self, AuthorInput, CommentRequest, UserRef};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::forms::parse_list;
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/create", post(create_post))
        .route("/get", get(list_posts))
        .route("/get-by-id/{id}", get(get_post))
        .route("/update/{id}", put(update_post))
        .route("/delete/{id}", delete(delete_post))
        .route("/{id}/like", post(like_post))
        .route("/{id}/dislike", post(dislike_post))
        .route("/{id}/report", post(report_post))
        .route("/{id}/view", patch(record_view))
        .route("/{id}/comments", post(add_comment).get(get_comments))
        .route("/{id}/comments/{comment_id}/like", post(like_comment))
        .route("/{id}/comments/{comment_id}/dislike", post(dislike_comment))
}

fn forum_service(
    conn: &Connection,
) -> ForumService<SqliteForumRepository<'_>, SqliteReactionRepository<'_>> {
    ForumService::new(SqliteForumRepository::new(conn), SqliteReactionRepository::new(conn))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostRequest {
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub post_type: String,
    pub author: AuthorInput,
    pub tags: Vec<String>,
    pub reported_scam_url: Option<String>,
    pub related_deal_id: Option<Uuid>,
}

impl From<PostRequest> for NewForumPost {
    fn from(request: PostRequest) -> Self {
        Self {
            title: request.title,
            content: request.content,
            post_type: request.post_type,
            author_user_id: request.author.user_id,
            author_name: request.author.name,
            author_image: request.author.image,
            author_is_verified: request.author.is_verified,
            author_reputation: request.author.reputation,
            tags: request.tags,
            reported_scam_url: request.reported_scam_url,
            related_deal_id: request.related_deal_id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ForumListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub post_type: Option<String>,
    /// Comma-separated tags; a post matches when it carries any of them.
    pub tags: Option<String>,
}

impl ForumListQuery {
    fn filter(&self) -> ApiResult<ForumFilter> {
        let post_type = match self
            .post_type
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty() && *value != "all")
        {
            None => None,
            Some(raw) => Some(
                PostType::parse(raw)
                    .ok_or_else(|| ApiError::BadRequest(format!("unknown post type: {raw}")))?,
            ),
        };
        Ok(ForumFilter {
            post_type,
            tags: self.tags.as_deref().map(parse_list).unwrap_or_default(),
            search: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReportRequest {
    pub reason: Option<String>,
}

async fn create_post(
    State(state): State<SharedState>,
    ApiJson(request): ApiJson<PostRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let input = NewForumPost::from(request);
    let post = state
        .with_db(move |conn| Ok(forum_service(conn).create_post(input)?))
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": post }))))
}

async fn list_posts(
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<ForumListQuery>,
) -> ApiResult<Json<Value>> {
    let filter = query.filter()?;
    let page = PageRequest::new(query.page, query.limit);
    let posts = state
        .with_db(move |conn| Ok(forum_service(conn).list_posts(&filter, page)?))
        .await?;
    Ok(Json(json!({
        "data": posts.items,
        "total": posts.total,
        "page": posts.page,
        "pages": posts.pages,
    })))
}

async fn get_post(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ForumPost>> {
    let post = state
        .with_db(move |conn| Ok(forum_service(conn).view_post(id)?))
        .await?;
    Ok(Json(post))
}

async fn update_post(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<ForumPostPatch>,
) -> ApiResult<Json<Value>> {
    let post = state
        .with_db(move |conn| Ok(forum_service(conn).update_post(id, patch)?))
        .await?;
    Ok(Json(json!({ "data": post })))
}

async fn delete_post(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    state
        .with_db(move |conn| Ok(forum_service(conn).delete_post(id)?))
        .await?;
    Ok(Json(json!({ "message": "Post deleted" })))
}

async fn react(
    state: &SharedState,
    id: Uuid,
    user: UserRef,
    reaction: Reaction,
) -> ApiResult<Json<ForumPost>> {
    let user_id = user.require()?;
    let post = state
        .with_db(move |conn| {
            let service = forum_service(conn);
            service.react_to_post(id, user_id, reaction)?;
            Ok(service.get_post(id)?)
        })
        .await?;
    Ok(Json(post))
}

async fn like_post(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(user): ApiJson<UserRef>,
) -> ApiResult<Json<ForumPost>> {
    react(&state, id, user, Reaction::Like).await
}

async fn dislike_post(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(user): ApiJson<UserRef>,
) -> ApiResult<Json<ForumPost>> {
    react(&state, id, user, Reaction::Dislike).await
}

async fn report_post(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<ReportRequest>,
) -> ApiResult<Json<Value>> {
    let post = state
        .with_db(move |conn| Ok(forum_service(conn).report_post(id, request.reason.as_deref())?))
        .await?;
    Ok(Json(json!({ "message": "Post reported", "reportReason": post.report_reason })))
}

async fn record_view(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    let views = state
        .with_db(move |conn| Ok(forum_service(conn).record_view(id)?))
        .await?;
    Ok(Json(json!({ "views": views })))
}

async fn add_comment(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<CommentRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    comments::add(&state, CommentTarget::ForumPost, id, request).await
}

async fn get_comments(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<CommentNode>>> {
    comments::tree(&state, CommentTarget::ForumPost, id).await
}

async fn like_comment(
    State(state): State<SharedState>,
    ApiPath((id, comment_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(user): ApiJson<UserRef>,
) -> ApiResult<Json<Value>> {
    comments::react(&state, CommentTarget::ForumPost, id, comment_id, user, Reaction::Like).await
}

async fn dislike_comment(
    State(state): State<SharedState>,
    ApiPath((id, comment_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(user): ApiJson<UserRef>,
) -> ApiResult<Json<Value>> {
    comments::react(&state, CommentTarget::ForumPost, id, comment_id, user, Reaction::Dislike)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_parses_type_and_tags() {
        let query = ForumListQuery {
            post_type: Some("deal-discussion".into()),
            tags: Some("phones, lagos".into()),
            search: Some("  ".into()),
            ..ForumListQuery::default()
        };
        let filter = query.filter().unwrap();
        assert_eq!(filter.post_type, Some(PostType::DealDiscussion));
        assert_eq!(filter.tags, vec!["phones", "lagos"]);
        assert_eq!(filter.search, None);
    }

    #[test]
    fn list_query_treats_all_as_no_type_filter() {
        let query = ForumListQuery {
            post_type: Some("all".into()),
            ..ForumListQuery::default()
        };
        assert_eq!(query.filter().unwrap().post_type, None);

        let query = ForumListQuery {
            post_type: Some("rant".into()),
            ..ForumListQuery::default()
        };
        assert!(query.filter().is_err());
    }

    #[test]
    fn post_request_carries_author_fields() {
        let request: PostRequest = serde_json::from_value(json!({
            "title": "Is this seller legit?",
            "content": "Ordered last week and no tracking yet.",
            "type": "scam-report",
            "author": { "_id": Uuid::nil(), "name": "Ada", "isVerified": true },
            "tags": ["scam"]
        }))
        .unwrap();
        let input = NewForumPost::from(request);
        assert_eq!(input.post_type, "scam-report");
        assert_eq!(input.author_user_id, Some(Uuid::nil()));
        assert_eq!(input.author_name, "Ada");
        assert!(input.author_is_verified);
    }
}
