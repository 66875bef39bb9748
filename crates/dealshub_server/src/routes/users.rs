//! User account handlers mounted directly under `/api`.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, patch, put},
};
use dealshub_core::model::user::{ProfileUpdate, User};
use dealshub_core::repo::user_repo::SqliteUserRepository;
use dealshub_core::service::user_service::UserService;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/users", get(list_users))
        .route("/api/users/{id}", get(get_user).put(update_profile))
        .route("/api/users/{id}/preferences", get(get_preferences).post(set_preferences))
        .route("/api/users/{id}/status", patch(set_status))
        .route("/api/decrement-deals/{id}", put(decrement_deals))
        .route("/api/increment-deals-posted/{id}", put(increment_deals_posted))
        .route("/api/update-user-type/{id}", put(upgrade_to_vendor))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PreferencesRequest {
    pub preferences: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpgradeRequest {
    pub brand: String,
    pub plan: Option<String>,
}

async fn run<T, F>(state: &SharedState, work: F) -> ApiResult<T>
where
    F: FnOnce(UserService<SqliteUserRepository<'_>>) -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    state
        .with_db(move |conn| work(UserService::new(SqliteUserRepository::new(conn))))
        .await
}

async fn list_users(State(state): State<SharedState>) -> ApiResult<Json<Value>> {
    let users = run(&state, |service| Ok(service.list_users()?)).await?;
    if users.is_empty() {
        return Err(ApiError::NotFound("No users found".to_string()));
    }
    Ok(Json(json!({
        "message": "Users fetched successfully",
        "count": users.len(),
        "users": users,
    })))
}

async fn get_user(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<User>> {
    let user = run(&state, move |service| Ok(service.get_user(id)?)).await?;
    Ok(Json(user))
}

async fn update_profile(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> ApiResult<Json<Value>> {
    let user = run(&state, move |service| Ok(service.update_profile(id, update)?)).await?;
    Ok(Json(json!({ "message": "Profile updated successfully", "user": user })))
}

async fn get_preferences(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    let preferences = run(&state, move |service| Ok(service.preferences(id)?)).await?;
    Ok(Json(json!({ "preferences": preferences })))
}

async fn set_preferences(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<PreferencesRequest>,
) -> ApiResult<Json<Value>> {
    let user = run(&state, move |service| {
        Ok(service.set_preferences(id, request.preferences)?)
    })
    .await?;
    Ok(Json(json!({
        "message": "Preferences saved successfully",
        "preferences": user.preferences,
    })))
}

async fn set_status(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<StatusRequest>,
) -> ApiResult<Json<Value>> {
    let user = run(&state, move |service| Ok(service.set_status(id, &request.status)?)).await?;
    Ok(Json(json!({ "message": "User status updated", "user": user })))
}

async fn decrement_deals(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    let user = run(&state, move |service| Ok(service.decrement_deals_count(id)?)).await?;
    Ok(Json(json!({ "message": "Deals count updated", "dealsCount": user.deals_count })))
}

async fn increment_deals_posted(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    let user = run(&state, move |service| Ok(service.increment_deals_posted(id)?)).await?;
    Ok(Json(json!({ "message": "Deals posted updated", "dealsPosted": user.deals_posted })))
}

async fn upgrade_to_vendor(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpgradeRequest>,
) -> ApiResult<Json<Value>> {
    let user = run(&state, move |service| {
        Ok(service.upgrade_to_vendor(id, &request.brand, request.plan.as_deref())?)
    })
    .await?;
    Ok(Json(json!({ "message": "User upgraded to vendor", "user": user })))
}
