//! `/api/curated-categories` handlers. Categories are addressed by numeric id.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
};
use dealshub_core::model::curated::CuratedCategoryInput;
use dealshub_core::repo::curated_repo::SqliteCuratedCategoryRepository;
use dealshub_core::service::curated_service::CuratedCategoryService;
use rusqlite::Connection;
use serde_json::{Value, json};

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/create", post(create_category))
        .route("/get", get(list_categories))
        .route("/update/{id}", put(update_category))
        .route("/delete/{id}", delete(delete_category))
        .route("/{id}", get(get_category))
}

fn curated_service(
    conn: &Connection,
) -> CuratedCategoryService<SqliteCuratedCategoryRepository<'_>> {
    CuratedCategoryService::new(SqliteCuratedCategoryRepository::new(conn))
}

async fn create_category(
    State(state): State<SharedState>,
    ApiJson(input): ApiJson<CuratedCategoryInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let category = state
        .with_db(move |conn| Ok(curated_service(conn).create_category(input)?))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "category": category })),
    ))
}

async fn list_categories(State(state): State<SharedState>) -> ApiResult<Json<Value>> {
    let categories = state
        .with_db(|conn| Ok(curated_service(conn).list_categories()?))
        .await?;
    Ok(Json(json!({ "success": true, "categories": categories })))
}

async fn get_category(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Value>> {
    let category = state
        .with_db(move |conn| Ok(curated_service(conn).get_category(id)?))
        .await?;
    Ok(Json(json!({ "success": true, "category": category })))
}

async fn update_category(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<CuratedCategoryInput>,
) -> ApiResult<Json<Value>> {
    let category = state
        .with_db(move |conn| Ok(curated_service(conn).update_category(id, patch)?))
        .await?;
    Ok(Json(json!({ "success": true, "category": category })))
}

async fn delete_category(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Value>> {
    state
        .with_db(move |conn| Ok(curated_service(conn).delete_category(id)?))
        .await?;
    Ok(Json(
        json!({ "success": true, "message": "Category deleted successfully" }),
    ))
}
