//! `/api/heroes` handlers for homepage banners. Responses use the
//! `{success, data}` envelope.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
};
use dealshub_core::model::hero::HeroInput;
use dealshub_core::repo::hero_repo::SqliteHeroRepository;
use dealshub_core::service::hero_service::HeroService;
use rusqlite::Connection;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/create", post(create_hero))
        .route("/get", get(list_heroes))
        .route("/update/{id}", put(update_hero))
        .route("/delete/{id}", delete(delete_hero))
        .route("/{id}", get(get_hero))
}

fn hero_service(conn: &Connection) -> HeroService<SqliteHeroRepository<'_>> {
    HeroService::new(SqliteHeroRepository::new(conn))
}

fn envelope(data: impl serde::Serialize) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

async fn create_hero(
    State(state): State<SharedState>,
    ApiJson(input): ApiJson<HeroInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let hero = state
        .with_db(move |conn| Ok(hero_service(conn).create_hero(input)?))
        .await?;
    Ok((StatusCode::CREATED, envelope(hero)))
}

async fn list_heroes(State(state): State<SharedState>) -> ApiResult<Json<Value>> {
    let heroes = state
        .with_db(|conn| Ok(hero_service(conn).list_heroes()?))
        .await?;
    Ok(envelope(heroes))
}

async fn get_hero(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    let hero = state
        .with_db(move |conn| Ok(hero_service(conn).get_hero(id)?))
        .await?;
    Ok(envelope(hero))
}

async fn update_hero(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<HeroInput>,
) -> ApiResult<Json<Value>> {
    let hero = state
        .with_db(move |conn| Ok(hero_service(conn).update_hero(id, patch)?))
        .await?;
    Ok(envelope(hero))
}

async fn delete_hero(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    state
        .with_db(move |conn| Ok(hero_service(conn).delete_hero(id)?))
        .await?;
    Ok(Json(json!({ "success": true, "message": "Hero deleted successfully" })))
}
