//! `/api/orders` handlers. Responses use the `{success, data}` envelope.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
};
use dealshub_core::model::order::{NewOrder, OrderPatch};
use dealshub_core::repo::order_repo::SqliteOrderRepository;
use dealshub_core::repo::user_repo::SqliteUserRepository;
use dealshub_core::service::order_service::OrderService;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/create", post(create_order))
        .route("/get", get(list_orders))
        .route("/getbyid/{id}", get(get_order))
        .route("/update/{id}", put(update_order))
        .route("/delete/{id}", delete(delete_order))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderListQuery {
    pub user_id: Option<Uuid>,
}

fn order_service(
    conn: &Connection,
) -> OrderService<SqliteOrderRepository<'_>, SqliteUserRepository<'_>> {
    OrderService::new(SqliteOrderRepository::new(conn), SqliteUserRepository::new(conn))
}

fn envelope(data: impl serde::Serialize) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

async fn create_order(
    State(state): State<SharedState>,
    ApiJson(input): ApiJson<NewOrder>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let order = state
        .with_db(move |conn| Ok(order_service(conn).create_order(input)?))
        .await?;
    Ok((StatusCode::CREATED, envelope(order)))
}

async fn list_orders(
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<OrderListQuery>,
) -> ApiResult<Json<Value>> {
    let orders = state
        .with_db(move |conn| Ok(order_service(conn).list_orders(query.user_id)?))
        .await?;
    Ok(envelope(orders))
}

async fn get_order(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    let order = state
        .with_db(move |conn| Ok(order_service(conn).get_order(id)?))
        .await?;
    Ok(envelope(order))
}

async fn update_order(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<OrderPatch>,
) -> ApiResult<Json<Value>> {
    let order = state
        .with_db(move |conn| Ok(order_service(conn).update_order(id, patch)?))
        .await?;
    Ok(envelope(order))
}

async fn delete_order(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    state
        .with_db(move |conn| Ok(order_service(conn).delete_order(id)?))
        .await?;
    Ok(Json(json!({ "success": true, "message": "Order deleted" })))
}
