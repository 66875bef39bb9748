//! `/api/vendor-plans` handlers. Lists are bare arrays; writes echo the plan
//! under `vendorPlan` with a message.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
};
use dealshub_core::model::vendor_plan::{VendorPlan, VendorPlanInput};
use dealshub_core::repo::vendor_plan_repo::SqliteVendorPlanRepository;
use dealshub_core::service::vendor_plan_service::VendorPlanService;
use rusqlite::Connection;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/create", post(create_plan))
        .route("/get", get(list_plans))
        .route("/get/{id}", get(get_plan))
        .route("/update/{id}", put(update_plan))
        .route("/delete/{id}", delete(delete_plan))
}

fn plan_service(conn: &Connection) -> VendorPlanService<SqliteVendorPlanRepository<'_>> {
    VendorPlanService::new(SqliteVendorPlanRepository::new(conn))
}

async fn create_plan(
    State(state): State<SharedState>,
    ApiJson(input): ApiJson<VendorPlanInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let plan = state
        .with_db(move |conn| Ok(plan_service(conn).create_plan(input)?))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Vendor plan created successfully", "vendorPlan": plan })),
    ))
}

async fn list_plans(State(state): State<SharedState>) -> ApiResult<Json<Vec<VendorPlan>>> {
    let plans = state
        .with_db(|conn| Ok(plan_service(conn).list_plans()?))
        .await?;
    Ok(Json(plans))
}

async fn get_plan(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<VendorPlan>> {
    let plan = state
        .with_db(move |conn| Ok(plan_service(conn).get_plan(id)?))
        .await?;
    Ok(Json(plan))
}

async fn update_plan(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<VendorPlanInput>,
) -> ApiResult<Json<Value>> {
    let plan = state
        .with_db(move |conn| Ok(plan_service(conn).update_plan(id, patch)?))
        .await?;
    Ok(Json(
        json!({ "message": "Vendor plan updated successfully", "vendorPlan": plan }),
    ))
}

async fn delete_plan(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    state
        .with_db(move |conn| Ok(plan_service(conn).delete_plan(id)?))
        .await?;
    Ok(Json(json!({ "message": "Vendor plan deleted successfully" })))
}
