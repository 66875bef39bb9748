//! `/api/coupons` handlers. Responses use the `{success, data}` envelope.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
};
use dealshub_core::model::coupon::CouponInput;
use dealshub_core::repo::coupon_repo::SqliteCouponRepository;
use dealshub_core::service::coupon_service::CouponService;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::forms::parse_timestamp;
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/create", post(create_coupon))
        .route("/get", get(list_coupons))
        .route("/update/{id}", put(update_coupon))
        .route("/delete/{id}", delete(delete_coupon))
        .route("/{id}", get(get_coupon))
}

/// Coupon body; `expiresAt` may be epoch milliseconds or a date string.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CouponRequest {
    pub background_color: Option<String>,
    pub is_popular: Option<bool>,
    pub discount: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub vendor: Option<String>,
    pub expires_at: Option<Value>,
    pub code: Option<String>,
}

impl CouponRequest {
    fn into_input(self) -> ApiResult<CouponInput> {
        let invalid_date = || ApiError::BadRequest("expiresAt must be a date".to_string());
        let expires_at = match self.expires_at {
            None | Some(Value::Null) => None,
            Some(Value::Number(number)) => Some(number.as_i64().ok_or_else(invalid_date)?),
            Some(Value::String(raw)) => Some(parse_timestamp(&raw).ok_or_else(invalid_date)?),
            Some(_) => return Err(invalid_date()),
        };
        Ok(CouponInput {
            background_color: self.background_color,
            is_popular: self.is_popular,
            discount: self.discount,
            title: self.title,
            description: self.description,
            vendor: self.vendor,
            expires_at,
            code: self.code,
        })
    }
}

fn envelope(data: impl serde::Serialize) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

async fn create_coupon(
    State(state): State<SharedState>,
    ApiJson(request): ApiJson<CouponRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let input = request.into_input()?;
    let coupon = state
        .with_db(move |conn| {
            Ok(CouponService::new(SqliteCouponRepository::new(conn)).create_coupon(input)?)
        })
        .await?;
    Ok((StatusCode::CREATED, envelope(coupon)))
}

async fn list_coupons(State(state): State<SharedState>) -> ApiResult<Json<Value>> {
    let coupons = state
        .with_db(|conn| Ok(CouponService::new(SqliteCouponRepository::new(conn)).list_coupons()?))
        .await?;
    Ok(envelope(coupons))
}

async fn get_coupon(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    let coupon = state
        .with_db(move |conn| Ok(CouponService::new(SqliteCouponRepository::new(conn)).get_coupon(id)?))
        .await?;
    Ok(envelope(coupon))
}

async fn update_coupon(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<CouponRequest>,
) -> ApiResult<Json<Value>> {
    let patch = request.into_input()?;
    let coupon = state
        .with_db(move |conn| {
            Ok(CouponService::new(SqliteCouponRepository::new(conn)).update_coupon(id, patch)?)
        })
        .await?;
    Ok(envelope(coupon))
}

async fn delete_coupon(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    state
        .with_db(move |conn| {
            Ok(CouponService::new(SqliteCouponRepository::new(conn)).delete_coupon(id)?)
        })
        .await?;
    Ok(Json(json!({ "success": true, "message": "Coupon deleted" })))
}
