//! `/api/deals` handlers.

use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    routing::{delete, get, patch, post, put},
};
use dealshub_core::model::comment::{CommentNode, CommentTarget};
use dealshub_core::model::deal::{Deal, DealFilter, DealPatch, DealSort, DealStatus, NewDeal, VoteKind};
use dealshub_core::model::reaction::Reaction;
use dealshub_core::repo::deal_repo::SqliteDealRepository;
use dealshub_core::repo::vendor_repo::SqliteVendorRepository;
use dealshub_core::service::vendor_service::VendorService;
use dealshub_core::{DealService, Page, PageRequest};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use super::comments::{self, CommentRequest, UserRef};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::forms::{FormData, parse_bool};
use crate::integrations::upload_with_fallback;
use crate::state::{SessionUser, SharedState};

const DEAL_IMAGE_FOLDER: &str = "deal_images";

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/create", post(create_deal))
        .route("/get", get(list_deals))
        .route("/featured", get(featured_deals))
        .route("/get-by-id/{id}", get(get_deal))
        .route("/update/{id}", put(update_deal))
        .route("/delete/{id}", delete(delete_deal))
        .route("/by-user/{id}", get(deals_by_user))
        .route("/brand/{brand}", get(deals_by_brand))
        .route("/{id}/approve", patch(approve_deal))
        .route("/{id}/reject", patch(reject_deal))
        .route("/{id}/like", post(toggle_like))
        .route("/{id}/upvote", post(toggle_upvote))
        .route("/{id}/bookmark", post(toggle_bookmark))
        .route("/{id}/rate", post(rate_deal))
        .route("/{id}/comments", post(add_comment).get(get_comments))
        .route("/{id}/comments/{comment_id}/like", post(like_comment))
        .route("/{id}/comments/{comment_id}/dislike", post(dislike_comment))
        .route("/{id}/deals/count", get(vendor_deal_count))
}

#[derive(Debug, Serialize)]
pub struct DealPage {
    pub deals: Vec<Deal>,
    pub total: u64,
    pub page: u32,
    pub pages: u32,
}

impl From<Page<Deal>> for DealPage {
    fn from(page: Page<Deal>) -> Self {
        Self {
            deals: page.items,
            total: page.total,
            page: page.page,
            pages: page.pages,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DealListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_discount: Option<f64>,
    pub max_discount: Option<f64>,
    pub brand: Option<String>,
    pub platform: Option<String>,
    pub show_saved_only: Option<String>,
}

impl DealListQuery {
    fn filter(&self) -> DealFilter {
        let text = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        DealFilter {
            category: text(&self.category).filter(|value| !value.eq_ignore_ascii_case("all")),
            brand: text(&self.brand),
            platform: text(&self.platform),
            search: text(&self.search),
            min_price: self.min_price,
            max_price: self.max_price,
            min_discount: self.min_discount,
            max_discount: self.max_discount,
            saved_only: self.show_saved_only.as_deref().is_some_and(parse_bool),
            sort: self.sort(),
        }
    }

    fn sort(&self) -> DealSort {
        self.sort_by.as_deref().map(DealSort::parse).unwrap_or_default()
    }

    fn page(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RateRequest {
    pub user_id: Option<Uuid>,
    pub rating: Option<Value>,
}

/// Maps multipart fields onto the create input; uploads are added later.
pub fn new_deal_from_form(form: &FormData) -> ApiResult<NewDeal> {
    let status = match form.text("status") {
        None => None,
        Some(raw) => Some(DealStatus::parse(raw).ok_or_else(|| {
            ApiError::BadRequest("status must be active, pending or rejected".to_string())
        })?),
    };
    let expiration_date = form.string("expirationDate");
    let expires_at = match form.timestamp("expiresAt")? {
        Some(value) => Some(value),
        None => form.timestamp("expirationDate")?,
    };
    Ok(NewDeal {
        url: form.string("url"),
        title: form.string("title").unwrap_or_default(),
        description: form.string("description"),
        images: form.list("images"),
        category: form.string("category"),
        tags: form.list("tags"),
        original_price: form.number("originalPrice")?,
        discounted_price: form.number("discountedPrice")?,
        discount_percentage: form.number("discountPercentage")?,
        currency: form.string("currency"),
        currency_symbol: form.string("currencySymbol"),
        shipping_cost: form.string("shippingCost"),
        coupon_code: form.string("couponCode"),
        affiliate_url: form.string("affiliateUrl"),
        brand: form.string("brand"),
        platform: form.string("platform"),
        colors: form.list("colors"),
        sizes: form.list("sizes"),
        specifications: form.json_object("specifications"),
        availability: form.string("availability"),
        expiration_date,
        expires_at,
        is_verified: form.flag("isVerified"),
        is_saved: form.flag("isSaved"),
        free_shipping: form.flag("freeShipping"),
        featured: form.flag("featured"),
        created_by: form.uuid("createdBy")?,
        status,
    })
}

async fn create_deal(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Deal>)> {
    let mut form = FormData::read(multipart).await?;
    let mut input = new_deal_from_form(&form)?;
    let uploads = form.take_files("images", DEAL_IMAGE_FOLDER);
    if !uploads.is_empty() {
        let media = state.integrations.media()?;
        let urls = upload_with_fallback(media, &uploads, state.config.upload_timeout).await?;
        info!("event=deal_media module=deals status=ok uploaded={}", urls.len());
        input.images.extend(urls);
    }
    let deal = state
        .with_db(move |conn| Ok(DealService::new(SqliteDealRepository::new(conn)).create_deal(input)?))
        .await?;
    Ok((StatusCode::CREATED, Json(deal)))
}

async fn list_deals(
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<DealListQuery>,
) -> ApiResult<Json<DealPage>> {
    let filter = query.filter();
    let page = query.page();
    let deals = state
        .with_db(move |conn| {
            Ok(DealService::new(SqliteDealRepository::new(conn)).list_deals(&filter, page)?)
        })
        .await?;
    Ok(Json(deals.into()))
}

async fn featured_deals(
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> ApiResult<Json<Value>> {
    let limit = query.limit.unwrap_or(10);
    let deals = state
        .with_db(move |conn| Ok(DealService::new(SqliteDealRepository::new(conn)).list_featured(limit)?))
        .await?;
    Ok(Json(json!({ "deals": deals })))
}

async fn get_deal(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Deal>> {
    let deal = state
        .with_db(move |conn| Ok(DealService::new(SqliteDealRepository::new(conn)).view_deal(id)?))
        .await?;
    Ok(Json(deal))
}

async fn update_deal(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<DealPatch>,
) -> ApiResult<Json<Deal>> {
    let deal = state
        .with_db(move |conn| Ok(DealService::new(SqliteDealRepository::new(conn)).update_deal(id, patch)?))
        .await?;
    Ok(Json(deal))
}

async fn delete_deal(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    state
        .with_db(move |conn| Ok(DealService::new(SqliteDealRepository::new(conn)).delete_deal(id)?))
        .await?;
    Ok(Json(json!({ "message": "Deal deleted successfully" })))
}

async fn deals_by_user(
    State(state): State<SharedState>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    let deals = state
        .with_db(move |conn| {
            Ok(DealService::new(SqliteDealRepository::new(conn)).list_by_creator(user_id)?)
        })
        .await?;
    Ok(Json(json!({ "count": deals.len(), "deals": deals })))
}

async fn deals_by_brand(
    State(state): State<SharedState>,
    ApiPath(brand): ApiPath<String>,
    ApiQuery(query): ApiQuery<DealListQuery>,
) -> ApiResult<Json<DealPage>> {
    let sort = query.sort();
    let page = query.page();
    let deals = state
        .with_db(move |conn| {
            Ok(DealService::new(SqliteDealRepository::new(conn)).list_by_brand(&brand, sort, page)?)
        })
        .await?;
    Ok(Json(deals.into()))
}

async fn approve_deal(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    let deal = state
        .with_db(move |conn| Ok(DealService::new(SqliteDealRepository::new(conn)).approve_deal(id)?))
        .await?;
    Ok(Json(json!({ "message": "Deal status updated to active successfully", "deal": deal })))
}

async fn reject_deal(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    let deal = state
        .with_db(move |conn| Ok(DealService::new(SqliteDealRepository::new(conn)).reject_deal(id)?))
        .await?;
    Ok(Json(json!({ "message": "Deal status updated to rejected successfully", "deal": deal })))
}

async fn toggle(state: &SharedState, id: Uuid, user_id: Uuid, kind: VoteKind) -> ApiResult<u32> {
    let outcome = state
        .with_db(move |conn| {
            Ok(DealService::new(SqliteDealRepository::new(conn)).toggle_vote(id, user_id, kind)?)
        })
        .await?;
    Ok(outcome.count)
}

fn voter(user: &UserRef) -> ApiResult<Uuid> {
    user.user_id
        .ok_or_else(|| ApiError::Unauthorized("Unauthorized: user not found".to_string()))
}

async fn toggle_like(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(user): ApiJson<UserRef>,
) -> ApiResult<Json<Value>> {
    let likes = toggle(&state, id, voter(&user)?, VoteKind::Like).await?;
    Ok(Json(json!({ "likes": likes })))
}

async fn toggle_upvote(
    State(state): State<SharedState>,
    SessionUser(claims): SessionUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    let upvotes = toggle(&state, id, claims.sub, VoteKind::Upvote).await?;
    Ok(Json(json!({ "upvotes": upvotes })))
}

async fn toggle_bookmark(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(user): ApiJson<UserRef>,
) -> ApiResult<Json<Value>> {
    let bookmarks = toggle(&state, id, voter(&user)?, VoteKind::Bookmark).await?;
    Ok(Json(json!({ "bookmarks": bookmarks })))
}

async fn rate_deal(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<RateRequest>,
) -> ApiResult<Json<Value>> {
    let user_id = request
        .user_id
        .ok_or_else(|| ApiError::Unauthorized("User not authenticated".to_string()))?;
    let rating = parse_rating(request.rating.as_ref())?;
    let summary = state
        .with_db(move |conn| {
            Ok(DealService::new(SqliteDealRepository::new(conn)).rate_deal(id, user_id, rating)?)
        })
        .await?;
    Ok(Json(json!({
        "message": "Rating saved successfully",
        "averageRating": summary.average,
        "ratingsCount": summary.count,
    })))
}

/// Accepts `4` or `"4"`; range checks happen in the service.
fn parse_rating(raw: Option<&Value>) -> ApiResult<i64> {
    let invalid = || ApiError::BadRequest("Rating must be between 1 and 5".to_string());
    match raw {
        Some(Value::Number(number)) => number.as_i64().ok_or_else(invalid),
        Some(Value::String(text)) => text.trim().parse().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

async fn add_comment(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<CommentRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    comments::add(&state, CommentTarget::Deal, id, request).await
}

async fn get_comments(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<CommentNode>>> {
    comments::tree(&state, CommentTarget::Deal, id).await
}

async fn like_comment(
    State(state): State<SharedState>,
    ApiPath((id, comment_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(user): ApiJson<UserRef>,
) -> ApiResult<Json<Value>> {
    comments::react(&state, CommentTarget::Deal, id, comment_id, user, Reaction::Like).await
}

async fn dislike_comment(
    State(state): State<SharedState>,
    ApiPath((id, comment_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(user): ApiJson<UserRef>,
) -> ApiResult<Json<Value>> {
    comments::react(&state, CommentTarget::Deal, id, comment_id, user, Reaction::Dislike).await
}

async fn vendor_deal_count(
    State(state): State<SharedState>,
    ApiPath(vendor_id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    let (vendor, total) = state
        .with_db(move |conn| {
            let service = VendorService::new(
                SqliteVendorRepository::new(conn),
                SqliteDealRepository::new(conn),
            );
            let vendor = service.get_vendor(vendor_id)?;
            let total = service.vendor_deal_count(vendor_id)?;
            Ok((vendor, total))
        })
        .await?;
    Ok(Json(json!({
        "message": "Vendor deal count fetched successfully",
        "vendor": { "id": vendor.id, "name": vendor.name },
        "totalDeals": total,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_ignores_all_category_and_blanks() {
        let query = DealListQuery {
            category: Some("All".into()),
            brand: Some("  ".into()),
            sort_by: Some("price-low".into()),
            show_saved_only: Some("1".into()),
            ..DealListQuery::default()
        };
        let filter = query.filter();
        assert_eq!(filter.category, None);
        assert_eq!(filter.brand, None);
        assert_eq!(filter.sort, DealSort::PriceLow);
        assert!(filter.saved_only);
    }

    #[test]
    fn form_fields_map_onto_new_deal() {
        let form = FormData::from_fields([
            ("title", "Noise Cancelling Headphones"),
            ("originalPrice", "200"),
            ("discountedPrice", "150"),
            ("tags", r#"["audio","sale"]"#),
            ("colors", "black, white"),
            ("freeShipping", "true"),
            ("expirationDate", "2030-01-01"),
            ("specifications", r#"{"battery":"30h"}"#),
        ]);
        let input = new_deal_from_form(&form).unwrap();
        assert_eq!(input.title, "Noise Cancelling Headphones");
        assert_eq!(input.original_price, Some(200.0));
        assert_eq!(input.tags, vec!["audio", "sale"]);
        assert_eq!(input.colors, vec!["black", "white"]);
        assert!(input.free_shipping);
        assert!(!input.featured);
        assert_eq!(input.expiration_date.as_deref(), Some("2030-01-01"));
        assert_eq!(input.expires_at, Some(1_893_456_000_000));
        assert_eq!(input.specifications.get("battery"), Some(&Value::from("30h")));
    }

    #[test]
    fn unknown_status_in_form_is_rejected() {
        let form = FormData::from_fields([("title", "Deal"), ("status", "archived")]);
        assert!(new_deal_from_form(&form).is_err());
    }

    #[test]
    fn ratings_accept_numbers_and_numeric_strings() {
        assert_eq!(parse_rating(Some(&json!(4))).unwrap(), 4);
        assert_eq!(parse_rating(Some(&json!("5"))).unwrap(), 5);
        assert!(parse_rating(Some(&json!("five"))).is_err());
        assert!(parse_rating(None).is_err());
    }
}
