//! `/api/group-deals` handlers.

use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use dealshub_core::model::group_deal::{GroupDeal, GroupDealFilter, GroupDealStatus, NewGroupDeal};
use dealshub_core::repo::group_deal_repo::SqliteGroupDealRepository;
use dealshub_core::repo::user_repo::SqliteUserRepository;
use dealshub_core::repo::vendor_repo::SqliteVendorRepository;
use dealshub_core::{GroupDealService, PageRequest};
use log::info;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiPath, ApiQuery};
use crate::forms::FormData;
use crate::integrations::upload_with_fallback;
use crate::state::SharedState;

const GROUP_DEAL_IMAGE_FOLDER: &str = "group_deal_images";

type SqliteGroupDealService<'conn> = GroupDealService<
    SqliteGroupDealRepository<'conn>,
    SqliteUserRepository<'conn>,
    SqliteVendorRepository<'conn>,
>;

pub fn group_deal_service(conn: &Connection) -> SqliteGroupDealService<'_> {
    GroupDealService::new(
        SqliteGroupDealRepository::new(conn),
        SqliteUserRepository::new(conn),
        SqliteVendorRepository::new(conn),
    )
}

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/create", post(create_group_deal))
        .route("/get", get(list_group_deals))
        .route("/active", get(active_group_deals))
        .route("/vendor/{id}", get(vendor_group_deals))
        .route("/getbyid/{id}", get(get_group_deal))
        .route("/delete/{id}", delete(delete_group_deal))
        .route("/{id}/{user_id}/slots/reserve", post(reserve_slot))
        .route("/{id}/{user_id}/slots/confirm", post(confirm_payment))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupDealListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
    #[serde(alias = "vendor")]
    pub vendor_id: Option<Uuid>,
}

impl GroupDealListQuery {
    fn filter(&self) -> ApiResult<GroupDealFilter> {
        let status = match self.status.as_deref().map(str::trim).filter(|raw| !raw.is_empty()) {
            None => None,
            Some(raw) => Some(
                GroupDealStatus::parse(raw)
                    .ok_or_else(|| ApiError::BadRequest(format!("unknown status: {raw}")))?,
            ),
        };
        Ok(GroupDealFilter {
            status,
            vendor_id: self.vendor_id,
        })
    }
}

pub fn new_group_deal_from_form(form: &FormData) -> ApiResult<NewGroupDeal> {
    Ok(NewGroupDeal {
        user_id: form.uuid("userId")?,
        vendor_id: form.uuid("vendorId")?,
        title: form.string("title").unwrap_or_default(),
        description: form.string("description").unwrap_or_default(),
        images: form.list("images"),
        original_price: form.number("originalPrice")?,
        discounted_price: form.number("discountedPrice")?,
        discount_percentage: form.number("discountPercentage")?,
        currency: form.string("currency"),
        total_slots: form.integer("totalSlots")?,
        expires_at: form.timestamp("expiresAt")?,
        shipping_type: form.string("shippingType"),
        shipping_note: form.string("shippingNote"),
        delivery_estimate: form.string("deliveryEstimate"),
    })
}

async fn create_group_deal(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<GroupDeal>)> {
    let mut form = FormData::read(multipart).await?;
    let mut input = new_group_deal_from_form(&form)?;
    let uploads = form.take_files("images", GROUP_DEAL_IMAGE_FOLDER);
    if !uploads.is_empty() {
        let media = state.integrations.media()?;
        let urls = upload_with_fallback(media, &uploads, state.config.upload_timeout).await?;
        info!("event=group_deal_media module=group_deals status=ok uploaded={}", urls.len());
        input.images.extend(urls);
    }
    let deal = state
        .with_db(move |conn| Ok(group_deal_service(conn).create_group_deal(input)?))
        .await?;
    Ok((StatusCode::CREATED, Json(deal)))
}

async fn list_group_deals(
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<GroupDealListQuery>,
) -> ApiResult<Json<Value>> {
    let filter = query.filter()?;
    let page = PageRequest::new(query.page, query.limit);
    let deals = state
        .with_db(move |conn| Ok(group_deal_service(conn).list_group_deals(&filter, page)?))
        .await?;
    Ok(Json(json!({
        "deals": deals.items,
        "page": deals.page,
        "totalPages": deals.pages,
        "total": deals.total,
    })))
}

async fn active_group_deals(State(state): State<SharedState>) -> ApiResult<Json<Vec<GroupDeal>>> {
    let deals = state
        .with_db(|conn| Ok(group_deal_service(conn).active_group_deals()?))
        .await?;
    Ok(Json(deals))
}

async fn vendor_group_deals(
    State(state): State<SharedState>,
    ApiPath(vendor_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<GroupDeal>>> {
    let deals = state
        .with_db(move |conn| Ok(group_deal_service(conn).vendor_group_deals(vendor_id)?))
        .await?;
    Ok(Json(deals))
}

async fn get_group_deal(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<GroupDeal>> {
    let deal = state
        .with_db(move |conn| Ok(group_deal_service(conn).get_group_deal(id)?))
        .await?;
    Ok(Json(deal))
}

async fn delete_group_deal(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    state
        .with_db(move |conn| Ok(group_deal_service(conn).delete_group_deal(id)?))
        .await?;
    Ok(Json(json!({ "message": "Group deal deleted" })))
}

async fn reserve_slot(
    State(state): State<SharedState>,
    ApiPath((id, user_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<Value>> {
    let reservation = state
        .with_db(move |conn| Ok(group_deal_service(conn).reserve_slot(id, user_id)?))
        .await?;
    Ok(Json(json!({
        "message": "Slot reserved",
        "position": reservation.position,
        "availableSlots": reservation.available_slots,
        "deal": reservation.group_deal,
    })))
}

async fn confirm_payment(
    State(state): State<SharedState>,
    ApiPath((id, user_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<Value>> {
    let status = state
        .with_db(move |conn| Ok(group_deal_service(conn).confirm_payment(id, user_id)?))
        .await?;
    Ok(Json(json!({ "message": "Payment confirmed", "dealStatus": status })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_maps_slots_and_expiry() {
        let form = FormData::from_fields([
            ("title", "Bulk rice"),
            ("totalSlots", "4"),
            ("expiresAt", "2030-01-01"),
            ("shippingType", "pickup"),
        ]);
        let input = new_group_deal_from_form(&form).unwrap();
        assert_eq!(input.total_slots, Some(4));
        assert_eq!(input.expires_at, Some(1_893_456_000_000));
        assert_eq!(input.shipping_type.as_deref(), Some("pickup"));
    }

    #[test]
    fn fractional_slot_count_is_rejected() {
        let form = FormData::from_fields([("totalSlots", "2.5")]);
        assert!(new_group_deal_from_form(&form).is_err());
    }

    #[test]
    fn list_query_validates_status() {
        let query = GroupDealListQuery {
            status: Some("completed".into()),
            ..GroupDealListQuery::default()
        };
        assert_eq!(query.filter().unwrap().status, Some(GroupDealStatus::Completed));
        let query = GroupDealListQuery {
            status: Some("done".into()),
            ..GroupDealListQuery::default()
        };
        assert!(query.filter().is_err());
    }
}
