//! `/api/vendors` handlers.

use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    routing::{delete, get, post, put},
};
use dealshub_core::model::comment::{CommentNode, CommentTarget};
use dealshub_core::model::reaction::Reaction;
use dealshub_core::model::vendor::{BusinessDetails, NewVendor, Vendor, VendorFilter, VendorPatch, VendorType};
use dealshub_core::repo::deal_repo::SqliteDealRepository;
use dealshub_core::repo::vendor_repo::SqliteVendorRepository;
use dealshub_core::service::vendor_service::VendorService;
use dealshub_core::PageRequest;
use log::info;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use super::comments::{self, CommentRequest, UserRef};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::forms::FormData;
use crate::integrations::{MediaUpload, upload_with_fallback};
use crate::state::SharedState;

/// Multipart file fields and the folders they are hosted under.
const IDENTITY_FIELD: (&str, &str) = ("identityImg", "vendor_identity");
const PASSPORT_FIELD: (&str, &str) = ("passportPhoto", "vendor_passports");
const LOGO_FIELD: (&str, &str) = ("businessLogo", "vendor_logos");
const CAC_FIELD: (&str, &str) = ("cacDocument", "vendor_documents");
const BANNER_FIELD: (&str, &str) = ("businessBanner", "vendor_banners");

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/create", post(create_vendor))
        .route("/get", get(list_vendors))
        .route("/get/{id}", get(get_vendor))
        .route("/name/{id}", get(vendor_by_name))
        .route("/update/{id}", put(update_vendor))
        .route("/delete/{id}", delete(delete_vendor))
        .route("/{id}/comments", post(add_comment).get(get_comments))
        .route("/{id}/comments/{comment_id}/like", post(like_comment))
        .route("/{id}/comments/{comment_id}/dislike", post(dislike_comment))
}

fn vendor_service(conn: &Connection) -> VendorService<SqliteVendorRepository<'_>, SqliteDealRepository<'_>> {
    VendorService::new(SqliteVendorRepository::new(conn), SqliteDealRepository::new(conn))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VendorListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(rename = "type")]
    pub vendor_type: Option<String>,
    pub country: Option<String>,
    pub search: Option<String>,
}

impl VendorListQuery {
    fn filter(&self) -> ApiResult<VendorFilter> {
        let text = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        let vendor_type = match text(&self.vendor_type) {
            None => None,
            Some(raw) => Some(VendorType::parse(&raw).ok_or_else(|| {
                ApiError::BadRequest("type must be local or international".to_string())
            })?),
        };
        Ok(VendorFilter {
            vendor_type,
            country: text(&self.country),
            search: text(&self.search),
        })
    }
}

/// Text fields of the registration form; file URLs are filled in after upload.
pub fn new_vendor_from_form(form: &FormData) -> ApiResult<NewVendor> {
    Ok(NewVendor {
        name: form.string("name").unwrap_or_default(),
        description: form.string("description"),
        location: form.string("location"),
        country: form.string("country"),
        vendor_type: form.string("type"),
        categories: form.list("categories"),
        posted_by: form.uuid("postedBy")?,
        response_time: form.string("responseTime"),
        business: BusinessDetails {
            cac_number: form.string("cacNumber"),
            business_website: form.string("businessWebsite"),
            business_phone: form.string("businessPhone"),
            business_email: form.string("businessEmail"),
            business_address: form.string("businessAddress"),
            ..BusinessDetails::default()
        },
        identity_img: None,
        passport_photo: None,
    })
}

async fn upload_one(state: &SharedState, upload: Option<MediaUpload>) -> ApiResult<Option<String>> {
    let Some(upload) = upload else {
        return Ok(None);
    };
    let media = state.integrations.media()?;
    let mut urls = upload_with_fallback(media, &[upload], state.config.upload_timeout).await?;
    Ok(urls.pop())
}

async fn create_vendor(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut form = FormData::read(multipart).await?;
    let mut input = new_vendor_from_form(&form)?;

    let identity = form.take_file(IDENTITY_FIELD.0, IDENTITY_FIELD.1);
    let passport = form.take_file(PASSPORT_FIELD.0, PASSPORT_FIELD.1);
    if identity.is_none() || passport.is_none() {
        return Err(ApiError::BadRequest(
            "Identity image and passport photo are required".to_string(),
        ));
    }
    let logo = form.take_file(LOGO_FIELD.0, LOGO_FIELD.1);
    let cac = form.take_file(CAC_FIELD.0, CAC_FIELD.1);
    let banner = form.take_file(BANNER_FIELD.0, BANNER_FIELD.1);

    input.identity_img = upload_one(&state, identity).await?;
    input.passport_photo = upload_one(&state, passport).await?;
    input.business.business_logo = upload_one(&state, logo).await?;
    input.business.cac_document = upload_one(&state, cac).await?;
    input.business.business_banner = upload_one(&state, banner).await?;
    info!("event=vendor_media module=vendors status=ok");

    let vendor = state
        .with_db(move |conn| Ok(vendor_service(conn).create_vendor(input)?))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Vendor created successfully", "vendor": vendor })),
    ))
}

async fn list_vendors(
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<VendorListQuery>,
) -> ApiResult<Json<Value>> {
    let filter = query.filter()?;
    let page = PageRequest::new(query.page, query.limit);
    let vendors = state
        .with_db(move |conn| Ok(vendor_service(conn).list_vendors(&filter, page)?))
        .await?;
    Ok(Json(json!({
        "message": "Vendors fetched successfully",
        "data": vendors.items,
        "total": vendors.total,
        "page": vendors.page,
        "pages": vendors.pages,
    })))
}

async fn get_vendor(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Vendor>> {
    let vendor = state
        .with_db(move |conn| Ok(vendor_service(conn).get_vendor(id)?))
        .await?;
    Ok(Json(vendor))
}

async fn vendor_by_name(
    State(state): State<SharedState>,
    ApiPath(name): ApiPath<String>,
) -> ApiResult<Json<Value>> {
    let found = state
        .with_db(move |conn| Ok(vendor_service(conn).vendor_by_name(&name)?))
        .await?;
    Ok(Json(json!({
        "message": "Vendor fetched successfully",
        "vendor": found.vendor,
        "totalDeals": found.deals.len(),
        "deals": found.deals,
    })))
}

async fn update_vendor(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<VendorPatch>,
) -> ApiResult<Json<Value>> {
    let vendor = state
        .with_db(move |conn| Ok(vendor_service(conn).update_vendor(id, patch)?))
        .await?;
    Ok(Json(json!({ "message": "Vendor updated successfully", "vendor": vendor })))
}

async fn delete_vendor(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    state
        .with_db(move |conn| Ok(vendor_service(conn).delete_vendor(id)?))
        .await?;
    Ok(Json(json!({ "message": "Vendor deleted successfully" })))
}

async fn add_comment(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<CommentRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    comments::add(&state, CommentTarget::Vendor, id, request).await
}

async fn get_comments(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<CommentNode>>> {
    comments::tree(&state, CommentTarget::Vendor, id).await
}

async fn like_comment(
    State(state): State<SharedState>,
    ApiPath((id, comment_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(user): ApiJson<UserRef>,
) -> ApiResult<Json<Value>> {
    comments::react(&state, CommentTarget::Vendor, id, comment_id, user, Reaction::Like).await
}

async fn dislike_comment(
    State(state): State<SharedState>,
    ApiPath((id, comment_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(user): ApiJson<UserRef>,
) -> ApiResult<Json<Value>> {
    comments::react(&state, CommentTarget::Vendor, id, comment_id, user, Reaction::Dislike).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_form_maps_business_details() {
        let owner = Uuid::new_v4();
        let owner_text = owner.to_string();
        let form = FormData::from_fields([
            ("name", "Lagos Gadgets"),
            ("type", "international"),
            ("categories", "phones,laptops"),
            ("postedBy", owner_text.as_str()),
            ("cacNumber", "RC-1234"),
        ]);
        let input = new_vendor_from_form(&form).unwrap();
        assert_eq!(input.name, "Lagos Gadgets");
        assert_eq!(input.vendor_type.as_deref(), Some("international"));
        assert_eq!(input.categories, vec!["phones", "laptops"]);
        assert_eq!(input.posted_by, Some(owner));
        assert_eq!(input.business.cac_number.as_deref(), Some("RC-1234"));
        assert!(input.identity_img.is_none());
    }

    #[test]
    fn list_query_rejects_unknown_vendor_type() {
        let query = VendorListQuery {
            vendor_type: Some("galactic".into()),
            ..VendorListQuery::default()
        };
        assert!(query.filter().is_err());

        let query = VendorListQuery {
            vendor_type: Some("local".into()),
            country: Some(" ".into()),
            ..VendorListQuery::default()
        };
        let filter = query.filter().unwrap();
        assert_eq!(filter.vendor_type, Some(VendorType::Local));
        assert_eq!(filter.country, None);
    }
}
