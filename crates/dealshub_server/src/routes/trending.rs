//! `/api/trending` handlers.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use dealshub_core::model::trending::TrendingSearch;
use dealshub_core::repo::trending_repo::SqliteTrendingRepository;
use dealshub_core::service::trending_service::TrendingService;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(top_searches).post(record_search))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    #[serde(alias = "term")]
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TopQuery {
    pub limit: Option<u32>,
}

async fn record_search(
    State(state): State<SharedState>,
    ApiJson(request): ApiJson<SearchRequest>,
) -> ApiResult<(StatusCode, Json<TrendingSearch>)> {
    let term = request
        .search
        .ok_or_else(|| ApiError::BadRequest("Search term is required".to_string()))?;
    let recorded = state
        .with_db(move |conn| {
            Ok(TrendingService::new(SqliteTrendingRepository::new(conn)).record_search(&term)?)
        })
        .await?;
    let status = if recorded.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(recorded.search)))
}

async fn top_searches(
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<TopQuery>,
) -> ApiResult<Json<Vec<TrendingSearch>>> {
    let searches = state
        .with_db(move |conn| {
            Ok(TrendingService::new(SqliteTrendingRepository::new(conn)).top_searches(query.limit)?)
        })
        .await?;
    Ok(Json(searches))
}
