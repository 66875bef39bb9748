//! `POST /api/analyze-url`.

use axum::{Json, Router, extract::State, routing::post};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::integrations::PagePreview;
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new().route("/api/analyze-url", post(analyze_url))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AnalyzeRequest {
    pub url: Option<String>,
}

async fn analyze_url(
    State(state): State<SharedState>,
    ApiJson(request): ApiJson<AnalyzeRequest>,
) -> ApiResult<Json<PagePreview>> {
    let url = request
        .url
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ApiError::BadRequest("URL required".to_string()))?;
    let preview = state.integrations.analyzer.analyze(&url).await?;
    Ok(Json(preview))
}
