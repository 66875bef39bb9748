//! Search terms ranked by popularity.

use crate::model::{require_text, ValidationError};
use serde::Serialize;

pub const DEFAULT_TOP_LIMIT: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingSearch {
    pub term: String,
    pub count: u32,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Trims a search term, rejecting blank input.
pub fn normalize_term(raw: &str) -> Result<String, ValidationError> {
    require_text("term", raw)
}
