//! Trending search use-cases.

use crate::model::now_epoch_ms;
use crate::model::trending::{normalize_term, TrendingSearch, DEFAULT_TOP_LIMIT};
use crate::repo::trending_repo::TrendingRepository;
use crate::repo::MAX_PAGE_LIMIT;
use crate::service::ServiceResult;
use log::debug;

/// Outcome of recording one search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSearch {
    pub search: TrendingSearch,
    /// `true` when the term was seen for the first time.
    pub created: bool,
}

pub struct TrendingService<R: TrendingRepository> {
    repo: R,
}

impl<R: TrendingRepository> TrendingService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn record_search(&self, raw_term: &str) -> ServiceResult<RecordedSearch> {
        let term = normalize_term(raw_term)?;
        let (search, created) = self.repo.record(&term, now_epoch_ms())?;
        debug!("event=trending_record module=trending status=ok created={created}");
        Ok(RecordedSearch { search, created })
    }

    /// Most searched terms; `None` uses the default limit.
    pub fn top_searches(&self, limit: Option<u32>) -> ServiceResult<Vec<TrendingSearch>> {
        let limit = limit.unwrap_or(DEFAULT_TOP_LIMIT).clamp(1, MAX_PAGE_LIMIT);
        Ok(self.repo.top(limit)?)
    }
}
