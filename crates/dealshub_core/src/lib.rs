//! Core domain logic for DealsHub.
//! This crate is the single source of truth for marketplace invariants.

pub mod auth;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::{now_epoch_ms, ValidationError};
pub use repo::{Page, PageRequest, RepoError, RepoResult};
pub use service::comment_service::{build_comment_tree, CommentService, CommentServiceError};
pub use service::deal_service::{DealService, DealServiceError};
pub use service::group_deal_service::{GroupDealService, GroupDealServiceError};
pub use service::{ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
