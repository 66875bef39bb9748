//! HTTP route table.
//!
//! # Invariants
//! - Resource routers are nested under `/api/<resource>`.
//! - Path parameters in the first position are always named `id` so sibling
//!   routes never conflict.

use axum::{Router, routing::get};

use crate::state::SharedState;

pub mod analyze;
pub mod auth;
pub mod comments;
pub mod coupons;
pub mod curated;
pub mod deals;
pub mod forum;
pub mod group_deals;
pub mod heroes;
pub mod orders;
pub mod payments;
pub mod trending;
pub mod users;
pub mod vendor_plans;
pub mod vendors;

pub const HEALTH_TEXT: &str = "DealsHub API is running...";

/// Every route, without middleware or state.
pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/api", get(health))
        .nest("/api/deals", deals::router())
        .nest("/api/vendors", vendors::router())
        .nest("/api/forum", forum::router())
        .nest("/api/coupons", coupons::router())
        .nest("/api/group-deals", group_deals::router())
        .nest("/api/trending", trending::router())
        .nest("/api/heroes", heroes::router())
        .nest("/api/curated-categories", curated::router())
        .nest("/api/vendor-plans", vendor_plans::router())
        .nest("/api/orders", orders::router())
        .nest("/api/paystack", payments::router())
        .merge(users::router())
        .merge(auth::router())
        .merge(analyze::router())
}

async fn health() -> &'static str {
    HEALTH_TEXT
}
