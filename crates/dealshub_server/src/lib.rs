//! DealsHub HTTP server.
//!
//! # Responsibility
//! - Expose the core services over an axum router.
//! - Own configuration, third-party clients and process lifecycle.
//!
//! # Invariants
//! - Handlers never block the async runtime on SQLite work.
//! - Shutdown waits for in-flight requests after Ctrl-C or SIGTERM.

use std::future::Future;
use std::io;
use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
};
use dealshub_core::now_epoch_ms;
use log::{error, info, warn};
use tokio::{net::TcpListener, signal::ctrl_c, task::JoinHandle};
use tower_http::cors::{AllowOrigin, CorsLayer};

pub mod config;
pub mod error;
pub mod extract;
pub mod forms;
pub mod integrations;
pub mod routes;
pub mod state;

use routes::group_deals::group_deal_service;
use state::SharedState;

/// Upload bodies carry several images and an optional video.
pub const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

pub const EXPIRY_INTERVAL: Duration = Duration::from_secs(60);

/// Full application: routes, CORS, body limit and state.
pub fn build_router(state: SharedState) -> Router {
    routes::routes()
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer(&state))
        .with_state(state)
}

/// Allows configured origins, or the frontend URL when none are listed.
fn cors_layer(state: &SharedState) -> CorsLayer {
    let configured = if state.config.cors_origins.is_empty() {
        vec![state.config.frontend_url.clone()]
    } else {
        state.config.cors_origins.clone()
    };
    let origins: Vec<HeaderValue> = configured
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("event=cors_origin module=http status=warn origin={origin} reason=invalid");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(60 * 60))
}

/// Serves until `shutdown` resolves, then drains in-flight requests.
pub async fn serve<S>(listener: TcpListener, state: SharedState, shutdown: S) -> io::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let address = listener.local_addr()?;
    info!("event=server_start module=http status=ok address={address}");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("event=server_stop module=http status=ok");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = ctrl_c().await {
            error!("event=signal_install module=http status=error signal=ctrl_c error={err}");
            std::future::pending::<()>().await;
        }
        info!("event=shutdown module=http status=start signal=ctrl_c");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("event=shutdown module=http status=start signal=sigterm");
            }
            Err(err) => {
                error!("event=signal_install module=http status=error signal=sigterm error={err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Periodically moves overdue group deals to `expired`.
pub fn spawn_expiry_task(state: SharedState, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let result = state
                .with_db(|conn| Ok(group_deal_service(conn).expire_overdue(now_epoch_ms())?))
                .await;
            if let Err(err) = result {
                error!("event=group_deal_expire module=group_deals status=error error={err}");
            }
        }
    })
}
