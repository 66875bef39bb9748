//! Magic-link and Google sign-in handlers.
//!
//! # Invariants
//! - A magic link is only issued once email delivery is configured.
//! - Raw magic tokens and session tokens are never logged.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
};
use dealshub_core::model::user::{User, email_local_part};
use dealshub_core::repo::user_repo::SqliteUserRepository;
use dealshub_core::service::auth_service::{AuthService, Session};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/auth/magiclink", post(request_magic_link))
        .route("/api/auth/verify-magic", get(verify_magic_link))
        .route("/auth/google", get(google_start))
        .route("/auth/google/callback", get(google_callback))
        .route("/unauthorized", get(unauthorized))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MagicLinkRequest {
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TokenQuery {
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

/// Account summary handed to the frontend after Google sign-in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeUser<'a> {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: &'a str,
    pub email: &'a str,
    pub photo: Option<&'a str>,
    #[serde(rename = "type")]
    pub user_type: &'static str,
    pub role: &'static str,
    pub brand: Option<&'a str>,
    pub status: &'static str,
    pub plan: &'static str,
    pub deals_count: i64,
    pub deals_posted: i64,
}

impl<'a> From<&'a User> for SafeUser<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            id: user.id.to_string(),
            name: display_name(user),
            email: &user.email,
            photo: user.photo.as_deref(),
            user_type: user.user_type.as_str(),
            role: user.role.as_str(),
            brand: user.brand.as_deref(),
            status: user.status.as_str(),
            plan: user.plan.as_str(),
            deals_count: user.deals_count,
            deals_posted: user.deals_posted,
        }
    }
}

fn display_name(user: &User) -> &str {
    user.display_name
        .as_deref()
        .unwrap_or_else(|| email_local_part(&user.email))
}

/// Frontend location for a finished Google sign-in.
pub fn google_redirect(frontend_url: &str, session: &Session) -> ApiResult<String> {
    let path = if session.user.preferences.is_empty() {
        "/Preferences"
    } else {
        "/"
    };
    let user = serde_json::to_string(&SafeUser::from(&session.user))
        .map_err(|err| ApiError::Internal(format!("encode user: {err}")))?;
    Ok(format!(
        "{frontend_url}{path}?user={}&token={}",
        urlencoding::encode(&user),
        urlencoding::encode(&session.token)
    ))
}

async fn request_magic_link(
    State(state): State<SharedState>,
    ApiJson(request): ApiJson<MagicLinkRequest>,
) -> ApiResult<Json<Value>> {
    let mailer = state.integrations.mailer()?;
    let signer = state.signer.clone();
    let email = request.email;
    let issued = state
        .with_db(move |conn| {
            Ok(AuthService::new(SqliteUserRepository::new(conn), signer).request_magic_link(&email)?)
        })
        .await?;
    let link = format!(
        "{}/api/auth/verify-magic?token={}",
        state.config.public_url,
        urlencoding::encode(&issued.token)
    );
    mailer
        .send_magic_link(&issued.user.email, display_name(&issued.user), &link)
        .await?;
    info!("event=magic_link_send module=auth status=ok user_id={}", issued.user.id);
    Ok(Json(json!({ "message": "Magic link sent" })))
}

async fn verify_magic_link(
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<TokenQuery>,
) -> ApiResult<Redirect> {
    let signer = state.signer.clone();
    let session = state
        .with_db(move |conn| {
            Ok(AuthService::new(SqliteUserRepository::new(conn), signer).verify_magic_link(&query.token)?)
        })
        .await?;
    Ok(Redirect::to(&format!(
        "{}/callback?token={}&userId={}",
        state.config.frontend_url,
        urlencoding::encode(&session.token),
        session.user.id
    )))
}

async fn google_start(State(state): State<SharedState>) -> ApiResult<Redirect> {
    let oauth = state.integrations.oauth()?;
    Ok(Redirect::to(&oauth.authorization_url()))
}

async fn google_callback(
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<CallbackQuery>,
) -> ApiResult<Redirect> {
    let oauth = state.integrations.oauth()?;
    let Some(code) = query.code.filter(|code| !code.is_empty()) else {
        warn!(
            "event=google_callback module=auth status=error reason={}",
            query.error.as_deref().unwrap_or("missing_code")
        );
        return Ok(Redirect::to("/unauthorized"));
    };
    let profile = match oauth.exchange_code(&code).await {
        Ok(profile) => profile,
        Err(err) => {
            warn!("event=google_callback module=auth status=error reason={err}");
            return Ok(Redirect::to("/unauthorized"));
        }
    };
    let signer = state.signer.clone();
    let session = state
        .with_db(move |conn| {
            Ok(AuthService::new(SqliteUserRepository::new(conn), signer).login_with_google(profile)?)
        })
        .await?;
    info!("event=google_callback module=auth status=ok user_id={}", session.user.id);
    Ok(Redirect::to(&google_redirect(&state.config.frontend_url, &session)?))
}

async fn unauthorized() -> (StatusCode, &'static str) {
    (
        StatusCode::FORBIDDEN,
        "Access denied. You are not authorized to use this app.",
    )
}
