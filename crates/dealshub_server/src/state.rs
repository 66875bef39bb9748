//! Shared application state handed to every handler.
//!
//! # Invariants
//! - One SQLite connection serves the process; access is serialized by a mutex.
//! - A poisoned lock is recovered, the connection stays usable.

use std::sync::{Arc, Mutex, PoisonError};

use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use dealshub_core::auth::{SessionClaims, SessionSigner};
use dealshub_core::now_epoch_ms;
use log::warn;
use rusqlite::Connection;

use crate::config::ServerConfig;
use crate::error::{ApiError, ApiResult};
use crate::integrations::{
    CloudinaryHost, GoogleOAuth, HttpPageAnalyzer, IntegrationResult, Mailer, MediaHost,
    OAuthProvider, PageAnalyzer, PaymentGateway, PaystackGateway, ResendMailer,
};

/// Upstream clients; `None` marks an integration left unconfigured.
#[derive(Clone)]
pub struct Integrations {
    pub media: Option<Arc<dyn MediaHost>>,
    pub payments: Option<Arc<dyn PaymentGateway>>,
    pub mailer: Option<Arc<dyn Mailer>>,
    pub oauth: Option<Arc<dyn OAuthProvider>>,
    pub analyzer: Arc<dyn PageAnalyzer>,
}

impl Integrations {
    /// Real clients for every integration the config enables.
    pub fn from_config(config: &ServerConfig) -> IntegrationResult<Self> {
        let media = match &config.cloudinary {
            Some(cloudinary) => {
                Some(Arc::new(CloudinaryHost::new(cloudinary.clone())?) as Arc<dyn MediaHost>)
            }
            None => None,
        };
        let payments = match &config.paystack_secret_key {
            Some(key) => {
                Some(Arc::new(PaystackGateway::new(key.clone())?) as Arc<dyn PaymentGateway>)
            }
            None => None,
        };
        let mailer = match &config.resend_api_key {
            Some(key) => Some(Arc::new(ResendMailer::new(
                key.clone(),
                config.magic_link_from.clone(),
            )?) as Arc<dyn Mailer>),
            None => None,
        };
        let oauth = match &config.google {
            Some(google) => {
                Some(Arc::new(GoogleOAuth::new(google.clone())?) as Arc<dyn OAuthProvider>)
            }
            None => None,
        };
        Ok(Self {
            media,
            payments,
            mailer,
            oauth,
            analyzer: Arc::new(HttpPageAnalyzer::new()?),
        })
    }

    pub fn media(&self) -> ApiResult<&dyn MediaHost> {
        self.media.as_deref().ok_or(ApiError::Unavailable("Media hosting"))
    }

    pub fn payments(&self) -> ApiResult<&dyn PaymentGateway> {
        self.payments.as_deref().ok_or(ApiError::Unavailable("Payment gateway"))
    }

    pub fn mailer(&self) -> ApiResult<&dyn Mailer> {
        self.mailer.as_deref().ok_or(ApiError::Unavailable("Email delivery"))
    }

    pub fn oauth(&self) -> ApiResult<&dyn OAuthProvider> {
        self.oauth.as_deref().ok_or(ApiError::Unavailable("Google sign-in"))
    }
}

pub struct AppState {
    pub config: ServerConfig,
    pub signer: SessionSigner,
    pub integrations: Integrations,
    db: Arc<Mutex<Connection>>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        config: ServerConfig,
        signer: SessionSigner,
        conn: Connection,
        integrations: Integrations,
    ) -> SharedState {
        Arc::new(Self {
            config,
            signer,
            integrations,
            db: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs blocking SQLite work off the async executor.
    pub async fn with_db<T, F>(&self, work: F) -> ApiResult<T>
    where
        F: FnOnce(&Connection) -> ApiResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().unwrap_or_else(|poisoned| {
                warn!("event=db_lock module=http status=warn reason=poisoned");
                PoisonError::into_inner(poisoned)
            });
            work(&conn)
        })
        .await
        .map_err(|err| ApiError::Internal(format!("database task failed: {err}")))?
    }
}

/// Claims of the bearer session attached to the request.
pub struct SessionUser(pub SessionClaims);

impl FromRequestParts<SharedState> for SessionUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Unauthorized: missing session".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Unauthorized: missing session".to_string()))?;
        let claims = state.signer.verify(token, now_epoch_ms())?;
        Ok(Self(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealshub_core::open_db_in_memory;

    fn test_state() -> SharedState {
        let config = ServerConfig::from_lookup(|key| match key {
            "DEALSHUB_SESSION_SECRET" => Some("state-test-secret".to_string()),
            _ => None,
        })
        .unwrap();
        let signer = SessionSigner::new(config.session_secret.as_bytes().to_vec()).unwrap();
        let integrations = Integrations {
            media: None,
            payments: None,
            mailer: None,
            oauth: None,
            analyzer: Arc::new(HttpPageAnalyzer::new().unwrap()),
        };
        AppState::new(config, signer, open_db_in_memory().unwrap(), integrations)
    }

    #[tokio::test]
    async fn panicked_db_work_does_not_wedge_later_requests() {
        let state = test_state();
        let failed = state
            .with_db(|_conn: &Connection| -> ApiResult<()> { panic!("handler bug") })
            .await;
        assert!(matches!(failed, Err(ApiError::Internal(_))));
        assert!(state.db.is_poisoned());

        let one: i64 = state
            .with_db(|conn| {
                conn.query_row("SELECT 1;", [], |row| row.get(0))
                    .map_err(|err| ApiError::Internal(err.to_string()))
            })
            .await
            .unwrap();
        assert_eq!(one, 1);
    }

    #[test]
    fn missing_integrations_report_unavailable() {
        let state = test_state();
        assert!(matches!(
            state.integrations.payments(),
            Err(ApiError::Unavailable("Payment gateway"))
        ));
    }
}
