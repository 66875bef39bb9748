//! Google OAuth 2.0 authorization-code flow.

use std::time::Duration;

use async_trait::async_trait;
use dealshub_core::model::user::GoogleProfile;
use log::info;
use reqwest::Client;
use serde::Deserialize;

use super::{IntegrationError, IntegrationResult, ensure_success, http_client};
use crate::config::GoogleConfig;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const GOOGLE_TIMEOUT: Duration = Duration::from_secs(15);
const SCOPES: &str = "openid email profile";

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Consent screen URL the browser is redirected to.
    fn authorization_url(&self) -> String;

    /// Exchanges the callback code and fetches the signed-in profile.
    async fn exchange_code(&self, code: &str) -> IntegrationResult<GoogleProfile>;
}

pub struct GoogleOAuth {
    client: Client,
    config: GoogleConfig,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    picture: Option<String>,
}

impl GoogleOAuth {
    pub fn new(config: GoogleConfig) -> IntegrationResult<Self> {
        Ok(Self {
            client: http_client(GOOGLE_TIMEOUT)?,
            config,
        })
    }
}

#[async_trait]
impl OAuthProvider for GoogleOAuth {
    fn authorization_url(&self) -> String {
        format!(
            "{AUTHORIZE_URL}?client_id={}&redirect_uri={}&response_type=code&scope={}",
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.callback_url),
            urlencoding::encode(SCOPES),
        )
    }

    async fn exchange_code(&self, code: &str) -> IntegrationResult<GoogleProfile> {
        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.callback_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;
        let token: TokenResponse = ensure_success("google", response)?.json().await?;

        let response = self
            .client
            .get(USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await?;
        let info: UserInfo = ensure_success("google", response)?.json().await?;
        let email = info.email.ok_or_else(|| IntegrationError::Decode {
            service: "google",
            message: "profile has no email".to_string(),
        })?;
        info!("event=oauth_exchange module=oauth status=ok provider=google");

        Ok(GoogleProfile {
            google_id: info.sub,
            email,
            display_name: info.name,
            first_name: info.given_name,
            last_name: info.family_name,
            photo: info.picture,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_url_encodes_callback_and_scopes() {
        let oauth = GoogleOAuth::new(GoogleConfig {
            client_id: "client-1".into(),
            client_secret: "secret".into(),
            callback_url: "http://localhost:5000/auth/google/callback".into(),
        })
        .unwrap();
        let url = oauth.authorization_url();
        assert!(url.starts_with(AUTHORIZE_URL));
        assert!(url.contains("client_id=client-1"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A5000%2Fauth%2Fgoogle%2Fcallback"));
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(!url.contains("secret"));
    }
}
