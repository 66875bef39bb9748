//! Server configuration loaded from environment variables.
//!
//! # Invariants
//! - Only the session secret is mandatory; every third-party block is
//!   optional and disables its endpoints when incomplete.
//! - Secrets never appear in `Debug` output.

use std::{env, fmt, str::FromStr, time::Duration};

use log::{info, warn};
use thiserror::Error;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_DB_PATH: &str = "dealshub.sqlite3";
const DEFAULT_PUBLIC_URL: &str = "http://localhost:5000";
const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
const DEFAULT_UPLOAD_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_MAGIC_LINK_FROM: &str = "Login <onboarding@resend.dev>";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {key} value: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
}

#[derive(Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub db_path: String,
    pub log_level: String,
    pub log_dir: Option<String>,
    /// Base URL of this API, used in emailed links.
    pub public_url: String,
    /// Browser app that receives login redirects.
    pub frontend_url: String,
    pub cors_origins: Vec<String>,
    pub session_secret: String,
    pub upload_timeout: Duration,
    pub cloudinary: Option<CloudinaryConfig>,
    pub paystack_secret_key: Option<String>,
    pub resend_api_key: Option<String>,
    pub magic_link_from: String,
    pub google: Option<GoogleConfig>,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("port", &self.port)
            .field("db_path", &self.db_path)
            .field("log_level", &self.log_level)
            .field("log_dir", &self.log_dir)
            .field("public_url", &self.public_url)
            .field("frontend_url", &self.frontend_url)
            .field("cors_origins", &self.cors_origins)
            .field("upload_timeout", &self.upload_timeout)
            .field("cloudinary", &self.cloudinary.is_some())
            .field("paystack", &self.paystack_secret_key.is_some())
            .field("resend", &self.resend_api_key.is_some())
            .field("google", &self.google.is_some())
            .finish()
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, treating blank values as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let session_secret =
            var("DEALSHUB_SESSION_SECRET").ok_or(ConfigError::Missing("DEALSHUB_SESSION_SECRET"))?;
        let port = parse_or("DEALSHUB_PORT", var("DEALSHUB_PORT"), DEFAULT_PORT)?;
        let upload_timeout_ms = parse_or(
            "DEALSHUB_UPLOAD_TIMEOUT_MS",
            var("DEALSHUB_UPLOAD_TIMEOUT_MS"),
            DEFAULT_UPLOAD_TIMEOUT_MS,
        )?;

        let cloudinary = match (
            var("CLOUDINARY_CLOUD_NAME"),
            var("CLOUDINARY_API_KEY"),
            var("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => {
                warn!("event=config_load module=config status=warn integration=cloudinary state=disabled");
                None
            }
        };
        let google = match (
            var("GOOGLE_CLIENT_ID"),
            var("GOOGLE_CLIENT_SECRET"),
            var("GOOGLE_CALLBACK_URL"),
        ) {
            (Some(client_id), Some(client_secret), Some(callback_url)) => Some(GoogleConfig {
                client_id,
                client_secret,
                callback_url,
            }),
            _ => {
                warn!("event=config_load module=config status=warn integration=google state=disabled");
                None
            }
        };

        let cors_origins = var("DEALSHUB_CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let config = Self {
            port,
            db_path: var("DEALSHUB_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            log_level: var("DEALSHUB_LOG_LEVEL")
                .unwrap_or_else(|| dealshub_core::default_log_level().to_string()),
            log_dir: var("DEALSHUB_LOG_DIR"),
            public_url: trim_slash(var("DEALSHUB_PUBLIC_URL"), DEFAULT_PUBLIC_URL),
            frontend_url: trim_slash(var("DEALSHUB_FRONTEND_URL"), DEFAULT_FRONTEND_URL),
            cors_origins,
            session_secret,
            upload_timeout: Duration::from_millis(upload_timeout_ms),
            cloudinary,
            paystack_secret_key: var("PAYSTACK_SECRET_KEY"),
            resend_api_key: var("RESEND_API_KEY"),
            magic_link_from: var("MAGIC_LINK_FROM")
                .unwrap_or_else(|| DEFAULT_MAGIC_LINK_FROM.to_string()),
            google,
        };
        info!(
            "event=config_load module=config status=ok port={} cors_origins={}",
            config.port,
            config.cors_origins.len()
        );
        Ok(config)
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|err: T::Err| ConfigError::Invalid {
            key,
            message: err.to_string(),
        }),
    }
}

fn trim_slash(raw: Option<String>, default: &str) -> String {
    raw.as_deref()
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_session_secret_fails() {
        let err = ServerConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DEALSHUB_SESSION_SECRET"));
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ServerConfig::from_lookup(lookup(&[("DEALSHUB_SESSION_SECRET", "s3cret")]))
            .unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.db_path, "dealshub.sqlite3");
        assert_eq!(config.upload_timeout, Duration::from_millis(30_000));
        assert!(config.cloudinary.is_none());
        assert!(config.google.is_none());
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn partial_integration_blocks_stay_disabled() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("DEALSHUB_SESSION_SECRET", "s3cret"),
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("CLOUDINARY_API_KEY", "key"),
        ]))
        .unwrap();
        assert!(config.cloudinary.is_none());
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("DEALSHUB_SESSION_SECRET", "s3cret"),
            ("DEALSHUB_CORS_ORIGINS", "http://a.test, ,http://b.test "),
            ("DEALSHUB_PUBLIC_URL", "https://api.test/"),
        ]))
        .unwrap();
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.public_url, "https://api.test");
    }

    #[test]
    fn invalid_port_is_reported() {
        let err = ServerConfig::from_lookup(lookup(&[
            ("DEALSHUB_SESSION_SECRET", "s3cret"),
            ("DEALSHUB_PORT", "http"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "DEALSHUB_PORT", .. }));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("DEALSHUB_SESSION_SECRET", "s3cret"),
            ("PAYSTACK_SECRET_KEY", "sk_live_hidden"),
        ]))
        .unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("sk_live_hidden"));
    }
}
