//! Passwordless sign-in use-cases.
//!
//! # Responsibility
//! - Issue and redeem single-use magic-link tokens.
//! - Exchange verified identities for signed session tokens.
//!
//! # Invariants
//! - Only the SHA-256 digest of a magic token is persisted.
//! - A magic token is redeemable once and only before it expires.
//! - Raw tokens and session tokens are never logged.

use crate::auth::{hash_token, MagicToken, SessionClaims, SessionError, SessionSigner};
use crate::model::user::{normalize_email, GoogleProfile, User};
use crate::model::{now_epoch_ms, ValidationError};
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoError;
use crate::service::user_service::upsert_google_profile;
use crate::service::ServiceError;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

#[derive(Debug)]
pub enum AuthServiceError {
    Validation(ValidationError),
    /// Magic token is unknown, already used or expired.
    InvalidMagicToken,
    Session(SessionError),
    Account(ServiceError),
}

impl Display for AuthServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidMagicToken => write!(f, "invalid or expired magic link"),
            Self::Session(err) => write!(f, "{err}"),
            Self::Account(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AuthServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Session(err) => Some(err),
            Self::Account(err) => Some(err),
            Self::InvalidMagicToken => None,
        }
    }
}

impl From<ValidationError> for AuthServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<SessionError> for AuthServiceError {
    fn from(value: SessionError) -> Self {
        Self::Session(value)
    }
}

impl From<RepoError> for AuthServiceError {
    fn from(value: RepoError) -> Self {
        Self::Account(value.into())
    }
}

impl From<ServiceError> for AuthServiceError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::Validation(err) => Self::Validation(err),
            other => Self::Account(other),
        }
    }
}

/// Magic link issued for one address. `token` must only travel in the email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedMagicLink {
    pub user: User,
    pub token: String,
    pub expires_at: i64,
}

/// Signed session handed back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub claims: SessionClaims,
    pub user: User,
}

pub struct AuthService<R: UserRepository> {
    users: R,
    signer: SessionSigner,
}

impl<R: UserRepository> AuthService<R> {
    pub fn new(users: R, signer: SessionSigner) -> Self {
        Self { users, signer }
    }

    /// Finds or creates the account for `email` and stores a fresh token digest.
    pub fn request_magic_link(&self, email: &str) -> Result<IssuedMagicLink, AuthServiceError> {
        let email = normalize_email(email)?;
        let now = now_epoch_ms();
        let user = match self.users.find_by_email(&email)? {
            Some(user) => user,
            None => {
                let user = User::new(Uuid::new_v4(), &email, now)?;
                self.users.insert_user(&user)?;
                info!("event=magic_link_signup module=auth status=ok user_id={}", user.id);
                user
            }
        };

        let token = MagicToken::issue(now);
        self.users
            .set_magic_token(user.id, &token.hash, token.expires_at)?;
        info!(
            "event=magic_link_issue module=auth status=ok user_id={}",
            user.id
        );
        Ok(IssuedMagicLink {
            user,
            token: token.raw,
            expires_at: token.expires_at,
        })
    }

    /// Redeems a magic token and opens a session.
    pub fn verify_magic_link(&self, raw_token: &str) -> Result<Session, AuthServiceError> {
        let raw_token = raw_token.trim();
        if raw_token.is_empty() {
            return Err(ValidationError::Required("token").into());
        }
        let now = now_epoch_ms();
        let Some(user) = self
            .users
            .consume_magic_token(&hash_token(raw_token), now)?
        else {
            warn!("event=magic_link_verify module=auth status=error reason=invalid_token");
            return Err(AuthServiceError::InvalidMagicToken);
        };
        info!(
            "event=magic_link_verify module=auth status=ok user_id={}",
            user.id
        );
        self.open_session(user, now)
    }

    /// Upserts the Google identity and opens a session.
    pub fn login_with_google(&self, profile: GoogleProfile) -> Result<Session, AuthServiceError> {
        let user = upsert_google_profile(&self.users, profile)?;
        self.open_session(user, now_epoch_ms())
    }

    /// Validates a bearer token.
    pub fn authenticate(&self, token: &str) -> Result<SessionClaims, AuthServiceError> {
        Ok(self.signer.verify(token, now_epoch_ms())?)
    }

    fn open_session(&self, user: User, now: i64) -> Result<Session, AuthServiceError> {
        let claims = SessionClaims::for_user(&user, now);
        let token = self.signer.sign(&claims)?;
        Ok(Session {
            token,
            claims,
            user,
        })
    }
}
