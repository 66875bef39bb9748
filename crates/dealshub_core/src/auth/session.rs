//! HMAC-signed session tokens.
//!
//! Token layout: `base64url(claims json) "." hex(hmac_sha256(payload))`.

use crate::model::user::{Role, User, UserType};
use crate::model::UserId;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::error::Error;
use std::fmt::{Display, Formatter};

type HmacSha256 = Hmac<Sha256>;

/// Sessions last one hour.
pub const SESSION_TTL_MS: i64 = 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: UserId,
    pub email: String,
    pub role: Role,
    #[serde(rename = "type")]
    pub user_type: UserType,
    /// Expiry in epoch milliseconds.
    pub exp: i64,
}

impl SessionClaims {
    pub fn for_user(user: &User, now: i64) -> Self {
        Self {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            user_type: user.user_type,
            exp: now + SESSION_TTL_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Token is not `payload.signature`.
    Malformed,
    /// MAC does not match the payload.
    BadSignature,
    /// Token is past its expiry.
    Expired,
    /// Signing key was empty.
    EmptySecret,
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed session token"),
            Self::BadSignature => write!(f, "invalid session token signature"),
            Self::Expired => write!(f, "session token expired"),
            Self::EmptySecret => write!(f, "session secret must not be empty"),
        }
    }
}

impl Error for SessionError {}

/// Signs and verifies session tokens with a shared secret.
#[derive(Clone)]
pub struct SessionSigner {
    secret: Vec<u8>,
}

impl std::fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSigner").finish_non_exhaustive()
    }
}

impl SessionSigner {
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, SessionError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(SessionError::EmptySecret);
        }
        Ok(Self { secret })
    }

    pub fn sign(&self, claims: &SessionClaims) -> Result<String, SessionError> {
        let json = serde_json::to_vec(claims).map_err(|_| SessionError::Malformed)?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let signature = hex::encode(self.mac(payload.as_bytes())?.finalize().into_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    /// Checks signature then expiry against `now`.
    pub fn verify(&self, token: &str, now: i64) -> Result<SessionClaims, SessionError> {
        let (payload, signature) = token.split_once('.').ok_or(SessionError::Malformed)?;
        let signature = hex::decode(signature).map_err(|_| SessionError::Malformed)?;
        self.mac(payload.as_bytes())?
            .verify_slice(&signature)
            .map_err(|_| SessionError::BadSignature)?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| SessionError::Malformed)?;
        let claims: SessionClaims =
            serde_json::from_slice(&json).map_err(|_| SessionError::Malformed)?;
        if claims.exp <= now {
            return Err(SessionError::Expired);
        }
        Ok(claims)
    }

    fn mac(&self, payload: &[u8]) -> Result<HmacSha256, SessionError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|_| SessionError::EmptySecret)?;
        mac.update(payload);
        Ok(mac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn claims(exp: i64) -> SessionClaims {
        SessionClaims {
            sub: Uuid::new_v4(),
            email: "ada@example.com".into(),
            role: Role::User,
            user_type: UserType::Regular,
            exp,
        }
    }

    #[test]
    fn sign_then_verify_returns_claims() {
        let signer = SessionSigner::new("secret").unwrap();
        let original = claims(10_000);
        let token = signer.sign(&original).unwrap();
        assert_eq!(signer.verify(&token, 5_000).unwrap(), original);
    }

    #[test]
    fn verify_rejects_tampering_and_expiry() {
        let signer = SessionSigner::new("secret").unwrap();
        let token = signer.sign(&claims(10_000)).unwrap();

        let other = SessionSigner::new("other").unwrap();
        assert_eq!(other.verify(&token, 0), Err(SessionError::BadSignature));
        assert_eq!(signer.verify(&token, 10_000), Err(SessionError::Expired));
        assert_eq!(signer.verify("garbage", 0), Err(SessionError::Malformed));

        let (payload, signature) = token.split_once('.').unwrap();
        let forged = format!("{payload}x.{signature}");
        assert_eq!(signer.verify(&forged, 0), Err(SessionError::BadSignature));
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert_eq!(SessionSigner::new("").unwrap_err(), SessionError::EmptySecret);
    }
}
