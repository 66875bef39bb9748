//! Single-use magic-link tokens.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Magic links stay valid for ten minutes.
pub const MAGIC_TOKEN_TTL_MS: i64 = 10 * 60 * 1000;

/// Freshly issued token: the raw value goes in the link, the hash is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicToken {
    pub raw: String,
    pub hash: String,
    pub expires_at: i64,
}

impl MagicToken {
    /// Issues a 32-byte random token rendered as 64 hex chars.
    pub fn issue(now: i64) -> Self {
        let raw = format!(
            "{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        );
        let hash = hash_token(&raw);
        Self {
            raw,
            hash,
            expires_at: now + MAGIC_TOKEN_TTL_MS,
        }
    }
}

/// Lowercase hex SHA-256 digest of a raw token.
pub fn hash_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_hashes_to_stored_digest() {
        let token = MagicToken::issue(1_000);
        assert_eq!(token.raw.len(), 64);
        assert_eq!(token.hash, hash_token(&token.raw));
        assert_eq!(token.expires_at, 1_000 + MAGIC_TOKEN_TTL_MS);
        assert_ne!(MagicToken::issue(0).raw, token.raw);
    }

    #[test]
    fn hash_is_sha256_hex() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
