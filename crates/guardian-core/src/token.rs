//! HMAC-signed user identity tokens.
//!
//! The upstream auth layer vouches for a user by signing
//! `user_id|issued_at` with a secret shared with Guardian.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::error::TokenError;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_TTL_SECONDS: i64 = 300;
const MAX_CLOCK_SKEW_SECONDS: i64 = 30;

/// Signed statement that a request acts for `user_id`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UserToken {
    pub user_id: Uuid,
    /// Hex HMAC-SHA256 of `user_id|issued_at`.
    pub signature: String,
    /// RFC 3339 issue time.
    pub issued_at: String,
}

impl UserToken {
    /// Sign a token for `user_id` issued now.
    pub fn create(user_id: Uuid, shared_secret: &str) -> Result<Self, TokenError> {
        Self::create_at(user_id, shared_secret, Utc::now())
    }

    pub fn create_at(
        user_id: Uuid,
        shared_secret: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<Self, TokenError> {
        if shared_secret.is_empty() {
            return Err(TokenError::Invalid("shared_secret must not be empty".to_string()));
        }

        let issued_at = issued_at.to_rfc3339();
        let signature = hex::encode(sign(user_id, &issued_at, shared_secret)?.finalize().into_bytes());

        Ok(Self {
            user_id,
            signature,
            issued_at,
        })
    }

    /// Verify signature and age. `ttl_seconds` of `None` means
    /// [`DEFAULT_TTL_SECONDS`].
    pub fn validate(&self, shared_secret: &str, ttl_seconds: Option<i64>) -> Result<(), TokenError> {
        let ttl = ttl_seconds.unwrap_or(DEFAULT_TTL_SECONDS);

        if self.signature.is_empty() {
            return Err(TokenError::Invalid("signature is empty".to_string()));
        }
        if self.issued_at.is_empty() {
            return Err(TokenError::Invalid("issued_at is empty".to_string()));
        }

        let sig_bytes = hex::decode(&self.signature)
            .map_err(|_| TokenError::Invalid("signature is not valid hex".to_string()))?;

        // Constant-time comparison
        sign(self.user_id, &self.issued_at, shared_secret)?
            .verify_slice(&sig_bytes)
            .map_err(|_| TokenError::Invalid("signature mismatch".to_string()))?;

        let issued_at: DateTime<Utc> = self
            .issued_at
            .parse()
            .map_err(|_| TokenError::Invalid("invalid issued_at timestamp".to_string()))?;

        let age = Utc::now().signed_duration_since(issued_at).num_seconds();

        if age > ttl {
            return Err(TokenError::Expired(format!("age: {}s, TTL: {}s", age, ttl)));
        }
        if age < -MAX_CLOCK_SKEW_SECONDS {
            return Err(TokenError::Invalid("issued_at is in the future".to_string()));
        }

        Ok(())
    }
}

fn sign(user_id: Uuid, issued_at: &str, secret: &str) -> Result<HmacSha256, TokenError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| TokenError::Invalid(format!("HMAC error: {}", e)))?;
    mac.update(format!("{}|{}", user_id, issued_at).as_bytes());
    Ok(mac)
}
