//! JWT Token Handler
//! Mission: Issue and verify signed, expiring session tokens

use crate::auth::models::{Account, Claims};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_TTL_HOURS: i64 = 72;

/// Symmetric algorithms accepted on verification. Anything else is rejected,
/// which rules out `none` and asymmetric key-confusion forgeries.
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid token")]
    Invalid,
    #[error("token expired")]
    Expired,
    #[error("token signing failed: {0}")]
    Signing(String),
}

/// JWT Handler for token operations
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_hours: i64,
    ttl: Duration,
}

impl JwtHandler {
    /// Create a new JWT handler. The secret must be non-empty and the lifetime
    /// positive and representable as a `chrono::Duration`.
    pub fn new(secret: &str, expiration_hours: i64) -> Result<Self, TokenError> {
        if secret.trim().is_empty() {
            return Err(TokenError::Signing("signing secret is empty".to_string()));
        }
        if expiration_hours <= 0 {
            return Err(TokenError::Signing(format!(
                "token lifetime must be positive, got {expiration_hours}h"
            )));
        }
        let ttl = Duration::try_hours(expiration_hours).ok_or_else(|| {
            TokenError::Signing(format!("token lifetime of {expiration_hours}h is out of range"))
        })?;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_hours,
            ttl,
        })
    }

    pub fn expiration_hours(&self) -> i64 {
        self.expiration_hours
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Issue a token for an account, stamped with the current time
    pub fn issue(&self, account: &Account) -> Result<String, TokenError> {
        self.issue_at(account, Utc::now())
    }

    pub fn issue_at(&self, account: &Account, now: DateTime<Utc>) -> Result<String, TokenError> {
        let expiration = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Signing("expiry timestamp overflow".to_string()))?;

        let claims = Claims {
            sub: account.id.to_string(),
            email: account.email.clone(),
            role: account.role,
            iat: now.timestamp(),
            exp: expiration.timestamp(),
        };

        debug!(
            account_id = %account.id,
            role = account.role.as_str(),
            ttl_hours = self.expiration_hours,
            "Issuing session token"
        );

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify a token against the current time
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify signature, algorithm and expiry; `exp` must be strictly after `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        // Expiry is checked below against the supplied clock, without leeway.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let decoded = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            debug!(error = %e, "Rejected session token");
            TokenError::Invalid
        })?;

        if decoded.claims.exp <= now.timestamp() {
            debug!(sub = %decoded.claims.sub, "Rejected expired session token");
            return Err(TokenError::Expired);
        }

        Ok(decoded.claims)
    }
}
