//! Capability token service.
//!
//! Stateless, symmetrically signed tokens carrying either email-only or
//! email+profile scope. The scope is a tagged union, never an open map, so
//! downstream code cannot treat an email-only token as profile-authorized.

use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::clock::Clock;
use super::error::TokenError;

/// Access scope asserted by a capability token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Scope {
    /// Holder has proven control of `email`, nothing more.
    Email { email: String },
    /// Holder may edit the one profile named here.
    Profile { email: String, profile_id: i64 },
}

impl Scope {
    pub fn email(&self) -> &str {
        match self {
            Scope::Email { email } => email,
            Scope::Profile { email, .. } => email,
        }
    }
}

/// Signed claims of a capability token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    #[serde(flatten)]
    pub scope: Scope,
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(secret: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            clock,
        }
    }

    /// Mint a token asserting only "this email is verified".
    pub fn mint_email_scoped(&self, email: &str, ttl: Duration) -> Result<String, anyhow::Error> {
        self.mint(Scope::Email {
            email: email.to_string(),
        }, ttl)
    }

    /// Mint a token additionally bound to one profile. Callers must have
    /// confirmed ownership first; the guard re-validates on every use.
    pub fn mint_profile_scoped(
        &self,
        email: &str,
        profile_id: i64,
        ttl: Duration,
    ) -> Result<String, anyhow::Error> {
        self.mint(
            Scope::Profile {
                email: email.to_string(),
                profile_id,
            },
            ttl,
        )
    }

    fn mint(&self, scope: Scope, ttl: Duration) -> Result<String, anyhow::Error> {
        let now = self.clock.now();
        let claims = Claims {
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            scope,
        };

        let header = Header::new(Algorithm::HS256);
        let token = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("failed to encode capability token: {}", e))?;
        Ok(token)
    }

    /// Verify signature and expiry together; both fail closed with
    /// distinct error kinds.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(TokenError::TokenExpired),
                _ => Err(TokenError::SignatureInvalid),
            },
        }
    }
}
