//! Session cookie manager.
//!
//! Binds a capability token to the one HTTP cookie the service owns.
//! Cookie lifetime always equals the token's remaining ttl, so the browser
//! and the token expire together.

use axum_extra::extract::cookie::{Cookie, SameSite};

/// Cookie carrying the capability token.
pub const SESSION_COOKIE: &str = "edit_token";

#[derive(Clone)]
pub struct SessionCookies {
    secure: bool,
}

impl SessionCookies {
    /// `secure` is set in production; local development runs over plain
    /// HTTP.
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    /// Build the session cookie for a freshly minted token.
    pub fn bind(&self, token: &str, max_age: chrono::Duration) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(time::Duration::seconds(max_age.num_seconds()))
            .build()
    }

    /// Build the clearing cookie: empty value, zero max-age. Setting it
    /// when no session exists is harmless, which is what makes logout
    /// idempotent.
    pub fn clear(&self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, ""))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(time::Duration::ZERO)
            .build()
    }
}
