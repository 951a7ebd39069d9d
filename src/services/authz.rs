//! Authorization guard and profile re-scoping.
//!
//! The guard decides whether a capability token may mutate a protected
//! profile. Ownership is re-read on every call rather than trusted from
//! issuance time, so a token scoped to a profile whose ownership has since
//! changed is rejected even though its signature and expiry are valid.

use std::sync::Arc;

use chrono::Duration;

use crate::store::AuthStore;

use super::error::{AuthzError, ForbiddenReason};
use super::token::{Claims, Scope, TokenService};

#[derive(Clone)]
pub struct AuthorizationGuard {
    tokens: TokenService,
    store: Arc<dyn AuthStore>,
}

impl AuthorizationGuard {
    pub fn new(tokens: TokenService, store: Arc<dyn AuthStore>) -> Self {
        Self { tokens, store }
    }

    /// May `token` mutate `target_profile_id`?
    ///
    /// An email-only token is never sufficient: the holder must complete
    /// profile selection first. A profile-scoped token must name exactly
    /// the target, and its email must still match the ownership anchor,
    /// case-insensitively.
    pub async fn authorize(
        &self,
        token: &str,
        target_profile_id: i64,
    ) -> Result<Claims, AuthzError> {
        let claims = self.tokens.verify(token)?;

        match &claims.scope {
            Scope::Email { .. } => {
                return Err(AuthzError::Forbidden(ForbiddenReason::SelectionRequired));
            }
            Scope::Profile { profile_id, .. } => {
                if *profile_id != target_profile_id {
                    return Err(AuthzError::Forbidden(ForbiddenReason::ScopeMismatch));
                }
            }
        }

        self.check_ownership(target_profile_id, claims.scope.email())
            .await?;
        Ok(claims)
    }

    /// Narrow any valid token down to one owned profile, minting a fresh
    /// profile-scoped token for the session cookie.
    pub async fn switch_profile(
        &self,
        current_token: &str,
        profile_id: i64,
        ttl: Duration,
    ) -> Result<String, AuthzError> {
        let claims = self.tokens.verify(current_token)?;
        let email = claims.scope.email().to_string();

        self.check_ownership(profile_id, &email).await?;

        let token = self
            .tokens
            .mint_profile_scoped(&email, profile_id, ttl)
            .map_err(AuthzError::Internal)?;
        Ok(token)
    }

    /// Mint a profile-scoped token for an email already proven by a
    /// one-time credential (the magic-link redemption path, where there is
    /// no prior token).
    pub async fn scope_verified_email(
        &self,
        email: &str,
        profile_id: i64,
        ttl: Duration,
    ) -> Result<String, AuthzError> {
        self.check_ownership(profile_id, email).await?;

        let token = self
            .tokens
            .mint_profile_scoped(email, profile_id, ttl)
            .map_err(AuthzError::Internal)?;
        Ok(token)
    }

    /// A missing profile, an unclaimed profile, and a profile owned by
    /// someone else are indistinguishable to the caller.
    async fn check_ownership(&self, profile_id: i64, email: &str) -> Result<(), AuthzError> {
        let anchor = self.store.find_ownership(profile_id).await?;
        match anchor {
            Some(anchor) if anchor.is_owned_by(email) => Ok(()),
            _ => Err(AuthzError::Forbidden(ForbiddenReason::NotOwner)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::clock::SystemClock;
    use crate::services::error::TokenError;
    use crate::store::MemoryStore;

    fn fixture() -> (AuthorizationGuard, TokenService, MemoryStore) {
        let store = MemoryStore::new();
        store.put_profile(7, Some("u@x.com"));
        store.put_profile(8, Some("other@x.com"));
        store.put_profile(9, None);

        let tokens = TokenService::new("test-secret", Arc::new(SystemClock));
        let guard = AuthorizationGuard::new(tokens.clone(), Arc::new(store.clone()));
        (guard, tokens, store)
    }

    #[tokio::test]
    async fn profile_scoped_token_authorizes_its_own_profile() {
        let (guard, tokens, _) = fixture();
        let token = tokens
            .mint_profile_scoped("u@x.com", 7, Duration::hours(1))
            .unwrap();

        let claims = guard.authorize(&token, 7).await.unwrap();
        assert_eq!(claims.scope.email(), "u@x.com");
    }

    #[tokio::test]
    async fn scope_mismatch_is_forbidden() {
        let (guard, tokens, _) = fixture();
        let token = tokens
            .mint_profile_scoped("u@x.com", 7, Duration::hours(1))
            .unwrap();

        let err = guard.authorize(&token, 8).await.unwrap_err();
        assert!(matches!(
            err,
            AuthzError::Forbidden(ForbiddenReason::ScopeMismatch)
        ));
    }

    #[tokio::test]
    async fn email_only_token_requires_profile_selection() {
        let (guard, tokens, _) = fixture();
        let token = tokens
            .mint_email_scoped("u@x.com", Duration::hours(1))
            .unwrap();

        let err = guard.authorize(&token, 7).await.unwrap_err();
        assert!(matches!(
            err,
            AuthzError::Forbidden(ForbiddenReason::SelectionRequired)
        ));
    }

    #[tokio::test]
    async fn ownership_change_invalidates_scoped_token() {
        let (guard, tokens, store) = fixture();
        let token = tokens
            .mint_profile_scoped("u@x.com", 7, Duration::hours(1))
            .unwrap();
        assert!(guard.authorize(&token, 7).await.is_ok());

        // Profile 7 is handed to someone else after issuance
        store.put_profile(7, Some("new-owner@x.com"));

        let err = guard.authorize(&token, 7).await.unwrap_err();
        assert!(matches!(
            err,
            AuthzError::Forbidden(ForbiddenReason::NotOwner)
        ));
    }

    #[tokio::test]
    async fn ownership_check_is_case_insensitive() {
        let (guard, tokens, store) = fixture();
        store.put_profile(7, Some("User@X.Com"));
        let token = tokens
            .mint_profile_scoped("user@x.com", 7, Duration::hours(1))
            .unwrap();

        assert!(guard.authorize(&token, 7).await.is_ok());
    }

    #[tokio::test]
    async fn tampered_token_is_unauthorized() {
        let (guard, tokens, _) = fixture();
        let token = tokens
            .mint_profile_scoped("u@x.com", 7, Duration::hours(1))
            .unwrap();
        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });

        let err = guard.authorize(&tampered, 7).await.unwrap_err();
        assert!(matches!(
            err,
            AuthzError::Unauthorized(TokenError::SignatureInvalid)
        ));
    }

    #[tokio::test]
    async fn switch_profile_narrows_any_valid_scope() {
        let (guard, tokens, _) = fixture();
        let email_token = tokens
            .mint_email_scoped("u@x.com", Duration::hours(1))
            .unwrap();

        let scoped = guard
            .switch_profile(&email_token, 7, Duration::hours(1))
            .await
            .unwrap();

        // The new token authorizes profile 7 and nothing else
        assert!(guard.authorize(&scoped, 7).await.is_ok());
        assert!(matches!(
            guard.authorize(&scoped, 8).await.unwrap_err(),
            AuthzError::Forbidden(ForbiddenReason::ScopeMismatch)
        ));
    }

    #[tokio::test]
    async fn switch_profile_refuses_non_owner() {
        let (guard, tokens, _) = fixture();
        let token = tokens
            .mint_email_scoped("u@x.com", Duration::hours(1))
            .unwrap();

        let err = guard
            .switch_profile(&token, 8, Duration::hours(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthzError::Forbidden(ForbiddenReason::NotOwner)
        ));
    }

    #[tokio::test]
    async fn unclaimed_and_missing_profiles_are_forbidden() {
        let (guard, tokens, _) = fixture();
        let token = tokens
            .mint_email_scoped("u@x.com", Duration::hours(1))
            .unwrap();

        for profile_id in [9, 404] {
            let err = guard
                .switch_profile(&token, profile_id, Duration::hours(1))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                AuthzError::Forbidden(ForbiddenReason::NotOwner)
            ));
        }
    }

    #[tokio::test]
    async fn scope_verified_email_checks_ownership() {
        let (guard, _, _) = fixture();

        assert!(guard
            .scope_verified_email("u@x.com", 7, Duration::hours(1))
            .await
            .is_ok());
        assert!(matches!(
            guard
                .scope_verified_email("u@x.com", 8, Duration::hours(1))
                .await
                .unwrap_err(),
            AuthzError::Forbidden(ForbiddenReason::NotOwner)
        ));
    }
}
