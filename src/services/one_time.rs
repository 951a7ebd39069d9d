//! One-time credential service: OTP issue/verify and magic-link tokens.
//!
//! Both proof-of-email mechanisms run through this one service with a
//! shared policy type and storage path. Secrets are hashed before storage
//! and compared in constant time.

use std::sync::Arc;

use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::models::{CredentialKind, CredentialPolicy, OneTimeCredential};
use crate::store::AuthStore;
use crate::utils::validation::normalize_email;

use super::clock::Clock;
use super::email::Notifier;
use super::error::{IssueError, VerifyError};

const CODE_LENGTH: usize = 6;
const LINK_SECRET_BYTES: usize = 24;

/// Proof that an email was verified through a one-time credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    pub email: String,
}

pub struct OneTimeCredentialService {
    store: Arc<dyn AuthStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    code_policy: CredentialPolicy,
    link_policy: CredentialPolicy,
    base_url: String,
}

impl OneTimeCredentialService {
    pub fn new(
        store: Arc<dyn AuthStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        code_policy: CredentialPolicy,
        link_policy: CredentialPolicy,
        base_url: String,
    ) -> Self {
        Self {
            store,
            clock,
            notifier,
            code_policy,
            link_policy,
            base_url,
        }
    }

    /// Issue a fresh 6-digit code for `email`, replacing any outstanding
    /// challenge. "Resend code" is just another call here; there is never
    /// more than one live code per email.
    ///
    /// The challenge is stored before dispatch is attempted, and dispatch
    /// failure does not undo it or fail the call.
    pub async fn request_code(&self, email: &str) -> Result<(), IssueError> {
        let email = normalize_email(email).ok_or(IssueError::InvalidInput)?;

        let code = generate_code();
        let credential = OneTimeCredential::new(
            email.clone(),
            CredentialKind::Code,
            digest(&code),
            self.clock.now(),
            &self.code_policy,
        );
        self.store.replace_credential(credential).await?;

        if let Err(e) = self.notifier.send_otp_code(&email, &code).await {
            tracing::error!(error = %e, email = %email, "OTP dispatch failed; challenge remains valid");
        }

        Ok(())
    }

    /// Verify a submitted code against the outstanding challenge.
    ///
    /// Checks run in a fixed order: existence, expiry (lazy, deletes the
    /// row), attempt budget, then the digest compare. Every compare, right
    /// or wrong, costs one attempt. An expired or exhausted challenge
    /// never consumes budget.
    pub async fn verify_code(&self, email: &str, code: &str) -> Result<Verified, VerifyError> {
        let email = normalize_email(email).ok_or(VerifyError::NotRequested)?;

        let credential = self
            .store
            .find_credential(&email, CredentialKind::Code)
            .await?
            .ok_or(VerifyError::NotRequested)?;

        if credential.is_expired(self.clock.now()) {
            self.store
                .delete_credential(&email, CredentialKind::Code)
                .await?;
            return Err(VerifyError::Expired);
        }

        if credential.is_exhausted(&self.code_policy) {
            return Err(VerifyError::RateLimited);
        }

        self.store
            .record_attempt(&email, CredentialKind::Code)
            .await?;

        if !digest_matches(&credential.secret_hash, code.trim()) {
            return Err(VerifyError::InvalidCode);
        }

        self.store
            .delete_credential(&email, CredentialKind::Code)
            .await?;

        Ok(Verified { email })
    }

    /// Issue a single-use link secret for an already-verified email and
    /// mail the absolute redeem URL. Returns the plaintext secret; only
    /// its digest is stored.
    pub async fn issue_link(&self, email: &str) -> Result<String, IssueError> {
        let email = normalize_email(email).ok_or(IssueError::InvalidInput)?;

        let secret = generate_link_secret();
        let credential = OneTimeCredential::new(
            email.clone(),
            CredentialKind::Link,
            digest(&secret),
            self.clock.now(),
            &self.link_policy,
        );
        self.store.replace_credential(credential).await?;

        let link_url = format!(
            "{}/provider/select?token={}",
            self.base_url,
            urlencoding::encode(&secret)
        );
        if let Err(e) = self.notifier.send_magic_link(&email, &link_url).await {
            tracing::error!(error = %e, email = %email, "Magic-link dispatch failed; link remains valid");
        }

        Ok(secret)
    }

    /// Redeem a link secret. Single-use: the row is deleted on first
    /// successful redemption, and lazily on detected expiry.
    pub async fn redeem_link(&self, secret: &str) -> Result<Verified, VerifyError> {
        let credential = self
            .store
            .find_credential_by_hash(CredentialKind::Link, &digest(secret.trim()))
            .await?
            .ok_or(VerifyError::NotRequested)?;

        if credential.is_expired(self.clock.now()) {
            self.store
                .delete_credential(&credential.email, CredentialKind::Link)
                .await?;
            return Err(VerifyError::Expired);
        }

        self.store
            .delete_credential(&credential.email, CredentialKind::Link)
            .await?;

        Ok(Verified {
            email: credential.email,
        })
    }
}

/// Random numeric code from a secure source.
fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| rng.gen_range(0..10).to_string())
        .collect()
}

/// High-entropy, unguessable link secret.
fn generate_link_secret() -> String {
    let mut rng = rand::thread_rng();
    let mut bytes = [0u8; LINK_SECRET_BYTES];
    rng.fill(&mut bytes);
    hex::encode(bytes)
}

/// One-way digest for storage; plaintext secrets never touch the store.
fn digest(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Constant-time comparison of a stored digest against a candidate secret.
fn digest_matches(stored_hash: &str, candidate: &str) -> bool {
    let candidate_hash = digest(candidate);
    stored_hash
        .as_bytes()
        .ct_eq(candidate_hash.as_bytes())
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::clock::ManualClock;
    use crate::services::email::{FailingNotifier, MockNotifier};
    use crate::store::MemoryStore;
    use chrono::{Duration, Utc};

    struct Fixture {
        service: OneTimeCredentialService,
        store: MemoryStore,
        clock: Arc<ManualClock>,
        notifier: Arc<MockNotifier>,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let notifier = Arc::new(MockNotifier::new());
        let service = OneTimeCredentialService::new(
            Arc::new(store.clone()),
            clock.clone(),
            notifier.clone(),
            CredentialPolicy {
                ttl: Duration::minutes(10),
                max_attempts: 5,
            },
            CredentialPolicy {
                ttl: Duration::minutes(30),
                max_attempts: 5,
            },
            "http://localhost:3000".to_string(),
        );
        Fixture {
            service,
            store,
            clock,
            notifier,
        }
    }

    fn sent_code(f: &Fixture) -> String {
        f.notifier.last_body().expect("a code was dispatched")
    }

    #[tokio::test]
    async fn request_normalizes_email_and_dispatches_code() {
        let f = fixture();
        f.service.request_code("  User@X.Com ").await.unwrap();

        let sent = f.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "user@x.com");
        assert_eq!(sent[0].body.len(), 6);
        assert!(sent[0].body.chars().all(|c| c.is_ascii_digit()));

        let stored = f
            .store
            .find_credential("user@x.com", CredentialKind::Code)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.attempts, 0);
        // hashed at rest
        assert_ne!(stored.secret_hash, sent[0].body);
    }

    #[tokio::test]
    async fn request_rejects_malformed_email() {
        let f = fixture();
        let err = f.service.request_code("not-an-email").await.unwrap_err();
        assert!(matches!(err, IssueError::InvalidInput));
    }

    #[tokio::test]
    async fn reissue_invalidates_previous_code() {
        let f = fixture();
        f.service.request_code("u@x.com").await.unwrap();
        let first_code = sent_code(&f);

        f.service.request_code("u@x.com").await.unwrap();
        let second_code = sent_code(&f);

        // The first code no longer verifies; only the replacement does
        if first_code != second_code {
            assert_eq!(
                f.service.verify_code("u@x.com", &first_code).await,
                Err(VerifyError::InvalidCode)
            );
        }
        assert!(f
            .service
            .verify_code("u@x.com", &second_code)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn correct_code_consumes_challenge() {
        let f = fixture();
        f.service.request_code("u@x.com").await.unwrap();
        let code = sent_code(&f);

        let verified = f.service.verify_code("u@x.com", &code).await.unwrap();
        assert_eq!(verified.email, "u@x.com");

        // Consumed: the same code is now "not requested"
        assert_eq!(
            f.service.verify_code("u@x.com", &code).await,
            Err(VerifyError::NotRequested)
        );
    }

    #[tokio::test]
    async fn wrong_code_costs_one_attempt_then_correct_code_succeeds() {
        let f = fixture();
        f.service.request_code("u@x.com").await.unwrap();
        let code = sent_code(&f);

        assert_eq!(
            f.service.verify_code("u@x.com", "000000").await,
            Err(VerifyError::InvalidCode)
        );
        let stored = f
            .store
            .find_credential("u@x.com", CredentialKind::Code)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.attempts, 1);

        let verified = f.service.verify_code("u@x.com", &code).await.unwrap();
        assert_eq!(verified.email, "u@x.com");
        assert!(f
            .store
            .find_credential("u@x.com", CredentialKind::Code)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn sixth_attempt_is_rate_limited_even_with_correct_code() {
        let f = fixture();
        f.service.request_code("u@x.com").await.unwrap();
        let code = sent_code(&f);

        for _ in 0..5 {
            assert_eq!(
                f.service.verify_code("u@x.com", "999999").await,
                Err(VerifyError::InvalidCode)
            );
        }

        assert_eq!(
            f.service.verify_code("u@x.com", &code).await,
            Err(VerifyError::RateLimited)
        );
        // No further mutation once exhausted
        let stored = f
            .store
            .find_credential("u@x.com", CredentialKind::Code)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.attempts, 5);
    }

    #[tokio::test]
    async fn expired_challenge_is_deleted_without_costing_budget() {
        let f = fixture();
        f.service.request_code("u@x.com").await.unwrap();
        let code = sent_code(&f);

        f.clock.advance(Duration::minutes(11));

        assert_eq!(
            f.service.verify_code("u@x.com", &code).await,
            Err(VerifyError::Expired)
        );
        assert!(f
            .store
            .find_credential("u@x.com", CredentialKind::Code)
            .await
            .unwrap()
            .is_none());

        // Row gone: the next attempt reports not-requested
        assert_eq!(
            f.service.verify_code("u@x.com", &code).await,
            Err(VerifyError::NotRequested)
        );
    }

    #[tokio::test]
    async fn unknown_email_reports_not_requested() {
        let f = fixture();
        assert_eq!(
            f.service.verify_code("nobody@x.com", "123456").await,
            Err(VerifyError::NotRequested)
        );
    }

    #[tokio::test]
    async fn dispatch_failure_still_stores_challenge() {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let service = OneTimeCredentialService::new(
            Arc::new(store.clone()),
            clock,
            Arc::new(FailingNotifier),
            CredentialPolicy {
                ttl: Duration::minutes(10),
                max_attempts: 5,
            },
            CredentialPolicy {
                ttl: Duration::minutes(30),
                max_attempts: 5,
            },
            "http://localhost:3000".to_string(),
        );

        service.request_code("u@x.com").await.unwrap();
        assert!(store
            .find_credential("u@x.com", CredentialKind::Code)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn link_is_single_use() {
        let f = fixture();
        let secret = f.service.issue_link("u@x.com").await.unwrap();

        // Stored hashed, and the redeem URL was mailed
        let stored = f
            .store
            .find_credential("u@x.com", CredentialKind::Link)
            .await
            .unwrap()
            .unwrap();
        assert_ne!(stored.secret_hash, secret);
        assert!(f.notifier.last_body().unwrap().contains("token="));

        let verified = f.service.redeem_link(&secret).await.unwrap();
        assert_eq!(verified.email, "u@x.com");

        assert_eq!(
            f.service.redeem_link(&secret).await,
            Err(VerifyError::NotRequested)
        );
    }

    #[tokio::test]
    async fn expired_link_is_rejected_and_removed() {
        let f = fixture();
        let secret = f.service.issue_link("u@x.com").await.unwrap();

        f.clock.advance(Duration::minutes(31));

        assert_eq!(
            f.service.redeem_link(&secret).await,
            Err(VerifyError::Expired)
        );
        assert!(f
            .store
            .find_credential("u@x.com", CredentialKind::Link)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn link_and_code_coexist_independently() {
        let f = fixture();
        f.service.request_code("u@x.com").await.unwrap();
        let code = sent_code(&f);
        let secret = f.service.issue_link("u@x.com").await.unwrap();

        // Issuing a link does not clobber the code challenge
        assert!(f.service.verify_code("u@x.com", &code).await.is_ok());
        assert!(f.service.redeem_link(&secret).await.is_ok());
    }
}
