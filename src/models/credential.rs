//! One-time credential model.
//!
//! A single row type backs both proof-of-email mechanisms: the human-typed
//! 6-digit code and the high-entropy magic-link secret. Both are hashed at
//! rest and governed by the same policy type; at most one live row exists
//! per `(email, kind)` pair.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Which proof-of-email mechanism a credential belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// Human-typed 6-digit numeric code, verified by email + code.
    Code,
    /// High-entropy link secret, verified by the secret alone.
    Link,
}

impl CredentialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKind::Code => "code",
            CredentialKind::Link => "link",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "code" => Some(CredentialKind::Code),
            "link" => Some(CredentialKind::Link),
            _ => None,
        }
    }
}

/// Validity window and attempt budget for a credential kind.
#[derive(Debug, Clone, Copy)]
pub struct CredentialPolicy {
    pub ttl: Duration,
    pub max_attempts: i32,
}

/// One outstanding proof-of-email secret.
///
/// The plaintext secret is never stored; only its SHA-256 digest.
#[derive(Debug, Clone)]
pub struct OneTimeCredential {
    pub email: String,
    pub kind: CredentialKind,
    pub secret_hash: String,
    pub expires_at: DateTime<Utc>,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
}

impl OneTimeCredential {
    /// Create a fresh credential with zero attempts.
    pub fn new(
        email: String,
        kind: CredentialKind,
        secret_hash: String,
        now: DateTime<Utc>,
        policy: &CredentialPolicy,
    ) -> Self {
        Self {
            email,
            kind,
            secret_hash,
            expires_at: now + policy.ttl,
            attempts: 0,
            created_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_exhausted(&self, policy: &CredentialPolicy) -> bool {
        self.attempts >= policy.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CredentialPolicy {
        CredentialPolicy {
            ttl: Duration::minutes(10),
            max_attempts: 5,
        }
    }

    #[test]
    fn fresh_credential_is_live() {
        let now = Utc::now();
        let cred = OneTimeCredential::new(
            "u@x.com".to_string(),
            CredentialKind::Code,
            "abc".to_string(),
            now,
            &policy(),
        );
        assert!(!cred.is_expired(now));
        assert!(!cred.is_exhausted(&policy()));
    }

    #[test]
    fn expiry_is_strictly_after_window() {
        let now = Utc::now();
        let cred = OneTimeCredential::new(
            "u@x.com".to_string(),
            CredentialKind::Code,
            "abc".to_string(),
            now,
            &policy(),
        );
        assert!(!cred.is_expired(now + Duration::minutes(10)));
        assert!(cred.is_expired(now + Duration::minutes(10) + Duration::seconds(1)));
    }

    #[test]
    fn exhaustion_at_max_attempts() {
        let now = Utc::now();
        let mut cred = OneTimeCredential::new(
            "u@x.com".to_string(),
            CredentialKind::Code,
            "abc".to_string(),
            now,
            &policy(),
        );
        cred.attempts = 4;
        assert!(!cred.is_exhausted(&policy()));
        cred.attempts = 5;
        assert!(cred.is_exhausted(&policy()));
    }

    #[test]
    fn kind_round_trips_through_storage_codes() {
        assert_eq!(CredentialKind::parse("code"), Some(CredentialKind::Code));
        assert_eq!(CredentialKind::parse("link"), Some(CredentialKind::Link));
        assert_eq!(CredentialKind::parse("other"), None);
        assert_eq!(CredentialKind::Code.as_str(), "code");
    }
}
