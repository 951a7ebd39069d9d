//! Storage seam for the authentication core.
//!
//! The store holds one-time credentials (the only point of concurrent
//! contention in the system) and reads the ownership anchor off protected
//! profiles. Everything else the service does is stateless.

mod memory;
mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{CredentialKind, OneTimeCredential, OwnershipAnchor};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence operations required by the authentication core.
#[async_trait]
pub trait AuthStore: Send + Sync {
    /// Store a credential, replacing any existing live row for the same
    /// `(email, kind)`. Upholds the at-most-one-live-credential invariant.
    async fn replace_credential(&self, credential: OneTimeCredential) -> Result<(), StoreError>;

    /// Load the credential for `(email, kind)`, if any.
    async fn find_credential(
        &self,
        email: &str,
        kind: CredentialKind,
    ) -> Result<Option<OneTimeCredential>, StoreError>;

    /// Load a credential of `kind` by its secret digest.
    async fn find_credential_by_hash(
        &self,
        kind: CredentialKind,
        secret_hash: &str,
    ) -> Result<Option<OneTimeCredential>, StoreError>;

    /// Increment the attempt counter for `(email, kind)`.
    ///
    /// The increment itself is atomic, but the budget check reads the
    /// pre-increment value, so two racing verifications can admit one
    /// attempt beyond the nominal budget. The budget is approximate, not
    /// strict.
    async fn record_attempt(&self, email: &str, kind: CredentialKind) -> Result<(), StoreError>;

    /// Delete the credential for `(email, kind)`, if present.
    async fn delete_credential(&self, email: &str, kind: CredentialKind)
        -> Result<(), StoreError>;

    /// Read the ownership anchor for a profile. `None` when the profile
    /// does not exist.
    async fn find_ownership(&self, profile_id: i64) -> Result<Option<OwnershipAnchor>, StoreError>;

    /// Liveness probe for the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}
