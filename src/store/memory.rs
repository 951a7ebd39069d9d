//! In-memory store for tests and local development.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::models::{CredentialKind, OneTimeCredential, OwnershipAnchor};

use super::{AuthStore, StoreError};

/// Dashmap-backed store. Clones share the same underlying maps, so a test
/// can keep a handle to seed ownership anchors while the router holds the
/// trait object.
#[derive(Clone, Default)]
pub struct MemoryStore {
    credentials: Arc<DashMap<(String, CredentialKind), OneTimeCredential>>,
    owners: Arc<DashMap<i64, Option<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a profile row. Stands in for the external resource
    /// collaborator that creates profiles and sets their owner.
    pub fn put_profile(&self, profile_id: i64, owner_email: Option<&str>) {
        self.owners
            .insert(profile_id, owner_email.map(|e| e.to_string()));
    }
}

#[async_trait]
impl AuthStore for MemoryStore {
    async fn replace_credential(&self, credential: OneTimeCredential) -> Result<(), StoreError> {
        self.credentials
            .insert((credential.email.clone(), credential.kind), credential);
        Ok(())
    }

    async fn find_credential(
        &self,
        email: &str,
        kind: CredentialKind,
    ) -> Result<Option<OneTimeCredential>, StoreError> {
        Ok(self
            .credentials
            .get(&(email.to_string(), kind))
            .map(|entry| entry.value().clone()))
    }

    async fn find_credential_by_hash(
        &self,
        kind: CredentialKind,
        secret_hash: &str,
    ) -> Result<Option<OneTimeCredential>, StoreError> {
        Ok(self
            .credentials
            .iter()
            .find(|entry| entry.key().1 == kind && entry.value().secret_hash == secret_hash)
            .map(|entry| entry.value().clone()))
    }

    async fn record_attempt(&self, email: &str, kind: CredentialKind) -> Result<(), StoreError> {
        if let Some(mut entry) = self.credentials.get_mut(&(email.to_string(), kind)) {
            entry.attempts += 1;
        }
        Ok(())
    }

    async fn delete_credential(
        &self,
        email: &str,
        kind: CredentialKind,
    ) -> Result<(), StoreError> {
        self.credentials.remove(&(email.to_string(), kind));
        Ok(())
    }

    async fn find_ownership(
        &self,
        profile_id: i64,
    ) -> Result<Option<OwnershipAnchor>, StoreError> {
        Ok(self.owners.get(&profile_id).map(|entry| OwnershipAnchor {
            profile_id,
            owner_email: entry.value().clone(),
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
