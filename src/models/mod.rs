//! Persisted entities for the authentication core.

mod credential;
mod ownership;

pub use credential::{CredentialKind, CredentialPolicy, OneTimeCredential};
pub use ownership::OwnershipAnchor;
