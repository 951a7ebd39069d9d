//! Ownership anchor exposed by protected resources.

use serde::{Deserialize, Serialize};

/// The single field a protected resource must expose to this core: which
/// email owns it. Set once by the external resource collaborator at
/// creation; read-only here. `owner_email` is `None` for unclaimed
/// profiles, which can never be authorized against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipAnchor {
    pub profile_id: i64,
    pub owner_email: Option<String>,
}

impl OwnershipAnchor {
    /// Case-insensitive ownership check against a token email.
    pub fn is_owned_by(&self, email: &str) -> bool {
        self.owner_email
            .as_deref()
            .map(|owner| owner.eq_ignore_ascii_case(email))
            .unwrap_or(false)
    }
}
