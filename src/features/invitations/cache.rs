//! Storage mirror of the invitation being accepted, so the flow survives a
//! trip through login or signup and is shared by every open handle.

use crate::{
    app_lib::AppError,
    features::invitations::types::{Invitation, OnboardingToken},
    storage::{self, Storage},
};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const INVITATION_CACHE_KEY: &str = "kinfolk.pending_invitation";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedInvitation {
    /// Invitation token the entry was created from.
    pub source_token: String,
    #[serde(default)]
    pub invitation: Option<Invitation>,
    #[serde(default)]
    pub onboarding_token: Option<OnboardingToken>,
}

impl fmt::Debug for CachedInvitation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedInvitation")
            .field("source_token", &"***")
            .field("invitation", &self.invitation)
            .field("onboarding_token", &self.onboarding_token)
            .finish()
    }
}

impl CachedInvitation {
    #[must_use]
    pub fn matches(&self, token: &str) -> bool {
        self.source_token == token
    }
}

/// # Errors
/// Returns `AppError::Storage` when the entry cannot be read.
pub fn load(storage: &dyn Storage) -> Result<Option<CachedInvitation>, AppError> {
    storage::get_json(storage, INVITATION_CACHE_KEY)
}

/// # Errors
/// Returns `AppError::Storage` when the entry cannot be written.
pub fn store(storage: &dyn Storage, entry: &CachedInvitation) -> Result<(), AppError> {
    storage::set_json(storage, INVITATION_CACHE_KEY, entry)
}

/// Drops the entry, and with it the onboarding token.
///
/// # Errors
/// Returns `AppError::Storage` when the entry cannot be removed.
pub fn clear(storage: &dyn Storage) -> Result<(), AppError> {
    storage.remove(INVITATION_CACHE_KEY)
}

/// Decodes a raw storage value as seen in a change event.
#[must_use]
pub fn decode(raw: Option<&str>) -> Option<CachedInvitation> {
    raw.and_then(|raw| serde_json::from_str(raw).ok())
}
