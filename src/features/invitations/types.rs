//! Invitation payloads. Invitation and onboarding tokens are credentials:
//! their `Debug` output is redacted and they are never logged.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: String,
    pub email: String,
    /// The invited email already has an account, so the user should sign in
    /// rather than sign up.
    #[serde(default)]
    pub existing_user: bool,
    #[serde(default)]
    pub circle_name: Option<String>,
    #[serde(default)]
    pub invited_by: Option<String>,
}

/// Short-lived credential that links the invitation to an account.
#[derive(Clone)]
pub struct OnboardingToken(SecretString);

impl OnboardingToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for OnboardingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OnboardingToken(***)")
    }
}

impl PartialEq for OnboardingToken {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for OnboardingToken {}

impl Serialize for OnboardingToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.expose())
    }
}

impl<'de> Deserialize<'de> for OnboardingToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

#[derive(Clone, Serialize)]
pub struct StartOnboardingRequest {
    pub token: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct StartOnboardingResponse {
    pub invitation: Invitation,
    pub onboarding_token: OnboardingToken,
}

#[derive(Clone, Serialize)]
pub struct OnboardingTokenRequest {
    pub onboarding_token: OnboardingToken,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct InvitationDecision {
    #[serde(default)]
    pub circle_id: Option<String>,
    #[serde(default)]
    pub circle_name: Option<String>,
}
