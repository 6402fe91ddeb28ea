//! Request and response types for auth endpoints. Passwords and tokens pass
//! through these payloads, so their `Debug` output is redacted.

use crate::features::two_factor::types::TwoFactorMethod;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub two_factor_enabled: bool,
}

impl UserProfile {
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let name = name.trim();
        if name.is_empty() {
            self.email.clone()
        } else {
            name.to_string()
        }
    }
}

/// An authenticated session. The access token is only exposed when attached
/// to a request.
#[derive(Clone, Debug)]
pub struct Session {
    pub access_token: SecretString,
    pub user: UserProfile,
}

/// Session payload as the API returns it.
#[derive(Clone, Deserialize)]
pub struct SessionResponse {
    pub access_token: String,
    pub user: UserProfile,
}

impl From<SessionResponse> for Session {
    fn from(response: SessionResponse) -> Self {
        Self {
            access_token: SecretString::from(response.access_token),
            user: response.user,
        }
    }
}

#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Login answer: either a full session or a second-factor challenge.
#[derive(Clone, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub requires_2fa: bool,
    pub partial_token: Option<String>,
    pub method: Option<TwoFactorMethod>,
    pub message: Option<String>,
    pub access_token: Option<String>,
    pub user: Option<UserProfile>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

#[derive(Clone, Serialize)]
pub struct SocialLoginRequest {
    pub code: String,
    pub redirect_uri: String,
}
