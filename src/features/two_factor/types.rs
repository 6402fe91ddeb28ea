//! Request and response types for two-factor endpoints. Partial tokens, TOTP
//! secrets and codes travel in these payloads; `Debug` output is redacted.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TwoFactorMethod {
    Totp,
    Sms,
    Email,
}

impl TwoFactorMethod {
    pub const ALL: [Self; 3] = [Self::Totp, Self::Sms, Self::Email];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Totp => "totp",
            Self::Sms => "sms",
            Self::Email => "email",
        }
    }

    /// SMS and email codes are delivered by the server and can be re-sent;
    /// authenticator codes are generated on the user's device.
    #[must_use]
    pub const fn supports_resend(self) -> bool {
        matches!(self, Self::Sms | Self::Email)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Totp => "authenticator app",
            Self::Sms => "text message",
            Self::Email => "email",
        }
    }
}

impl fmt::Display for TwoFactorMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TwoFactorMethod {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "totp" | "app" | "authenticator" => Ok(Self::Totp),
            "sms" | "phone" => Ok(Self::Sms),
            "email" => Ok(Self::Email),
            other => Err(format!("unknown two-factor method: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodStatus {
    pub method: TwoFactorMethod,
    #[serde(default)]
    pub enabled: bool,
    /// Masked phone number or email address the codes go to.
    #[serde(default)]
    pub destination: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwoFactorStatus {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub preferred_method: Option<TwoFactorMethod>,
    #[serde(default)]
    pub methods: Vec<MethodStatus>,
    #[serde(default)]
    pub recovery_codes_remaining: u32,
}

impl TwoFactorStatus {
    #[must_use]
    pub fn is_enabled(&self, method: TwoFactorMethod) -> bool {
        self.methods
            .iter()
            .any(|status| status.method == method && status.enabled)
    }

    #[must_use]
    pub fn enabled_methods(&self) -> Vec<TwoFactorMethod> {
        self.methods
            .iter()
            .filter(|status| status.enabled)
            .map(|status| status.method)
            .collect()
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SetupStartRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

/// What the intro step issued: a TOTP secret to enroll, or the destination a
/// code was sent to.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SetupChallenge {
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub otpauth_url: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl fmt::Debug for SetupChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetupChallenge")
            .field("secret", &self.secret.as_ref().map(|_| "***"))
            .field("otpauth_url", &self.otpauth_url.as_ref().map(|_| "***"))
            .field("destination", &self.destination)
            .field("message", &self.message)
            .finish()
    }
}

#[derive(Clone, Serialize)]
pub struct CodeRequest {
    pub code: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct RecoveryCodesResponse {
    #[serde(default)]
    pub recovery_codes: Vec<String>,
}

#[derive(Clone, Serialize)]
pub struct LoginVerifyRequest {
    pub partial_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_code: Option<String>,
    pub remember_device: bool,
}

impl fmt::Debug for LoginVerifyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginVerifyRequest")
            .field("partial_token", &"***")
            .field("recovery", &self.recovery_code.is_some())
            .field("remember_device", &self.remember_device)
            .finish()
    }
}

#[derive(Clone, Serialize)]
pub struct PartialTokenRequest {
    pub partial_token: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ResendResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PreferredMethodRequest {
    pub method: TwoFactorMethod,
}
