//! Error type shared by the API client, storage and flow controllers, plus the
//! helpers that classify server failures and turn them into user-facing text.
//!
//! The backend answers failures with `{ "messages": [{ "i18n_key", "context" }] }`.
//! Classification inspects those keys and the HTTP status rather than the error
//! type, so expired invitation tokens can be told apart from generic failures.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Generic copy used when neither the server nor the catalog has anything better.
pub const GENERIC_ERROR: &str = "Something went wrong. Please try again.";

/// A structured message returned by the backend inside the response envelope.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiMessage {
    pub i18n_key: String,
    #[serde(default)]
    pub context: Map<String, Value>,
}

impl ApiMessage {
    #[must_use]
    pub fn new(i18n_key: impl Into<String>) -> Self {
        Self {
            i18n_key: i18n_key.into(),
            context: Map::new(),
        }
    }

    /// Returns the human readable text the server attached to this message, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        ["message", "detail"]
            .iter()
            .find_map(|field| self.context.get(*field).and_then(Value::as_str))
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    /// True when the key is `suffix` or ends with `.suffix`.
    #[must_use]
    pub fn key_matches(&self, suffix: &str) -> bool {
        self.i18n_key == suffix || self.i18n_key.ends_with(&format!(".{suffix}"))
    }
}

#[derive(Clone, Debug, Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Request failed ({status}): {message}")]
    Http {
        status: u16,
        message: String,
        messages: Vec<ApiMessage>,
    },
    #[error("Response error: {0}")]
    Parse(String),
    #[error("Request error: {0}")]
    Serialization(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("{0}")]
    Validation(String),
}

/// Coarse classification of a failure, used to pick terminal states and copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// The token behind the request is invalid, expired or no longer exists.
    Expired,
    Unauthorized,
    NotFound,
    Validation,
    Generic,
}

/// Message keys that mean the token used for the request is dead.
const EXPIRED_KEYS: &[&str] = &[
    "invalid_expired",
    "invitation_not_found",
    "partial_token_expired",
];

impl AppError {
    /// HTTP status of the failure, when the server answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Structured server messages carried by the failure.
    #[must_use]
    pub fn messages(&self) -> &[ApiMessage] {
        match self {
            Self::Http { messages, .. } => messages,
            _ => &[],
        }
    }

    /// True when any server message key matches `suffix`.
    #[must_use]
    pub fn has_key(&self, suffix: &str) -> bool {
        self.messages().iter().any(|m| m.key_matches(suffix))
    }

    #[must_use]
    pub fn class(&self) -> ErrorClass {
        if EXPIRED_KEYS.iter().any(|key| self.has_key(key)) {
            return ErrorClass::Expired;
        }

        match self {
            Self::Http { status: 410, .. } => ErrorClass::Expired,
            Self::Http { status: 401, .. } => ErrorClass::Unauthorized,
            Self::Http { status: 404, .. } => ErrorClass::NotFound,
            Self::Http {
                status: 400 | 422, ..
            }
            | Self::Validation(_) => ErrorClass::Validation,
            _ => ErrorClass::Generic,
        }
    }
}

/// Default copy for message keys the backend is known to send.
fn known_message(key: &str) -> Option<&'static str> {
    let key = key.rsplit('.').next().unwrap_or(key);
    let text = match key {
        "invalid_expired" => "This invitation link is invalid or has expired.",
        "invitation_not_found" => "This invitation no longer exists.",
        "email_mismatch" => "This invitation was sent to a different email address.",
        "already_member" => "You are already a member of this circle.",
        "invalid_code" => "The verification code is incorrect.",
        "code_expired" => "The verification code has expired. Request a new one.",
        "partial_token_expired" => "Your sign-in attempt expired. Please sign in again.",
        "invalid_credentials" => "Email or password is incorrect.",
        "invalid_phone_number" => "Enter a valid phone number.",
        "rate_limited" => "Too many attempts. Please wait a moment and try again.",
        "method_not_enabled" => "That verification method is not enabled.",
        _ => return None,
    };
    Some(text)
}

/// Extracts user-facing text from an error.
///
/// Structured server text wins, then catalog copy for a known key, then the
/// caller's fallback. Transport and local validation failures keep their own
/// wording because they are already meant for the user.
#[must_use]
pub fn extract_error_message(err: &AppError, fallback: &str) -> String {
    match err {
        AppError::Http { messages, .. } => messages
            .iter()
            .find_map(|m| m.text().map(str::to_string))
            .or_else(|| {
                messages
                    .iter()
                    .find_map(|m| known_message(&m.i18n_key).map(str::to_string))
            })
            .unwrap_or_else(|| fallback.to_string()),
        AppError::Timeout(message) | AppError::Validation(message) => message.clone(),
        AppError::Network(_) => "Unable to reach the server. Check your connection.".to_string(),
        _ => fallback.to_string(),
    }
}
