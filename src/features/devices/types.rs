use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A browser or terminal allowed to skip the second factor until `expires_at`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedDevice {
    #[serde(alias = "id")]
    pub device_id: String,
    pub name: String,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// The device making the request.
    #[serde(default)]
    pub current: bool,
}

impl TrustedDevice {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct TrustDeviceRequest {
    pub name: String,
}
