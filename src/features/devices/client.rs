//! Client wrappers for `/auth/2fa/devices/`.

use crate::{
    app_lib::{path_segment, ApiClient, AppError},
    features::devices::types::{TrustDeviceRequest, TrustedDevice},
};

pub async fn list_trusted_devices(api: &ApiClient) -> Result<Vec<TrustedDevice>, AppError> {
    api.get_json::<Option<Vec<TrustedDevice>>>("/auth/2fa/devices/")
        .await
        .map(Option::unwrap_or_default)
}

pub async fn remove_trusted_device(api: &ApiClient, device_id: &str) -> Result<(), AppError> {
    let device_id = path_segment(device_id)?;
    api.delete(&format!("/auth/2fa/devices/{device_id}/")).await
}

/// Trusts the device making the request under `name`.
pub async fn trust_current_device(
    api: &ApiClient,
    request: &TrustDeviceRequest,
) -> Result<TrustedDevice, AppError> {
    api.post_json("/auth/2fa/devices/", request).await
}
