//! Client wrappers for `/auth/2fa/...` endpoints. Codes and partial tokens
//! pass through here and must never be logged.

use crate::{
    app_lib::{ApiClient, AppError},
    features::{
        auth::types::SessionResponse,
        two_factor::types::{
            CodeRequest, LoginVerifyRequest, PartialTokenRequest, PreferredMethodRequest,
            RecoveryCodesResponse, ResendResponse, SetupChallenge, SetupStartRequest,
            TwoFactorMethod, TwoFactorStatus,
        },
    },
};

pub async fn status(api: &ApiClient) -> Result<TwoFactorStatus, AppError> {
    api.get_json("/auth/2fa/status/").await
}

/// Issues the setup challenge: reveals a TOTP secret or sends an SMS/email code.
pub async fn setup_start(
    api: &ApiClient,
    method: TwoFactorMethod,
    request: &SetupStartRequest,
) -> Result<SetupChallenge, AppError> {
    api.post_json(&format!("/auth/2fa/{method}/setup/"), request)
        .await
}

/// Confirms setup with the first code and returns one-time recovery codes.
pub async fn setup_verify(
    api: &ApiClient,
    method: TwoFactorMethod,
    request: &CodeRequest,
) -> Result<RecoveryCodesResponse, AppError> {
    api.post_json(&format!("/auth/2fa/{method}/verify/"), request)
        .await
}

pub async fn setup_resend(
    api: &ApiClient,
    method: TwoFactorMethod,
) -> Result<SetupChallenge, AppError> {
    api.post_empty(&format!("/auth/2fa/{method}/resend/")).await
}

/// Completes a login challenge; on success the server returns a full session.
pub async fn verify_login(
    api: &ApiClient,
    request: &LoginVerifyRequest,
) -> Result<SessionResponse, AppError> {
    api.post_json("/auth/2fa/verify/", request).await
}

/// Re-sends the login code for a partial token without issuing a new one.
pub async fn resend_login_code(
    api: &ApiClient,
    request: &PartialTokenRequest,
) -> Result<ResendResponse, AppError> {
    api.post_json("/auth/2fa/resend/", request).await
}

pub async fn set_preferred_method(
    api: &ApiClient,
    request: &PreferredMethodRequest,
) -> Result<TwoFactorStatus, AppError> {
    api.post_json("/auth/2fa/preferred/", request).await
}

pub async fn disable_method(
    api: &ApiClient,
    method: TwoFactorMethod,
) -> Result<TwoFactorStatus, AppError> {
    api.post_empty(&format!("/auth/2fa/{method}/disable/")).await
}

/// Replaces every recovery code; the old ones stop working.
pub async fn regenerate_recovery_codes(api: &ApiClient) -> Result<RecoveryCodesResponse, AppError> {
    api.post_empty("/auth/2fa/recovery-codes/regenerate/").await
}
