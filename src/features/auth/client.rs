//! Client wrappers for auth and profile endpoints.

use crate::{
    app_lib::{ApiClient, AppError},
    features::auth::types::{
        LoginRequest, LoginResponse, SessionResponse, SocialLoginRequest, UpdateProfileRequest,
        UserProfile,
    },
};

/// Password login. The answer is either a session or a 2FA challenge.
/// Must never log the request.
pub async fn login(api: &ApiClient, request: &LoginRequest) -> Result<LoginResponse, AppError> {
    api.post_json("/auth/login/", request).await
}

/// Invalidates the current session on the server.
pub async fn logout(api: &ApiClient) -> Result<(), AppError> {
    api.post_empty("/auth/logout/").await
}

/// Fetch the authenticated user's profile.
pub async fn fetch_profile(api: &ApiClient) -> Result<UserProfile, AppError> {
    api.get_json("/users/me/").await
}

pub async fn update_profile(
    api: &ApiClient,
    request: &UpdateProfileRequest,
) -> Result<UserProfile, AppError> {
    api.patch_json("/users/me/", request).await
}

/// Exchanges an OAuth authorization code for a session.
pub async fn social_login(
    api: &ApiClient,
    provider: &str,
    request: &SocialLoginRequest,
) -> Result<SessionResponse, AppError> {
    api.post_json(&format!("/auth/social/{provider}/"), request)
        .await
}
