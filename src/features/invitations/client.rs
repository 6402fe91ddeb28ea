//! Client wrappers for invitation endpoints.

use crate::{
    app_lib::{ApiClient, AppError},
    features::invitations::types::{
        InvitationDecision, OnboardingToken, OnboardingTokenRequest, StartOnboardingRequest,
        StartOnboardingResponse,
    },
};

/// Exchanges the invitation token from the link for an onboarding token.
pub async fn start_onboarding(
    api: &ApiClient,
    token: &str,
) -> Result<StartOnboardingResponse, AppError> {
    let request = StartOnboardingRequest {
        token: token.to_string(),
    };
    api.post_json("/users/circle-onboarding/", &request).await
}

/// Finalizes membership for the authenticated user. Some deployments answer
/// with an empty 204, hence the `Option`.
pub async fn accept_invitation(
    api: &ApiClient,
    onboarding_token: &OnboardingToken,
) -> Result<Option<InvitationDecision>, AppError> {
    let request = OnboardingTokenRequest {
        onboarding_token: onboarding_token.clone(),
    };
    api.post_json("/users/invitations/accept/", &request).await
}

pub async fn decline_invitation(
    api: &ApiClient,
    onboarding_token: &OnboardingToken,
) -> Result<Option<InvitationDecision>, AppError> {
    let request = OnboardingTokenRequest {
        onboarding_token: onboarding_token.clone(),
    };
    api.post_json("/users/invitations/decline/", &request).await
}
