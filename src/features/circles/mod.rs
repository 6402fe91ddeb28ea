//! Circles the user belongs to and the invitations they send.

use crate::{
    app_lib::{path_segment, ApiClient, AppError},
    features::auth::login::{normalize_email, valid_email},
};
use tracing::{info, instrument};

pub mod types;

pub use types::{Circle, CircleInvitation, CircleRole, InvitationState, InviteMemberRequest};

pub async fn list_circles(api: &ApiClient) -> Result<Vec<Circle>, AppError> {
    api.get_json::<Option<Vec<Circle>>>("/circles/")
        .await
        .map(Option::unwrap_or_default)
}

/// Sends an invitation email for `circle_id`.
///
/// # Errors
/// Returns `AppError::Validation` for a malformed address, or the server's
/// refusal (for example `already_member`).
#[instrument(skip(api, email))]
pub async fn invite_member(
    api: &ApiClient,
    circle_id: &str,
    email: &str,
) -> Result<CircleInvitation, AppError> {
    let circle_id = path_segment(circle_id)?;
    let email = normalize_email(email);
    if !valid_email(&email) {
        return Err(AppError::Validation(
            "Enter a valid email address.".to_string(),
        ));
    }

    let invitation: CircleInvitation = api
        .post_json(
            &format!("/circles/{circle_id}/invitations/"),
            &InviteMemberRequest { email },
        )
        .await?;
    info!(invitation_id = %invitation.id, "invitation sent");
    Ok(invitation)
}

pub async fn list_circle_invitations(
    api: &ApiClient,
    circle_id: &str,
) -> Result<Vec<CircleInvitation>, AppError> {
    let circle_id = path_segment(circle_id)?;
    api.get_json::<Option<Vec<CircleInvitation>>>(&format!("/circles/{circle_id}/invitations/"))
        .await
        .map(Option::unwrap_or_default)
}

/// Revokes a pending invitation so its link stops working.
pub async fn revoke_invitation(
    api: &ApiClient,
    circle_id: &str,
    invitation_id: &str,
) -> Result<(), AppError> {
    let circle_id = path_segment(circle_id)?;
    let invitation_id = path_segment(invitation_id)?;
    api.delete(&format!("/circles/{circle_id}/invitations/{invitation_id}/"))
        .await
}
