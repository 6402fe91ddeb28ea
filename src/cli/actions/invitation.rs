use super::user_facing;
use crate::{
    cli::globals::GlobalArgs,
    features::invitations::{InvitationController, InvitationStatus},
};
use anyhow::{bail, Result};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Decline,
}

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub link: String,
    pub decision: Decision,
}

/// A bare token has neither a query nor a path.
fn is_bare_token(link: &str) -> bool {
    !link.contains('?') && !link.contains('/')
}

/// # Errors
/// Returns an error when the invitation is invalid, expired or the server
/// refuses the decision.
pub async fn execute(args: Args) -> Result<()> {
    let ctx = args.globals.context()?;
    let link = args.link.trim();

    let controller = if is_bare_token(link) {
        InvitationController::new(ctx, Some(link), None)
    } else {
        InvitationController::from_link(ctx, link)
    };
    // Accepting finalizes on sync once signed in; declining must not.
    let mut controller = controller.with_auto_finalize(args.decision == Decision::Accept);
    controller.sync().await;

    if let Some(invitation) = controller.invitation() {
        let circle = invitation.circle_name.as_deref().unwrap_or("a circle");
        match invitation.invited_by.as_deref() {
            Some(by) => println!("{by} invited {} to join {circle}.", invitation.email),
            None => println!("{} is invited to join {circle}.", invitation.email),
        }
    }

    if controller.status() == &InvitationStatus::Pending {
        let navigation = match args.decision {
            Decision::Accept => controller.accept().await,
            Decision::Decline => controller.decline().await,
        }
        .map_err(user_facing)?;

        if let Some(navigation) = navigation {
            debug!(path = %navigation.path(), "authentication required");
            println!("Sign in with `kinfolk login`, then run this command again.");
            return Ok(());
        }
    }

    if let Some(navigation) = controller.take_redirect() {
        debug!(path = %navigation.path(), "invitation accepted");
    }
    match controller.status() {
        InvitationStatus::Accepted => println!("You joined the circle."),
        InvitationStatus::Declined => println!("Invitation declined."),
        InvitationStatus::Invalid => bail!("the link does not contain an invitation token"),
        InvitationStatus::Expired => {
            bail!("this invitation has expired or was already used; ask for a new one")
        }
        InvitationStatus::Error(message) => bail!("{message}"),
        InvitationStatus::Loading | InvitationStatus::Finalizing => {
            bail!("the invitation is being handled by another session, try again shortly")
        }
        InvitationStatus::Pending => bail!("the invitation could not be answered"),
    }
    Ok(())
}
