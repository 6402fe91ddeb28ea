use super::user_facing;
use crate::{
    cli::globals::GlobalArgs,
    features::circles::{self, types::CircleRole},
};
use anyhow::{bail, Result};

#[derive(Debug)]
pub enum Command {
    List,
    Invite { circle_id: String, email: String },
    Invitations { circle_id: String },
    Revoke { circle_id: String, invitation_id: String },
}

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub command: Command,
}

/// # Errors
/// Returns an error when not signed in or the server refuses the request.
pub async fn execute(args: Args) -> Result<()> {
    let ctx = args.globals.context()?;
    if !ctx.session().is_authenticated() {
        bail!("not signed in, run `kinfolk login`");
    }
    let api = ctx.api();

    match args.command {
        Command::List => {
            for circle in circles::list_circles(api).await.map_err(user_facing)? {
                let role = match circle.role {
                    CircleRole::Admin => "admin",
                    CircleRole::Member => "member",
                };
                println!(
                    "{}  {}  {role}, {} members",
                    circle.id, circle.name, circle.member_count
                );
            }
        }
        Command::Invite { circle_id, email } => {
            let invitation = circles::invite_member(api, &circle_id, &email)
                .await
                .map_err(user_facing)?;
            println!("Invitation sent to {}.", invitation.email);
        }
        Command::Invitations { circle_id } => {
            for invitation in circles::list_circle_invitations(api, &circle_id)
                .await
                .map_err(user_facing)?
            {
                println!(
                    "{}  {}  {:?}",
                    invitation.id, invitation.email, invitation.status
                );
            }
        }
        Command::Revoke {
            circle_id,
            invitation_id,
        } => {
            circles::revoke_invitation(api, &circle_id, &invitation_id)
                .await
                .map_err(user_facing)?;
            println!("Invitation revoked.");
        }
    }
    Ok(())
}
