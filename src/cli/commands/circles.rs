use clap::{Arg, Command};

pub const ARG_CIRCLE_ID: &str = "circle-id";
pub const ARG_EMAIL: &str = "email";
pub const ARG_INVITATION_ID: &str = "invitation-id";

fn circle_arg() -> Arg {
    Arg::new(ARG_CIRCLE_ID).required(true)
}

pub fn with_subcommands(command: Command) -> Command {
    command.subcommand(
        Command::new("circles")
            .about("Circles you belong to")
            .subcommand_required(true)
            .subcommand(Command::new("list").about("List your circles"))
            .subcommand(
                Command::new("invite")
                    .about("Invite someone by email")
                    .arg(circle_arg())
                    .arg(Arg::new(ARG_EMAIL).required(true)),
            )
            .subcommand(
                Command::new("invitations")
                    .about("List invitations a circle has sent")
                    .arg(circle_arg()),
            )
            .subcommand(
                Command::new("revoke")
                    .about("Revoke a pending invitation")
                    .arg(circle_arg())
                    .arg(Arg::new(ARG_INVITATION_ID).required(true)),
            ),
    )
}
