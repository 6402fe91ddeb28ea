use clap::{Arg, Command};

pub const ARG_LINK: &str = "link";

fn link_arg() -> Arg {
    Arg::new(ARG_LINK)
        .help("Invitation link, or the bare token it carries")
        .required(true)
}

pub fn with_subcommands(command: Command) -> Command {
    command.subcommand(
        Command::new("invitation")
            .about("Answer an invitation to join a circle")
            .subcommand_required(true)
            .subcommand(
                Command::new("accept")
                    .about("Join the circle; sign in first if the command asks you to")
                    .arg(link_arg()),
            )
            .subcommand(
                Command::new("decline")
                    .about("Decline the invitation")
                    .arg(link_arg()),
            ),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn accept_takes_link() {
        let matches = with_subcommands(Command::new("kinfolk")).get_matches_from(vec![
            "kinfolk",
            "invitation",
            "accept",
            "https://kinfolk.app/invitations/accept?token=abc",
        ]);
        let (name, sub) = matches
            .subcommand_matches("invitation")
            .unwrap()
            .subcommand()
            .unwrap();
        assert_eq!(name, "accept");
        assert_eq!(
            sub.get_one::<String>(ARG_LINK).map(String::as_str),
            Some("https://kinfolk.app/invitations/accept?token=abc")
        );
    }

    #[test]
    fn link_is_required() {
        let result = with_subcommands(Command::new("kinfolk")).try_get_matches_from(vec![
            "kinfolk",
            "invitation",
            "decline",
        ]);
        assert!(result.is_err());
    }
}
