use clap::{Arg, ArgAction, ArgGroup, Command};

pub const ARG_EMAIL: &str = "email";
pub const ARG_REMEMBER_DEVICE: &str = "remember-device";
pub const ARG_RECOVERY: &str = "recovery";
pub const ARG_FIRST_NAME: &str = "first-name";
pub const ARG_LAST_NAME: &str = "last-name";

pub fn with_subcommands(command: Command) -> Command {
    command
        .subcommand(
            Command::new("login")
                .about("Sign in with email and password; prompts for the second factor when required")
                .arg(
                    Arg::new(ARG_EMAIL)
                        .long("email")
                        .help("Account email, prompted for when missing")
                        .env("KINFOLK_EMAIL"),
                )
                .arg(
                    Arg::new(ARG_REMEMBER_DEVICE)
                        .long("remember-device")
                        .help("Trust this device so later sign-ins skip the second factor")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new(ARG_RECOVERY)
                        .long("recovery")
                        .help("Answer the second factor with a recovery code")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("logout").about("Sign out and forget the local session"))
        .subcommand(Command::new("whoami").about("Show the signed-in account"))
        .subcommand(
            Command::new("profile")
                .about("Change the name shown to circle members")
                .arg(Arg::new(ARG_FIRST_NAME).long("first-name"))
                .arg(Arg::new(ARG_LAST_NAME).long("last-name"))
                .group(
                    ArgGroup::new("name")
                        .args([ARG_FIRST_NAME, ARG_LAST_NAME])
                        .required(true)
                        .multiple(true),
                ),
        )
}
