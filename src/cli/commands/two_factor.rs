use crate::features::two_factor::TwoFactorMethod;
use clap::{builder::ValueParser, Arg, Command};

pub const ARG_METHOD: &str = "method";
pub const ARG_PHONE: &str = "phone";

pub fn validator_method() -> ValueParser {
    ValueParser::from(|method: &str| method.parse::<TwoFactorMethod>())
}

fn method_arg() -> Arg {
    Arg::new(ARG_METHOD)
        .help("Two-factor method: totp, sms or email")
        .required(true)
        .value_parser(validator_method())
}

pub fn with_subcommands(command: Command) -> Command {
    command.subcommand(
        Command::new("2fa")
            .about("Two-factor authentication settings")
            .subcommand_required(true)
            .subcommand(Command::new("status").about("Show enabled methods"))
            .subcommand(
                Command::new("setup")
                    .about("Enable a method: request a code, confirm it, then keep the recovery codes")
                    .arg(method_arg())
                    .arg(
                        Arg::new(ARG_PHONE)
                            .long("phone")
                            .help("Phone number for SMS, prompted for when missing"),
                    ),
            )
            .subcommand(
                Command::new("preferred")
                    .about("Choose the method used at sign-in")
                    .arg(method_arg()),
            )
            .subcommand(
                Command::new("disable")
                    .about("Disable a method")
                    .arg(method_arg()),
            )
            .subcommand(
                Command::new("recovery-codes")
                    .about("Replace the recovery codes; the old ones stop working"),
            ),
    )
}
