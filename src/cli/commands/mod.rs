use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};

pub mod account;
pub mod circles;
pub mod devices;
pub mod invitation;
pub mod two_factor;

pub const ARG_API_URL: &str = "api-url";
pub const ARG_STATE_DIR: &str = "state-dir";
pub const ARG_TIMEOUT: &str = "timeout";
pub const ARG_VERBOSITY: &str = "verbosity";

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("kinfolk")
        .about("Family circles: invitations, sign-in and two-factor settings")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new(ARG_API_URL)
                .long("api-url")
                .help("Base URL of the Kinfolk API, example: https://api.kinfolk.app/api")
                .env("KINFOLK_API_URL")
                .global(true),
        )
        .arg(
            Arg::new(ARG_STATE_DIR)
                .long("state-dir")
                .help("Directory for the session and pending invitation (default: $HOME/.kinfolk)")
                .env("KINFOLK_STATE_DIR")
                .global(true),
        )
        .arg(
            Arg::new(ARG_TIMEOUT)
                .long("timeout")
                .help("Request timeout in seconds")
                .env("KINFOLK_TIMEOUT_SECONDS")
                .default_value("10")
                .global(true)
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_VERBOSITY)
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("KINFOLK_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        );

    let command = account::with_subcommands(command);
    let command = invitation::with_subcommands(command);
    let command = two_factor::with_subcommands(command);
    let command = devices::with_subcommands(command);
    circles::with_subcommands(command)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const API: &str = "https://api.kinfolk.app";

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "kinfolk");
        assert_eq!(
            command.get_version().unwrap().to_string(),
            env!("CARGO_PKG_VERSION")
        );
        assert!(command
            .get_long_version()
            .unwrap()
            .to_string()
            .starts_with(env!("CARGO_PKG_VERSION")));
        for name in ["login", "logout", "whoami", "invitation", "2fa", "devices", "circles"] {
            assert!(command.find_subcommand(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn test_global_args() {
        temp_env::with_vars(
            [
                ("KINFOLK_API_URL", None::<&str>),
                ("KINFOLK_TIMEOUT_SECONDS", None),
                ("KINFOLK_LOG_LEVEL", None),
            ],
            || {
                let matches = new().get_matches_from(vec![
                    "kinfolk",
                    "--api-url",
                    API,
                    "--timeout",
                    "30",
                    "whoami",
                ]);
                assert_eq!(
                    matches.get_one::<String>(ARG_API_URL).cloned(),
                    Some(API.to_string())
                );
                assert_eq!(matches.get_one::<u64>(ARG_TIMEOUT).copied(), Some(30));
                assert_eq!(matches.get_one::<u8>(ARG_VERBOSITY).copied(), Some(0));
            },
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("KINFOLK_API_URL", Some(API)),
                ("KINFOLK_STATE_DIR", Some("/tmp/kinfolk")),
                ("KINFOLK_TIMEOUT_SECONDS", None),
                ("KINFOLK_LOG_LEVEL", Some("info")),
            ],
            || {
                let matches = new().get_matches_from(vec!["kinfolk", "logout"]);
                assert_eq!(
                    matches.get_one::<String>(ARG_STATE_DIR).cloned(),
                    Some("/tmp/kinfolk".to_string())
                );
                assert_eq!(matches.get_one::<u64>(ARG_TIMEOUT).copied(), Some(10));
                assert_eq!(matches.get_one::<u8>(ARG_VERBOSITY).copied(), Some(2));
            },
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        temp_env::with_vars([("KINFOLK_API_URL", Some(API))], || {
            let result = new().try_get_matches_from(vec!["kinfolk", "--timeout", "0", "whoami"]);
            assert!(result.is_err());
        });
    }

    #[test]
    fn test_check_log_level_env() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars(
                [
                    ("KINFOLK_LOG_LEVEL", Some(level)),
                    ("KINFOLK_API_URL", Some(API)),
                ],
                || {
                    let matches = new().get_matches_from(vec!["kinfolk", "whoami"]);
                    assert_eq!(
                        matches.get_one::<u8>(ARG_VERBOSITY).copied(),
                        Some(u8::try_from(index).unwrap())
                    );
                },
            );
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        for index in 0..5_usize {
            temp_env::with_vars(
                [
                    ("KINFOLK_LOG_LEVEL", None::<&str>),
                    ("KINFOLK_API_URL", Some(API)),
                ],
                || {
                    let mut args = vec!["kinfolk".to_string(), "whoami".to_string()];
                    if index > 0 {
                        args.push(format!("-{}", "v".repeat(index)));
                    }

                    let matches = new().get_matches_from(args);
                    assert_eq!(
                        matches.get_one::<u8>(ARG_VERBOSITY).copied(),
                        Some(u8::try_from(index).unwrap())
                    );
                },
            );
        }
    }
}
