use crate::{
    app_lib::config::{default_state_dir, DEFAULT_TIMEOUT_SECONDS},
    cli::{
        actions::{
            account::{LoginArgs, ProfileArgs},
            circles, devices, invitation, two_factor, Action,
        },
        commands::{self, account as account_args, circles as circle_args, devices as device_args},
        globals::GlobalArgs,
    },
    features::two_factor::TwoFactorMethod,
};
use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use std::path::PathBuf;

fn globals(matches: &ArgMatches) -> Result<GlobalArgs> {
    let api_url = matches
        .get_one::<String>(commands::ARG_API_URL)
        .cloned()
        .context("missing required argument: --api-url")?;
    let state_dir = matches
        .get_one::<String>(commands::ARG_STATE_DIR)
        .map_or_else(default_state_dir, PathBuf::from);
    let timeout_seconds = matches
        .get_one::<u64>(commands::ARG_TIMEOUT)
        .copied()
        .unwrap_or(DEFAULT_TIMEOUT_SECONDS);

    Ok(GlobalArgs {
        api_url,
        state_dir,
        timeout_seconds,
    })
}

fn required(matches: &ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .with_context(|| format!("missing required argument: {name}"))
}

fn method(matches: &ArgMatches) -> Result<TwoFactorMethod> {
    matches
        .get_one::<TwoFactorMethod>(commands::two_factor::ARG_METHOD)
        .copied()
        .context("missing required argument: method")
}

/// # Errors
/// Returns an error if required arguments are missing or the subcommand is unknown.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let globals = globals(matches)?;

    match matches.subcommand() {
        Some(("login", sub_m)) => Ok(Action::Login(LoginArgs {
            globals,
            email: sub_m.get_one::<String>(account_args::ARG_EMAIL).cloned(),
            remember_device: sub_m.get_flag(account_args::ARG_REMEMBER_DEVICE),
            recovery: sub_m.get_flag(account_args::ARG_RECOVERY),
        })),
        Some(("logout", _)) => Ok(Action::Logout(globals)),
        Some(("whoami", _)) => Ok(Action::WhoAmI(globals)),
        Some(("profile", sub_m)) => Ok(Action::Profile(ProfileArgs {
            globals,
            first_name: sub_m.get_one::<String>(account_args::ARG_FIRST_NAME).cloned(),
            last_name: sub_m.get_one::<String>(account_args::ARG_LAST_NAME).cloned(),
        })),
        Some(("invitation", sub_m)) => {
            let (decision, args) = match sub_m.subcommand() {
                Some(("accept", args)) => (invitation::Decision::Accept, args),
                Some(("decline", args)) => (invitation::Decision::Decline, args),
                _ => return Err(anyhow!("unknown invitation command")),
            };
            Ok(Action::Invitation(invitation::Args {
                globals,
                link: required(args, commands::invitation::ARG_LINK)?,
                decision,
            }))
        }
        Some(("2fa", sub_m)) => {
            let command = match sub_m.subcommand() {
                Some(("status", _)) => two_factor::Command::Status,
                Some(("setup", args)) => two_factor::Command::Setup {
                    method: method(args)?,
                    phone: args
                        .get_one::<String>(commands::two_factor::ARG_PHONE)
                        .cloned(),
                },
                Some(("preferred", args)) => two_factor::Command::Preferred(method(args)?),
                Some(("disable", args)) => two_factor::Command::Disable(method(args)?),
                Some(("recovery-codes", _)) => two_factor::Command::RecoveryCodes,
                _ => return Err(anyhow!("unknown 2fa command")),
            };
            Ok(Action::TwoFactor(two_factor::Args { globals, command }))
        }
        Some(("devices", sub_m)) => {
            let command = match sub_m.subcommand() {
                Some(("list", _)) => devices::Command::List,
                Some(("remove", args)) => {
                    devices::Command::Remove(required(args, device_args::ARG_DEVICE_ID)?)
                }
                Some(("trust", args)) => {
                    devices::Command::Trust(required(args, device_args::ARG_NAME)?)
                }
                _ => return Err(anyhow!("unknown devices command")),
            };
            Ok(Action::Devices(devices::Args { globals, command }))
        }
        Some(("circles", sub_m)) => {
            let command = match sub_m.subcommand() {
                Some(("list", _)) => circles::Command::List,
                Some(("invite", args)) => circles::Command::Invite {
                    circle_id: required(args, circle_args::ARG_CIRCLE_ID)?,
                    email: required(args, circle_args::ARG_EMAIL)?,
                },
                Some(("invitations", args)) => circles::Command::Invitations {
                    circle_id: required(args, circle_args::ARG_CIRCLE_ID)?,
                },
                Some(("revoke", args)) => circles::Command::Revoke {
                    circle_id: required(args, circle_args::ARG_CIRCLE_ID)?,
                    invitation_id: required(args, circle_args::ARG_INVITATION_ID)?,
                },
                _ => return Err(anyhow!("unknown circles command")),
            };
            Ok(Action::Circles(circles::Args { globals, command }))
        }
        _ => Err(anyhow!("no command given, see --help")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dispatch(args: &[&str]) -> Action {
        temp_env::with_vars(
            [
                ("KINFOLK_API_URL", Some("https://api.kinfolk.app")),
                ("KINFOLK_STATE_DIR", Some("/tmp/kinfolk-test")),
                ("KINFOLK_TIMEOUT_SECONDS", None),
                ("KINFOLK_EMAIL", None),
            ],
            || {
                let mut argv = vec!["kinfolk"];
                argv.extend_from_slice(args);
                handler(&commands::new().get_matches_from(argv)).unwrap()
            },
        )
    }

    #[test]
    fn login_action() {
        match dispatch(&["login", "--email", "ada@example.com", "--recovery"]) {
            Action::Login(args) => {
                assert_eq!(args.email.as_deref(), Some("ada@example.com"));
                assert!(args.recovery);
                assert!(!args.remember_device);
                assert_eq!(args.globals.api_url, "https://api.kinfolk.app");
                assert_eq!(args.globals.state_dir, PathBuf::from("/tmp/kinfolk-test"));
                assert_eq!(args.globals.timeout_seconds, 10);
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn profile_action() {
        match dispatch(&["profile", "--first-name", "Augusta"]) {
            Action::Profile(args) => {
                assert_eq!(args.first_name.as_deref(), Some("Augusta"));
                assert!(args.last_name.is_none());
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn invitation_decline_action() {
        match dispatch(&["invitation", "decline", "abc123"]) {
            Action::Invitation(args) => {
                assert_eq!(args.decision, invitation::Decision::Decline);
                assert_eq!(args.link, "abc123");
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn two_factor_setup_action() {
        match dispatch(&["2fa", "setup", "totp"]) {
            Action::TwoFactor(two_factor::Args {
                command: two_factor::Command::Setup { method, phone },
                ..
            }) => {
                assert_eq!(method, TwoFactorMethod::Totp);
                assert!(phone.is_none());
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn devices_and_circles_actions() {
        assert!(matches!(
            dispatch(&["devices", "remove", "dev-1"]),
            Action::Devices(devices::Args {
                command: devices::Command::Remove(ref id),
                ..
            }) if id == "dev-1"
        ));
        assert!(matches!(
            dispatch(&["circles", "invite", "c1", "bo@example.com"]),
            Action::Circles(circles::Args {
                command: circles::Command::Invite { .. },
                ..
            })
        ));
    }

    #[test]
    fn missing_api_url_is_an_error() {
        temp_env::with_vars([("KINFOLK_API_URL", None::<&str>)], || {
            let matches = commands::new().get_matches_from(vec!["kinfolk", "whoami"]);
            let err = handler(&matches).unwrap_err();
            assert!(err.to_string().contains("--api-url"));
        });
    }

    #[test]
    fn global_flags_after_subcommand() {
        match dispatch(&["whoami", "--timeout", "3"]) {
            Action::WhoAmI(globals) => assert_eq!(globals.timeout_seconds, 3),
            other => panic!("unexpected action: {other:?}"),
        }
    }
}
