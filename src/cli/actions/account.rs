use super::{prompt, user_facing};
use crate::{
    app_lib::{extract_error_message, GENERIC_ERROR},
    cli::globals::GlobalArgs,
    features::{
        auth::{self, types::UpdateProfileRequest, LoginOutcome},
        two_factor::{ChallengeState, LoginChallenge},
    },
};
use anyhow::{bail, Result};
use secrecy::ExposeSecret;
use tracing::debug;

const RESEND: &str = "resend";

#[derive(Debug)]
pub struct LoginArgs {
    pub globals: GlobalArgs,
    pub email: Option<String>,
    pub remember_device: bool,
    pub recovery: bool,
}

/// # Errors
/// Returns an error if the credentials are rejected or the second factor
/// cannot be completed.
pub async fn login(args: LoginArgs) -> Result<()> {
    let ctx = args.globals.context()?;

    let email = match args.email {
        Some(email) => email,
        None => prompt::line("Email").await?,
    };
    let password = prompt::secret("Password").await?;

    let outcome = auth::login(ctx.api(), &email, password.expose_secret())
        .await
        .map_err(user_facing)?;
    debug!(path = %outcome.navigation().path(), "password accepted");

    match outcome {
        LoginOutcome::Authenticated(user) => {
            println!("Signed in as {}", user.display_name());
        }
        LoginOutcome::TwoFactorRequired(challenge) => {
            verify_second_factor(challenge, args.remember_device, args.recovery).await?;
            if let Some(session) = ctx.session().current() {
                println!("Signed in as {}", session.user.display_name());
            }
        }
    }
    Ok(())
}

async fn verify_second_factor(
    mut challenge: LoginChallenge,
    remember_device: bool,
    recovery: bool,
) -> Result<()> {
    challenge.use_recovery_code(recovery);
    match challenge.message() {
        Some(message) => println!("{message}"),
        None => println!("Enter the code from your {}.", challenge.method().label()),
    }

    let resendable = challenge.method().supports_resend() && !challenge.is_recovery_mode();
    let label = if challenge.is_recovery_mode() {
        "Recovery code".to_string()
    } else if resendable {
        format!("Code (or \"{RESEND}\")")
    } else {
        "Code".to_string()
    };

    while challenge.state() == ChallengeState::AwaitingCode {
        let input = prompt::secret(&label).await?;

        if resendable && input.expose_secret().eq_ignore_ascii_case(RESEND) {
            match challenge.resend().await {
                Ok(()) => println!(
                    "{}",
                    challenge.message().unwrap_or("A new code is on its way.")
                ),
                Err(_) => eprintln!("{}", challenge.error().unwrap_or(GENERIC_ERROR)),
            }
            continue;
        }

        challenge.set_code(input.expose_secret());
        if challenge.submit(remember_device).await.is_err() {
            eprintln!("{}", challenge.error().unwrap_or(GENERIC_ERROR));
        }
    }

    if let Some(navigation) = challenge.take_redirect() {
        debug!(path = %navigation.path(), "challenge finished");
    }
    if challenge.state() == ChallengeState::Expired {
        bail!("sign-in expired, run `kinfolk login` again");
    }
    Ok(())
}

/// # Errors
/// Returns an error if the local session cannot be removed.
pub async fn logout(globals: &GlobalArgs) -> Result<()> {
    let ctx = globals.context()?;
    if !ctx.session().is_authenticated() {
        println!("Not signed in.");
        return Ok(());
    }
    match auth::logout(ctx.api()).await {
        Ok(()) => println!("Signed out."),
        Err(err) if !ctx.session().is_authenticated() => println!(
            "Signed out on this device. The server said: {}",
            extract_error_message(&err, GENERIC_ERROR)
        ),
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

#[derive(Debug)]
pub struct ProfileArgs {
    pub globals: GlobalArgs,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// # Errors
/// Returns an error if not signed in or the server rejects the change.
pub async fn profile(args: ProfileArgs) -> Result<()> {
    let ctx = args.globals.context()?;
    if !ctx.session().is_authenticated() {
        bail!("not signed in, run `kinfolk login`");
    }
    let request = UpdateProfileRequest {
        first_name: args.first_name.map(|name| name.trim().to_string()),
        last_name: args.last_name.map(|name| name.trim().to_string()),
    };
    let user = auth::update_profile(ctx.api(), &request)
        .await
        .map_err(user_facing)?;
    println!("Profile updated: {}", user.display_name());
    Ok(())
}

/// # Errors
/// Returns an error if the profile cannot be fetched.
pub async fn whoami(globals: &GlobalArgs) -> Result<()> {
    let ctx = globals.context()?;
    if !ctx.session().is_authenticated() {
        bail!("not signed in, run `kinfolk login`");
    }
    let user = auth::refresh_profile(ctx.api())
        .await
        .map_err(user_facing)?;
    println!("{} <{}>", user.display_name(), user.email);
    println!(
        "Two-factor: {}",
        if user.two_factor_enabled { "on" } else { "off" }
    );
    Ok(())
}
