use super::{prompt, user_facing};
use crate::{
    app_lib::GENERIC_ERROR,
    cli::globals::GlobalArgs,
    features::two_factor::{SetupStep, SetupWizard, TwoFactorMethod, TwoFactorSettings},
};
use anyhow::{bail, Result};
use secrecy::ExposeSecret;

const RESEND: &str = "resend";

#[derive(Debug)]
pub enum Command {
    Status,
    Setup {
        method: TwoFactorMethod,
        phone: Option<String>,
    },
    Preferred(TwoFactorMethod),
    Disable(TwoFactorMethod),
    RecoveryCodes,
}

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub command: Command,
}

/// # Errors
/// Returns an error when not signed in or the server refuses the change.
pub async fn execute(args: Args) -> Result<()> {
    let ctx = args.globals.context()?;
    if !ctx.session().is_authenticated() {
        bail!("not signed in, run `kinfolk login`");
    }
    let api = ctx.api().clone();

    match args.command {
        Command::Status => {
            let mut settings = TwoFactorSettings::new(api);
            let status = settings.refresh().await.map_err(user_facing)?;
            if !status.enabled {
                println!("Two-factor authentication is off.");
                return Ok(());
            }
            for method in TwoFactorMethod::ALL {
                let state = if status.is_enabled(method) { "on" } else { "off" };
                let preferred = if status.preferred_method == Some(method) {
                    " (preferred)"
                } else {
                    ""
                };
                println!("{:<6} {state}{preferred}", method.as_str());
            }
            println!(
                "Recovery codes left: {}",
                status.recovery_codes_remaining
            );
        }
        Command::Setup { method, phone } => {
            setup(SetupWizard::new(api, method), phone).await?;
        }
        Command::Preferred(method) => {
            let mut settings = TwoFactorSettings::new(api);
            settings
                .set_preferred_method(method)
                .await
                .map_err(user_facing)?;
            println!("Sign-in will ask for your {}.", method.label());
        }
        Command::Disable(method) => {
            let mut settings = TwoFactorSettings::new(api);
            settings.disable_method(method).await.map_err(user_facing)?;
            println!("Disabled {}.", method.label());
        }
        Command::RecoveryCodes => {
            let mut settings = TwoFactorSettings::new(api);
            let codes = settings
                .regenerate_recovery_codes()
                .await
                .map_err(user_facing)?;
            print_recovery_codes(&codes);
        }
    }
    Ok(())
}

async fn setup(mut wizard: SetupWizard, phone: Option<String>) -> Result<()> {
    let method = wizard.method();
    let phone = match (method, phone) {
        (TwoFactorMethod::Sms, None) => Some(prompt::line("Phone number").await?),
        (_, phone) => phone,
    };

    let challenge = wizard.begin(phone.as_deref()).await.map_err(user_facing)?;
    if let Some(secret) = &challenge.secret {
        println!("Add this key to your authenticator app: {secret}");
    }
    if let Some(url) = &challenge.otpauth_url {
        println!("Or open: {url}");
    }
    if let Some(destination) = &challenge.destination {
        println!("We sent a code to {destination}.");
    }
    if let Some(message) = &challenge.message {
        println!("{message}");
    }

    let label = if method.supports_resend() {
        format!("Code (or \"{RESEND}\")")
    } else {
        "Code".to_string()
    };

    while wizard.step() == SetupStep::Verify {
        let input = prompt::secret(&label).await?;
        if method.supports_resend() && input.expose_secret().eq_ignore_ascii_case(RESEND) {
            match wizard.resend().await {
                Ok(()) => println!("A new code is on its way."),
                Err(_) => eprintln!("{}", wizard.error().unwrap_or(GENERIC_ERROR)),
            }
            continue;
        }

        wizard.set_code(input.expose_secret());
        if wizard.submit().await.is_err() {
            eprintln!("{}", wizard.error().unwrap_or(GENERIC_ERROR));
        }
    }

    println!("Enabled {}.", method.label());
    if let Some(codes) = wizard.take_recovery_codes() {
        print_recovery_codes(&codes);
    }
    Ok(())
}

fn print_recovery_codes(codes: &[String]) {
    println!("Recovery codes, each works once. They will not be shown again:");
    for code in codes {
        println!("  {code}");
    }
}
