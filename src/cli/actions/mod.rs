pub mod account;
pub mod circles;
pub mod devices;
pub mod invitation;
pub mod two_factor;

mod prompt;

// The match over `Action` lives in `run` so this file only lists actions.
mod run;

use crate::{
    app_lib::{extract_error_message, AppError, GENERIC_ERROR},
    cli::globals::GlobalArgs,
};

#[derive(Debug)]
pub enum Action {
    Login(account::LoginArgs),
    Logout(GlobalArgs),
    WhoAmI(GlobalArgs),
    Profile(account::ProfileArgs),
    Invitation(invitation::Args),
    TwoFactor(two_factor::Args),
    Devices(devices::Args),
    Circles(circles::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}

/// Server failures read the same as in the web client.
fn user_facing(err: AppError) -> anyhow::Error {
    anyhow::anyhow!(extract_error_message(&err, GENERIC_ERROR))
}
