use super::{account, circles, devices, invitation, two_factor, Action};
use anyhow::Result;

pub(super) async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Login(args) => account::login(args).await,
        Action::Logout(globals) => account::logout(&globals).await,
        Action::WhoAmI(globals) => account::whoami(&globals).await,
        Action::Profile(args) => account::profile(args).await,
        Action::Invitation(args) => invitation::execute(args).await,
        Action::TwoFactor(args) => two_factor::execute(args).await,
        Action::Devices(args) => devices::execute(args).await,
        Action::Circles(args) => circles::execute(args).await,
    }
}
