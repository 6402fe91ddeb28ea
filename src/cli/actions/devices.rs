use super::user_facing;
use crate::{cli::globals::GlobalArgs, features::devices::DeviceManager};
use anyhow::{bail, Result};
use chrono::Utc;

#[derive(Debug)]
pub enum Command {
    List,
    Remove(String),
    Trust(String),
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
    let mut manager = DeviceManager::new(ctx.api().clone());

    match args.command {
        Command::List => {
            let now = Utc::now();
            let devices = manager.refresh().await.map_err(user_facing)?;
            if devices.is_empty() {
                println!("No trusted devices.");
            }
            for device in devices {
                let mut notes = Vec::new();
                if device.current {
                    notes.push("this device".to_string());
                }
                if device.is_expired(now) {
                    notes.push("expired".to_string());
                } else if let Some(expires_at) = device.expires_at {
                    notes.push(format!("until {}", expires_at.format("%Y-%m-%d")));
                }
                if let Some(last_used_at) = device.last_used_at {
                    notes.push(format!("last used {}", last_used_at.format("%Y-%m-%d %H:%M")));
                }
                println!("{}  {}  {}", device.device_id, device.name, notes.join(", "));
            }
        }
        Command::Remove(device_id) => {
            manager.refresh().await.map_err(user_facing)?;
            if manager.remove(&device_id).await.map_err(user_facing)? {
                println!("Removed {device_id}.");
            } else {
                bail!("no trusted device with id {device_id}");
            }
        }
        Command::Trust(name) => {
            let device = manager
                .trust_current_device(&name)
                .await
                .map_err(user_facing)?;
            println!("Trusted this device as {} ({}).", device.name, device.device_id);
        }
    }
    Ok(())
}
