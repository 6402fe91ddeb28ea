use clap::{Arg, Command};

pub const ARG_DEVICE_ID: &str = "device-id";
pub const ARG_NAME: &str = "name";

pub fn with_subcommands(command: Command) -> Command {
    command.subcommand(
        Command::new("devices")
            .about("Devices that skip the second factor")
            .subcommand_required(true)
            .subcommand(Command::new("list").about("List trusted devices"))
            .subcommand(
                Command::new("remove")
                    .about("Stop trusting a device")
                    .arg(Arg::new(ARG_DEVICE_ID).required(true)),
            )
            .subcommand(
                Command::new("trust")
                    .about("Trust this device")
                    .arg(
                        Arg::new(ARG_NAME)
                            .help("Name shown in the device list")
                            .required(true),
                    ),
            ),
    )
}
