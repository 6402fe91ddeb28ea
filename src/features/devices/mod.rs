//! Trusted devices: list, trust the current one, remove.

pub mod client;
pub mod manager;
pub mod types;

pub use manager::{DeviceManager, DeviceState};
pub use types::TrustedDevice;
