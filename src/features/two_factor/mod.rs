//! Two-factor authentication: setup wizards, the login-time challenge and
//! method management.

pub mod challenge;
pub mod client;
pub mod codes;
pub mod settings;
pub mod setup;
pub mod types;

pub use challenge::{ChallengeState, LoginChallenge, TwoFactorChallenge};
pub use settings::TwoFactorSettings;
pub use setup::{SetupStep, SetupWizard};
pub use types::{TwoFactorMethod, TwoFactorStatus};
