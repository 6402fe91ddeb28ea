//! Circle invitations: the link token is exchanged for an onboarding token,
//! mirrored in storage, and finalized once the user is authenticated.

pub mod cache;
pub mod client;
pub mod controller;
pub mod types;

pub use controller::{InvitationController, InvitationStatus};
pub use types::{Invitation, OnboardingToken};
