pub mod auth;
pub mod circles;
pub mod devices;
pub mod invitations;
pub mod oauth;
pub mod two_factor;
