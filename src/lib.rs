//! # Kinfolk (family sharing client)
//!
//! `kinfolk` is the client side of the family-sharing service. The backend owns
//! persistence, password hashing and every TOTP/SMS/email computation; this crate
//! orchestrates the requests a user makes against it.
//!
//! ## Circle invitations
//!
//! An invitation link carries a token. The client exchanges it for an
//! **onboarding token** (`POST /users/circle-onboarding/`), caches both in
//! storage, and once the user is authenticated finalizes membership exactly once
//! (`POST /users/invitations/accept/`). Expired or unknown tokens end the flow in
//! a dedicated `Expired` state; there are no automatic retries.
//!
//! ## Two-factor authentication
//!
//! - **Setup:** each method (TOTP, SMS, email) walks `intro -> verify -> recovery`.
//!   Recovery codes are shown once.
//! - **Login:** a password login may return a **partial token** instead of a
//!   session. The partial token stays usable across wrong-code attempts and is
//!   dropped after success or a terminal failure.
//! - **Trusted devices:** listed, trusted and removed; the server owns them.
//!
//! ## State
//!
//! Storage ([`storage`]) stands in for browser local storage and publishes
//! change events so independent handles (tabs, processes) stay consistent.
//! Session state ([`features::auth::state::SessionState`]) is an explicit
//! holder passed through [`context::AppContext`], never a global.

pub mod app_lib;
pub mod cli;
pub mod context;
pub mod features;
pub mod routes;
pub mod storage;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
