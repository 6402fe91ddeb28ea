pub mod client;
pub mod login;
pub mod state;
pub mod types;

pub use login::{login, logout, refresh_profile, update_profile, LoginOutcome};
pub use state::SessionState;
pub use types::{Session, UserProfile};
