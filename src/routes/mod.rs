//! Route paths and navigation targets produced by the flow controllers.
//!
//! Controllers never navigate themselves; they return a [`Navigation`] and the
//! front end (browser router or CLI) decides how to follow it.

use url::form_urlencoded;

pub mod paths {
    pub const HOME: &str = "/";
    pub const LOGIN: &str = "/login";
    pub const SIGNUP: &str = "/signup";
    pub const INVITATION_ACCEPT: &str = "/invitations/accept";
    pub const TWO_FACTOR_VERIFY: &str = "/profile/2fa/verify";
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Navigation {
    Home,
    /// Sign in, then resume at `next`.
    Login { next: Option<String> },
    /// Create an account, then resume at `next`.
    Signup { next: Option<String> },
    /// Second factor required after a password login.
    TwoFactorVerify,
}

impl Navigation {
    /// The route path including any `next` query.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Home => paths::HOME.to_string(),
            Self::Login { next } => with_next(paths::LOGIN, next.as_deref()),
            Self::Signup { next } => with_next(paths::SIGNUP, next.as_deref()),
            Self::TwoFactorVerify => paths::TWO_FACTOR_VERIFY.to_string(),
        }
    }
}

/// Appends `?next=<encoded>` when a resume target is given.
#[must_use]
pub fn with_next(path: &str, next: Option<&str>) -> String {
    match next {
        Some(next) if !next.is_empty() => {
            let query = form_urlencoded::Serializer::new(String::new())
                .append_pair("next", next)
                .finish();
            format!("{path}?{query}")
        }
        _ => path.to_string(),
    }
}

/// Path that resumes an invitation after authentication, carrying the
/// onboarding token so the account can be linked on return.
#[must_use]
pub fn invitation_resume_path(token: &str, onboarding_token: Option<&str>) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("token", token);
    if let Some(onboarding_token) = onboarding_token {
        query.append_pair("onboarding_token", onboarding_token);
    }
    format!("{}?{}", paths::INVITATION_ACCEPT, query.finish())
}
