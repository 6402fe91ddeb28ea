//! Password login, logout and profile refresh on top of [`SessionState`].
//!
//! [`SessionState`]: crate::features::auth::state::SessionState

use crate::{
    app_lib::{ApiClient, AppError},
    features::{
        auth::{
            client,
            types::{LoginRequest, Session, UpdateProfileRequest, UserProfile},
        },
        two_factor::{LoginChallenge, TwoFactorChallenge, TwoFactorMethod},
    },
    routes::Navigation,
};
use once_cell::sync::Lazy;
use regex::Regex;
use secrecy::SecretString;
use tracing::{info, instrument, warn};

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Failed to compile email pattern")
});

#[derive(Debug)]
pub enum LoginOutcome {
    Authenticated(UserProfile),
    /// The password was accepted; a second factor must be verified next.
    TwoFactorRequired(LoginChallenge),
}

impl LoginOutcome {
    /// Where the front end goes next: home, or the second-factor prompt.
    #[must_use]
    pub fn navigation(&self) -> Navigation {
        match self {
            Self::Authenticated(_) => Navigation::Home,
            Self::TwoFactorRequired(_) => Navigation::TwoFactorVerify,
        }
    }
}

#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[must_use]
pub fn valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

/// Signs in with email and password.
///
/// # Errors
/// Returns `AppError::Validation` for malformed input, the server's refusal,
/// or `AppError::Parse` when the answer is neither a session nor a challenge.
#[instrument(skip(api, password))]
pub async fn login(api: &ApiClient, email: &str, password: &str) -> Result<LoginOutcome, AppError> {
    let email = normalize_email(email);
    if !valid_email(&email) {
        return Err(AppError::Validation(
            "Enter a valid email address.".to_string(),
        ));
    }
    if password.is_empty() {
        return Err(AppError::Validation("Enter your password.".to_string()));
    }

    let request = LoginRequest {
        email,
        password: password.to_string(),
    };
    let response = client::login(api, &request).await?;

    if response.requires_2fa {
        let partial_token = response.partial_token.ok_or_else(|| {
            AppError::Parse("Two-factor challenge is missing its partial token.".to_string())
        })?;
        let method = response.method.unwrap_or(TwoFactorMethod::Totp);
        info!(%method, "second factor required");

        return Ok(LoginOutcome::TwoFactorRequired(LoginChallenge::new(
            api.clone(),
            TwoFactorChallenge {
                partial_token: SecretString::from(partial_token),
                method,
                message: response.message,
            },
        )));
    }

    match (response.access_token, response.user) {
        (Some(access_token), Some(user)) => {
            api.session().set(Session {
                access_token: SecretString::from(access_token),
                user: user.clone(),
            })?;
            info!("signed in");
            Ok(LoginOutcome::Authenticated(user))
        }
        _ => Err(AppError::Parse(
            "Login response did not include a session.".to_string(),
        )),
    }
}

/// Ends the session on the server and locally. The local session is cleared
/// even when the server call fails.
///
/// # Errors
/// Returns the server failure or a storage failure while clearing.
pub async fn logout(api: &ApiClient) -> Result<(), AppError> {
    let result = if api.session().is_authenticated() {
        client::logout(api).await
    } else {
        Ok(())
    };
    if let Err(err) = &result {
        warn!("Server logout failed: {err}");
    }
    api.session().clear()?;
    result
}

/// Reloads the profile and stores it in the session.
///
/// # Errors
/// Returns the request failure. A 401 also clears the stale session.
pub async fn refresh_profile(api: &ApiClient) -> Result<UserProfile, AppError> {
    match client::fetch_profile(api).await {
        Ok(user) => {
            api.session().update_user(user.clone())?;
            Ok(user)
        }
        Err(err) => {
            if err.status() == Some(401) {
                api.session().clear()?;
            }
            Err(err)
        }
    }
}

/// Updates the user's name and stores the result in the session.
///
/// # Errors
/// Returns the request failure.
pub async fn update_profile(
    api: &ApiClient,
    request: &UpdateProfileRequest,
) -> Result<UserProfile, AppError> {
    let user = client::update_profile(api, request).await?;
    api.session().update_user(user.clone())?;
    Ok(user)
}
