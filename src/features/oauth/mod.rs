//! Social login. `begin` remembers a random state nonce and where to resume;
//! `complete` checks the nonce from the callback and exchanges the
//! authorization code for a session. The nonce is single-use.

use crate::{
    app_lib::AppError,
    context::AppContext,
    features::auth::{
        client,
        types::{Session, SocialLoginRequest, UserProfile},
    },
    storage,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use ulid::Ulid;
use url::Url;

pub const OAUTH_STATE_KEY: &str = "kinfolk.oauth_state";

pub const PROVIDERS: &[&str] = &["google", "apple", "facebook"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct PendingAuthorization {
    state: String,
    provider: String,
    redirect_uri: String,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OAuthCompletion {
    pub user: UserProfile,
    /// Where to resume, e.g. an invitation that sent the user to sign in.
    pub next: Option<String>,
}

#[derive(Clone, Debug)]
pub struct OAuthFlow {
    ctx: AppContext,
}

impl OAuthFlow {
    #[must_use]
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Stores a fresh state nonce and returns the provider authorization URL.
    ///
    /// # Errors
    /// Returns `AppError::Validation` for unknown providers and storage or
    /// configuration failures.
    #[instrument(skip(self, next))]
    pub fn begin(
        &self,
        provider: &str,
        redirect_uri: &str,
        next: Option<&str>,
    ) -> Result<Url, AppError> {
        let provider = provider.trim().to_lowercase();
        if !PROVIDERS.contains(&provider.as_str()) {
            return Err(AppError::Validation(format!(
                "Sign-in with {provider} is not supported."
            )));
        }
        Url::parse(redirect_uri)
            .map_err(|err| AppError::Validation(format!("Invalid redirect URI: {err}")))?;

        let pending = PendingAuthorization {
            state: Ulid::new().to_string(),
            provider,
            redirect_uri: redirect_uri.to_string(),
            next: next.map(str::to_string),
        };
        storage::set_json(self.ctx.storage(), OAUTH_STATE_KEY, &pending)?;

        let mut url = self
            .ctx
            .api()
            .config()
            .endpoint(&format!("/auth/social/{}/authorize/", pending.provider))?;
        url.query_pairs_mut()
            .append_pair("redirect_uri", &pending.redirect_uri)
            .append_pair("state", &pending.state);
        Ok(url)
    }

    /// Completes the login from the callback's `state` and `code`.
    ///
    /// # Errors
    /// Returns `AppError::Validation` when no login is pending or the state
    /// does not match, otherwise the exchange failure.
    #[instrument(skip_all)]
    pub async fn complete(&self, state: &str, code: &str) -> Result<OAuthCompletion, AppError> {
        let pending: Option<PendingAuthorization> =
            storage::get_json(self.ctx.storage(), OAUTH_STATE_KEY)?;
        // Single use, whatever the outcome.
        self.ctx.storage().remove(OAUTH_STATE_KEY)?;

        let pending = pending.ok_or_else(|| {
            AppError::Validation("No sign-in is in progress. Please start again.".to_string())
        })?;
        if pending.state != state {
            warn!("OAuth state mismatch");
            return Err(AppError::Validation(
                "The sign-in response did not match this request. Please start again.".to_string(),
            ));
        }
        if code.trim().is_empty() {
            return Err(AppError::Validation(
                "The sign-in response is missing its code.".to_string(),
            ));
        }

        let request = SocialLoginRequest {
            code: code.trim().to_string(),
            redirect_uri: pending.redirect_uri,
        };
        let session: Session = client::social_login(self.ctx.api(), &pending.provider, &request)
            .await?
            .into();
        let user = session.user.clone();
        self.ctx.session().set(session)?;
        info!(provider = %pending.provider, "signed in with provider");

        Ok(OAuthCompletion {
            user,
            next: pending.next,
        })
    }

    /// Completes the login from the full callback URL.
    ///
    /// # Errors
    /// Returns `AppError::Validation` when the provider reported an error or
    /// the URL lacks `state`/`code`, then as [`Self::complete`].
    pub async fn complete_from_callback(&self, callback: &str) -> Result<OAuthCompletion, AppError> {
        let url = Url::parse(callback)
            .map_err(|err| AppError::Validation(format!("Invalid callback URL: {err}")))?;

        let param = |name: &str| {
            url.query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.into_owned())
        };
        if let Some(error) = param("error") {
            self.ctx.storage().remove(OAUTH_STATE_KEY)?;
            return Err(AppError::Validation(format!("Sign-in was cancelled: {error}")));
        }

        match (param("state"), param("code")) {
            (Some(state), Some(code)) => self.complete(&state, &code).await,
            _ => Err(AppError::Validation(
                "The sign-in response is incomplete.".to_string(),
            )),
        }
    }
}
