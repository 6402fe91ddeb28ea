//! Login-time second factor.
//!
//! A password login that needs a second factor yields a **partial token**.
//! The challenge submits codes against it until one is accepted:
//! - a wrong code keeps the partial token for another attempt;
//! - success installs the session and redirects home once;
//! - an expired partial token is dropped and the user is sent back to login.

use crate::{
    app_lib::{extract_error_message, ApiClient, AppError, ErrorClass, GENERIC_ERROR},
    features::two_factor::{
        client, codes,
        types::{LoginVerifyRequest, PartialTokenRequest, TwoFactorMethod},
    },
    routes::Navigation,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument, warn};

/// What the login endpoint issued when a second factor is required.
#[derive(Clone, Debug)]
pub struct TwoFactorChallenge {
    pub partial_token: SecretString,
    pub method: TwoFactorMethod,
    pub message: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChallengeState {
    AwaitingCode,
    Verified,
    /// The partial token was rejected for good; sign in again.
    Expired,
}

#[derive(Debug)]
pub struct LoginChallenge {
    api: ApiClient,
    partial_token: Option<SecretString>,
    method: TwoFactorMethod,
    message: Option<String>,
    state: ChallengeState,
    code: String,
    recovery_mode: bool,
    error: Option<String>,
    redirect_pending: bool,
}

impl LoginChallenge {
    #[must_use]
    pub fn new(api: ApiClient, challenge: TwoFactorChallenge) -> Self {
        Self {
            api,
            partial_token: Some(challenge.partial_token),
            method: challenge.method,
            message: challenge.message,
            state: ChallengeState::AwaitingCode,
            code: String::new(),
            recovery_mode: false,
            error: None,
            redirect_pending: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> ChallengeState {
        self.state
    }

    #[must_use]
    pub fn method(&self) -> TwoFactorMethod {
        self.method
    }

    /// Server copy shown with the challenge, e.g. where the code was sent.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[must_use]
    pub fn has_partial_token(&self) -> bool {
        self.partial_token.is_some()
    }

    #[must_use]
    pub fn is_recovery_mode(&self) -> bool {
        self.recovery_mode
    }

    pub fn set_code(&mut self, code: impl Into<String>) {
        self.code = code.into();
    }

    /// Switches between method codes and recovery codes.
    pub fn use_recovery_code(&mut self, enabled: bool) {
        self.recovery_mode = enabled;
        self.code.clear();
        self.error = None;
    }

    /// Submits the entered code.
    ///
    /// # Errors
    /// Returns format errors, wrong-code rejections (the challenge stays
    /// usable) and terminal failures (the challenge becomes `Expired`).
    #[instrument(skip(self), fields(method = %self.method, recovery = self.recovery_mode))]
    pub async fn submit(&mut self, remember_device: bool) -> Result<(), AppError> {
        let partial_token = self.active_token()?;

        let (code, recovery_code) = if self.recovery_mode {
            let code = codes::normalize_recovery_code(&self.code).map_err(|e| self.fail(e))?;
            (None, Some(code))
        } else {
            let code = codes::normalize_otp_code(&self.code).map_err(|e| self.fail(e))?;
            (Some(code), None)
        };

        let request = LoginVerifyRequest {
            partial_token,
            code,
            recovery_code,
            remember_device,
        };

        match client::verify_login(&self.api, &request).await {
            Ok(session) => {
                if let Err(err) = self.api.session().set(session.into()) {
                    warn!("Failed to persist session: {err}");
                }
                info!(remember_device, "two-factor verification succeeded");
                self.partial_token = None;
                self.code.clear();
                self.error = None;
                self.state = ChallengeState::Verified;
                self.redirect_pending = true;
                Ok(())
            }
            Err(err) => {
                self.code.clear();
                self.expire_if_terminal(&err);
                Err(self.fail(err))
            }
        }
    }

    /// Asks the server to send a fresh SMS/email code for the same partial
    /// token and clears the locally entered code.
    ///
    /// # Errors
    /// Fails for authenticator/recovery codes, inactive challenges, or when the
    /// server refuses.
    #[instrument(skip(self), fields(method = %self.method))]
    pub async fn resend(&mut self) -> Result<(), AppError> {
        let partial_token = self.active_token()?;
        if self.recovery_mode || !self.method.supports_resend() {
            return Err(self.fail(AppError::Validation(
                "This code cannot be re-sent.".to_string(),
            )));
        }

        self.code.clear();
        match client::resend_login_code(&self.api, &PartialTokenRequest { partial_token }).await {
            Ok(response) => {
                self.error = None;
                if response.message.is_some() {
                    self.message = response.message;
                }
                Ok(())
            }
            Err(err) => {
                self.expire_if_terminal(&err);
                Err(self.fail(err))
            }
        }
    }

    /// Navigation after the challenge ends, yielded once: home after success,
    /// login after the partial token expired.
    pub fn take_redirect(&mut self) -> Option<Navigation> {
        if !self.redirect_pending {
            return None;
        }
        self.redirect_pending = false;
        match self.state {
            ChallengeState::Verified => Some(Navigation::Home),
            ChallengeState::Expired => Some(Navigation::Login { next: None }),
            ChallengeState::AwaitingCode => None,
        }
    }

    fn active_token(&mut self) -> Result<String, AppError> {
        let token = match (self.state, &self.partial_token) {
            (ChallengeState::AwaitingCode, Some(token)) => Some(token.expose_secret().to_string()),
            _ => None,
        };
        token.ok_or_else(|| {
            self.fail(AppError::Validation(
                "This sign-in attempt is no longer active. Please sign in again.".to_string(),
            ))
        })
    }

    /// A partial token the server no longer accepts (expired, or a bare 401)
    /// cannot be retried.
    fn expire_if_terminal(&mut self, err: &AppError) {
        if matches!(err.class(), ErrorClass::Expired | ErrorClass::Unauthorized) {
            warn!("partial token expired");
            self.partial_token = None;
            self.state = ChallengeState::Expired;
            self.redirect_pending = true;
        }
    }

    fn fail(&mut self, err: AppError) -> AppError {
        self.error = Some(extract_error_message(&err, GENERIC_ERROR));
        err
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::app_lib::api::tests::client_for;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn challenge(api: ApiClient, method: TwoFactorMethod) -> LoginChallenge {
        LoginChallenge::new(
            api,
            TwoFactorChallenge {
                partial_token: SecretString::from("partial-1".to_string()),
                method,
                message: Some("Enter the code from your app".to_string()),
            },
        )
    }

    fn session_body() -> serde_json::Value {
        json!({"data": {
            "access_token": "full-session",
            "user": {"id": "u1", "email": "ada@example.com", "two_factor_enabled": true}
        }})
    }

    #[tokio::test]
    async fn correct_code_with_remember_me_redirects_home_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/2fa/verify/"))
            .and(body_json(json!({
                "partial_token": "partial-1",
                "code": "123456",
                "remember_device": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
            .expect(1)
            .mount(&server)
            .await;

        let api = client_for(&server);
        let mut challenge = challenge(api.clone(), TwoFactorMethod::Totp);
        challenge.set_code("123456");
        challenge.submit(true).await.unwrap();

        assert_eq!(challenge.state(), ChallengeState::Verified);
        assert!(!challenge.has_partial_token());
        assert!(api.session().is_authenticated());
        assert_eq!(challenge.take_redirect(), Some(Navigation::Home));
        assert_eq!(challenge.take_redirect(), None);

        // A verified challenge cannot be replayed.
        challenge.set_code("123456");
        assert!(challenge.submit(true).await.is_err());
    }

    #[tokio::test]
    async fn wrong_code_keeps_partial_token_for_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/2fa/verify/"))
            .and(body_json(json!({
                "partial_token": "partial-1",
                "code": "000000",
                "remember_device": false
            })))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "messages": [{"i18n_key": "two_factor.invalid_code", "context": {}}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/2fa/verify/"))
            .and(body_json(json!({
                "partial_token": "partial-1",
                "code": "123456",
                "remember_device": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
            .expect(1)
            .mount(&server)
            .await;

        let mut challenge = challenge(client_for(&server), TwoFactorMethod::Totp);
        challenge.set_code("000000");
        assert!(challenge.submit(false).await.is_err());
        assert_eq!(challenge.state(), ChallengeState::AwaitingCode);
        assert!(challenge.has_partial_token());
        assert_eq!(challenge.error(), Some("The verification code is incorrect."));
        assert_eq!(challenge.take_redirect(), None);

        challenge.set_code("123456");
        challenge.submit(false).await.unwrap();
        assert_eq!(challenge.state(), ChallengeState::Verified);
    }

    #[tokio::test]
    async fn expired_partial_token_is_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/2fa/verify/"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "messages": [{"i18n_key": "two_factor.partial_token_expired", "context": {}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut challenge = challenge(client_for(&server), TwoFactorMethod::Totp);
        challenge.set_code("123456");
        assert!(challenge.submit(false).await.is_err());

        assert_eq!(challenge.state(), ChallengeState::Expired);
        assert!(!challenge.has_partial_token());
        assert_eq!(
            challenge.take_redirect(),
            Some(Navigation::Login { next: None })
        );
    }

    #[tokio::test]
    async fn bare_unauthorized_ends_the_challenge() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/2fa/verify/"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let mut challenge = challenge(client_for(&server), TwoFactorMethod::Totp);
        challenge.set_code("123456");
        assert!(challenge.submit(false).await.is_err());

        assert_eq!(challenge.state(), ChallengeState::Expired);
        assert!(!challenge.has_partial_token());
        assert_eq!(
            challenge.take_redirect(),
            Some(Navigation::Login { next: None })
        );

        // No second request goes out with the dropped token.
        challenge.set_code("123456");
        assert!(matches!(
            challenge.submit(false).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn recovery_code_uses_recovery_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/2fa/verify/"))
            .and(body_json(json!({
                "partial_token": "partial-1",
                "recovery_code": "ABCDE-12345",
                "remember_device": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
            .expect(1)
            .mount(&server)
            .await;

        let mut challenge = challenge(client_for(&server), TwoFactorMethod::Sms);
        challenge.use_recovery_code(true);
        challenge.set_code("123456");
        // A six-digit code is not a recovery code.
        assert!(matches!(
            challenge.submit(false).await,
            Err(AppError::Validation(_))
        ));

        challenge.set_code("abcde 12345");
        challenge.submit(false).await.unwrap();
        assert_eq!(challenge.state(), ChallengeState::Verified);
    }

    #[tokio::test]
    async fn resend_clears_code_and_keeps_partial_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/2fa/resend/"))
            .and(body_json(json!({"partial_token": "partial-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"message": "We sent a new code to ***-9999"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut challenge = challenge(client_for(&server), TwoFactorMethod::Sms);
        challenge.set_code("111111");
        challenge.resend().await.unwrap();

        assert_eq!(challenge.code(), "");
        assert!(challenge.has_partial_token());
        assert_eq!(challenge.message(), Some("We sent a new code to ***-9999"));
    }

    #[tokio::test]
    async fn totp_challenge_cannot_resend() {
        let server = MockServer::start().await;
        let mut challenge = challenge(client_for(&server), TwoFactorMethod::Totp);
        challenge.set_code("111111");
        assert!(challenge.resend().await.is_err());
        assert_eq!(challenge.code(), "111111");
    }
}
