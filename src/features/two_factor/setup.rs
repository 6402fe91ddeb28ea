//! Two-factor setup wizard.
//!
//! Each method walks the same linear steps:
//! 1. **Intro:** ask the server to issue a challenge (TOTP secret, or an SMS/email code).
//! 2. **Verify:** submit the first code; SMS/email codes can be re-sent here.
//! 3. **Recovery:** show the one-time recovery codes. There is no way back.

use crate::{
    app_lib::{extract_error_message, ApiClient, AppError, GENERIC_ERROR},
    features::two_factor::{
        client, codes,
        types::{CodeRequest, SetupChallenge, SetupStartRequest, TwoFactorMethod},
    },
};
use tracing::{debug, info, instrument};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetupStep {
    Intro,
    Verify,
    Recovery,
}

#[derive(Debug)]
pub struct SetupWizard {
    api: ApiClient,
    method: TwoFactorMethod,
    step: SetupStep,
    code: String,
    challenge: Option<SetupChallenge>,
    recovery_codes: Option<Vec<String>>,
    error: Option<String>,
}

impl SetupWizard {
    #[must_use]
    pub fn new(api: ApiClient, method: TwoFactorMethod) -> Self {
        Self {
            api,
            method,
            step: SetupStep::Intro,
            code: String::new(),
            challenge: None,
            recovery_codes: None,
            error: None,
        }
    }

    #[must_use]
    pub fn method(&self) -> TwoFactorMethod {
        self.method
    }

    #[must_use]
    pub fn step(&self) -> SetupStep {
        self.step
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[must_use]
    pub fn challenge(&self) -> Option<&SetupChallenge> {
        self.challenge.as_ref()
    }

    /// Last failure as user-facing text.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_code(&mut self, code: impl Into<String>) {
        self.code = code.into();
    }

    /// Intro -> verify. SMS needs the phone number to text; the other methods
    /// ignore `destination`.
    ///
    /// # Errors
    /// Returns validation failures or the server's refusal; the wizard stays
    /// on the intro step.
    #[instrument(skip(self, destination), fields(method = %self.method))]
    pub async fn begin(&mut self, destination: Option<&str>) -> Result<&SetupChallenge, AppError> {
        if self.step != SetupStep::Intro {
            return Err(self.fail(AppError::Validation(
                "Setup has already started.".to_string(),
            )));
        }

        let request = match self.method {
            TwoFactorMethod::Sms => {
                let raw = destination.unwrap_or_default();
                let phone_number = codes::normalize_phone_number(raw).map_err(|e| self.fail(e))?;
                SetupStartRequest {
                    phone_number: Some(phone_number),
                }
            }
            TwoFactorMethod::Totp | TwoFactorMethod::Email => SetupStartRequest::default(),
        };

        let challenge = client::setup_start(&self.api, self.method, &request)
            .await
            .map_err(|e| self.fail(e))?;

        debug!("setup challenge issued");
        self.error = None;
        self.code.clear();
        self.step = SetupStep::Verify;
        Ok(&*self.challenge.insert(challenge))
    }

    /// Verify -> recovery with the code entered via [`SetupWizard::set_code`].
    ///
    /// # Errors
    /// Returns a validation error for malformed codes or the server's
    /// rejection; the wizard stays on the verify step.
    #[instrument(skip(self), fields(method = %self.method))]
    pub async fn submit(&mut self) -> Result<&[String], AppError> {
        if self.step != SetupStep::Verify {
            return Err(self.fail(AppError::Validation(
                "There is no code to verify yet.".to_string(),
            )));
        }

        let code = codes::normalize_otp_code(&self.code).map_err(|e| self.fail(e))?;
        let response = client::setup_verify(&self.api, self.method, &CodeRequest { code })
            .await
            .map_err(|e| self.fail(e))?;

        info!(
            recovery_codes = response.recovery_codes.len(),
            "two-factor method enabled"
        );
        self.error = None;
        self.code.clear();
        self.step = SetupStep::Recovery;
        Ok(self.recovery_codes.insert(response.recovery_codes).as_slice())
    }

    /// Re-issues the SMS/email code and clears whatever was typed so a stale
    /// code cannot be submitted.
    ///
    /// # Errors
    /// Fails outside the verify step, for TOTP, or when the server refuses.
    #[instrument(skip(self), fields(method = %self.method))]
    pub async fn resend(&mut self) -> Result<(), AppError> {
        if self.step != SetupStep::Verify {
            return Err(self.fail(AppError::Validation(
                "Codes can only be re-sent while verifying.".to_string(),
            )));
        }
        if !self.method.supports_resend() {
            return Err(self.fail(AppError::Validation(
                "Authenticator codes are generated by your app and cannot be re-sent.".to_string(),
            )));
        }

        self.code.clear();
        let challenge = client::setup_resend(&self.api, self.method)
            .await
            .map_err(|e| self.fail(e))?;

        self.error = None;
        self.challenge = Some(challenge);
        Ok(())
    }

    /// Verify -> intro. Returns `false` when there is nothing to go back to;
    /// the recovery step never goes back.
    pub fn back(&mut self) -> bool {
        if self.step == SetupStep::Verify {
            self.step = SetupStep::Intro;
            self.code.clear();
            self.challenge = None;
            self.error = None;
            true
        } else {
            false
        }
    }

    /// Hands the recovery codes out once.
    pub fn take_recovery_codes(&mut self) -> Option<Vec<String>> {
        self.recovery_codes.take()
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

    async fn mount_setup(server: &MockServer, method_name: &str, data: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path(format!("/auth/2fa/{method_name}/setup/")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": data })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn totp_walks_intro_verify_recovery() {
        let server = MockServer::start().await;
        mount_setup(
            &server,
            "totp",
            json!({"secret": "JBSWY3DPEHPK3PXP", "otpauth_url": "otpauth://totp/kinfolk"}),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/auth/2fa/totp/verify/"))
            .and(body_json(json!({"code": "123456"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"recovery_codes": ["AAAAA-11111", "BBBBB-22222"]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut wizard = SetupWizard::new(client_for(&server), TwoFactorMethod::Totp);
        let challenge = wizard.begin(None).await.unwrap();
        assert_eq!(challenge.secret.as_deref(), Some("JBSWY3DPEHPK3PXP"));
        assert_eq!(wizard.step(), SetupStep::Verify);

        wizard.set_code("123 456");
        let codes = wizard.submit().await.unwrap().to_vec();
        assert_eq!(codes.len(), 2);
        assert_eq!(wizard.step(), SetupStep::Recovery);

        assert!(!wizard.back());
        assert_eq!(wizard.step(), SetupStep::Recovery);
        assert_eq!(wizard.take_recovery_codes().unwrap().len(), 2);
        assert!(wizard.take_recovery_codes().is_none());
    }

    #[tokio::test]
    async fn sms_requires_a_valid_phone_number() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/2fa/sms/setup/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
            .expect(0)
            .mount(&server)
            .await;

        let mut wizard = SetupWizard::new(client_for(&server), TwoFactorMethod::Sms);
        let err = wizard.begin(Some("not a phone")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(wizard.step(), SetupStep::Intro);
        assert_eq!(wizard.error(), Some("Enter a valid phone number."));
    }

    #[tokio::test]
    async fn resend_clears_code_and_reissues_challenge() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/2fa/sms/setup/"))
            .and(body_json(json!({"phone_number": "+15550109999"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"destination": "***-9999"}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/2fa/sms/resend/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"destination": "***-9999", "message": "Code re-sent"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut wizard = SetupWizard::new(client_for(&server), TwoFactorMethod::Sms);
        wizard.begin(Some("+1 555 010 9999")).await.unwrap();
        wizard.set_code("111111");

        wizard.resend().await.unwrap();
        assert_eq!(wizard.code(), "");
        assert_eq!(wizard.step(), SetupStep::Verify);
        assert_eq!(
            wizard.challenge().and_then(|c| c.message.as_deref()),
            Some("Code re-sent")
        );
    }

    #[tokio::test]
    async fn totp_cannot_resend() {
        let server = MockServer::start().await;
        mount_setup(&server, "totp", json!({"secret": "S"})).await;

        let mut wizard = SetupWizard::new(client_for(&server), TwoFactorMethod::Totp);
        wizard.begin(None).await.unwrap();
        wizard.set_code("123456");

        assert!(wizard.resend().await.is_err());
        assert_eq!(wizard.code(), "123456");
    }

    #[tokio::test]
    async fn rejected_code_stays_on_verify_with_server_message() {
        let server = MockServer::start().await;
        mount_setup(&server, "email", json!({"destination": "a***@example.com"})).await;
        Mock::given(method("POST"))
            .and(path("/auth/2fa/email/verify/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "messages": [{"i18n_key": "two_factor.invalid_code", "context": {}}]
            })))
            .mount(&server)
            .await;

        let mut wizard = SetupWizard::new(client_for(&server), TwoFactorMethod::Email);
        wizard.begin(None).await.unwrap();
        wizard.set_code("000000");

        assert!(wizard.submit().await.is_err());
        assert_eq!(wizard.step(), SetupStep::Verify);
        assert_eq!(wizard.error(), Some("The verification code is incorrect."));

        assert!(wizard.back());
        assert_eq!(wizard.step(), SetupStep::Intro);
        assert!(wizard.challenge().is_none());
    }
}
