//! Two-factor management for an authenticated user: which methods are on,
//! which one is preferred, and recovery code rotation.

use crate::{
    app_lib::{extract_error_message, ApiClient, AppError, GENERIC_ERROR},
    features::two_factor::{
        client,
        types::{PreferredMethodRequest, TwoFactorMethod, TwoFactorStatus},
    },
};
use tracing::{info, instrument};

#[derive(Debug)]
pub struct TwoFactorSettings {
    api: ApiClient,
    status: Option<TwoFactorStatus>,
    error: Option<String>,
}

impl TwoFactorSettings {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            status: None,
            error: None,
        }
    }

    /// Last loaded status, if any.
    #[must_use]
    pub fn status(&self) -> Option<&TwoFactorStatus> {
        self.status.as_ref()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Reloads the status from the server.
    ///
    /// # Errors
    /// Returns the request failure; the previous status is kept.
    pub async fn refresh(&mut self) -> Result<&TwoFactorStatus, AppError> {
        let status = client::status(&self.api).await.map_err(|e| self.fail(e))?;
        self.error = None;
        Ok(&*self.status.insert(status))
    }

    /// Makes `method` the one offered first at login.
    ///
    /// # Errors
    /// Returns `AppError::Validation` when the method is not enabled.
    #[instrument(skip(self))]
    pub async fn set_preferred_method(&mut self, method: TwoFactorMethod) -> Result<(), AppError> {
        self.require_enabled(method).await?;

        let status = client::set_preferred_method(&self.api, &PreferredMethodRequest { method })
            .await
            .map_err(|e| self.fail(e))?;

        info!("preferred two-factor method changed");
        self.error = None;
        self.status = Some(status);
        Ok(())
    }

    /// Turns `method` off.
    ///
    /// # Errors
    /// Returns `AppError::Validation` when the method is not enabled, or the
    /// server's refusal.
    #[instrument(skip(self))]
    pub async fn disable_method(&mut self, method: TwoFactorMethod) -> Result<(), AppError> {
        self.require_enabled(method).await?;

        let status = client::disable_method(&self.api, method)
            .await
            .map_err(|e| self.fail(e))?;

        info!("two-factor method disabled");
        self.error = None;
        self.status = Some(status);
        Ok(())
    }

    /// Replaces all recovery codes and returns the new set. They are shown
    /// once and never stored.
    ///
    /// # Errors
    /// Returns the request failure.
    #[instrument(skip(self))]
    pub async fn regenerate_recovery_codes(&mut self) -> Result<Vec<String>, AppError> {
        let response = client::regenerate_recovery_codes(&self.api)
            .await
            .map_err(|e| self.fail(e))?;

        self.error = None;
        if let Some(status) = self.status.as_mut() {
            status.recovery_codes_remaining =
                u32::try_from(response.recovery_codes.len()).unwrap_or(u32::MAX);
        }
        Ok(response.recovery_codes)
    }

    async fn require_enabled(&mut self, method: TwoFactorMethod) -> Result<(), AppError> {
        if self.status.is_none() {
            self.refresh().await?;
        }

        let enabled = self
            .status
            .as_ref()
            .is_some_and(|status| status.is_enabled(method));
        if enabled {
            Ok(())
        } else {
            Err(self.fail(AppError::Validation(format!(
                "Set up {} verification before using it.",
                method.label()
            ))))
        }
    }

    fn fail(&mut self, err: AppError) -> AppError {
        self.error = Some(extract_error_message(&err, GENERIC_ERROR));
        err
    }
}
