//! Trusted device list. The server owns the devices; the manager keeps the
//! last fetched list and whether a request is running.

use crate::{
    app_lib::{extract_error_message, ApiClient, AppError, ErrorClass, GENERIC_ERROR},
    features::devices::{
        client,
        types::{TrustDeviceRequest, TrustedDevice},
    },
};
use tracing::{debug, info, instrument};

const MAX_DEVICE_NAME_CHARS: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceState {
    Loading,
    Ready,
    Mutating,
}

#[derive(Debug)]
pub struct DeviceManager {
    api: ApiClient,
    state: DeviceState,
    devices: Vec<TrustedDevice>,
    error: Option<String>,
}

impl DeviceManager {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: DeviceState::Loading,
            devices: Vec::new(),
            error: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> DeviceState {
        self.state
    }

    #[must_use]
    pub fn devices(&self) -> &[TrustedDevice] {
        &self.devices
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Reloads the list.
    ///
    /// # Errors
    /// Returns the request failure; the previous list is kept.
    pub async fn refresh(&mut self) -> Result<&[TrustedDevice], AppError> {
        self.state = DeviceState::Loading;
        let result = client::list_trusted_devices(&self.api).await;
        self.state = DeviceState::Ready;

        let devices = result.map_err(|e| self.fail(e))?;
        debug!(count = devices.len(), "trusted devices loaded");
        self.error = None;
        self.devices = devices;
        Ok(self.devices.as_slice())
    }

    /// Removes a device the user confirmed. Returns `false` without a request
    /// when the id is not in the list; a 404 from the server counts as removed.
    ///
    /// # Errors
    /// Returns the server's failure for anything but a missing device.
    #[instrument(skip(self))]
    pub async fn remove(&mut self, device_id: &str) -> Result<bool, AppError> {
        if !self.devices.iter().any(|d| d.device_id == device_id) {
            debug!("device not listed; nothing to remove");
            return Ok(false);
        }
        self.begin_mutation()?;

        let result = client::remove_trusted_device(&self.api, device_id).await;
        self.state = DeviceState::Ready;
        match result {
            Ok(()) => {}
            Err(err) if err.class() == ErrorClass::NotFound => {
                debug!("device already removed on the server");
            }
            Err(err) => return Err(self.fail(err)),
        }

        info!("trusted device removed");
        self.error = None;
        self.devices.retain(|d| d.device_id != device_id);
        Ok(true)
    }

    /// Trusts the device making the request so later logins skip the second
    /// factor.
    ///
    /// # Errors
    /// Returns `AppError::Validation` for an empty or overlong name, or the
    /// server's failure.
    #[instrument(skip(self))]
    pub async fn trust_current_device(&mut self, name: &str) -> Result<&TrustedDevice, AppError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_DEVICE_NAME_CHARS {
            return Err(self.fail(AppError::Validation(format!(
                "Device names must be 1 to {MAX_DEVICE_NAME_CHARS} characters."
            ))));
        }
        self.begin_mutation()?;

        let request = TrustDeviceRequest {
            name: name.to_string(),
        };
        let result = client::trust_current_device(&self.api, &request).await;
        self.state = DeviceState::Ready;
        let device = result.map_err(|e| self.fail(e))?;

        info!("current device trusted");
        self.error = None;
        self.devices.retain(|d| d.device_id != device.device_id);
        self.devices.push(device);
        let index = self.devices.len() - 1;
        Ok(&self.devices[index])
    }

    fn begin_mutation(&mut self) -> Result<(), AppError> {
        if self.state == DeviceState::Mutating {
            return Err(AppError::Validation(
                "Another change is still in progress.".to_string(),
            ));
        }
        self.state = DeviceState::Mutating;
        Ok(())
    }

    fn fail(&mut self, err: AppError) -> AppError {
        self.error = Some(extract_error_message(&err, GENERIC_ERROR));
        err
    }
}
