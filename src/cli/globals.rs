use crate::{
    app_lib::{config::default_state_dir, ClientConfig},
    context::AppContext,
};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Arguments every subcommand shares.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub api_url: String,
    pub state_dir: PathBuf,
    pub timeout_seconds: u64,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(api_url: String) -> Self {
        Self {
            api_url,
            state_dir: default_state_dir(),
            timeout_seconds: crate::app_lib::config::DEFAULT_TIMEOUT_SECONDS,
        }
    }

    /// # Errors
    /// Returns an error if the API URL is not a usable http(s) URL.
    pub fn client_config(&self) -> Result<ClientConfig> {
        Ok(ClientConfig::new(&self.api_url, self.state_dir.clone())
            .context("invalid KINFOLK_API_URL")?
            .with_timeout_seconds(self.timeout_seconds))
    }

    /// Opens the state directory and restores any saved session.
    ///
    /// # Errors
    /// Returns an error if the configuration or the state file is unusable.
    pub fn context(&self) -> Result<AppContext> {
        AppContext::from_config(self.client_config()?).with_context(|| {
            format!("failed to open state in {}", self.state_dir.display())
        })
    }
}
