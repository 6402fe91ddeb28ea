//! Client configuration: where the API lives, how long requests may take and
//! where local state is kept. Values come from CLI arguments or their
//! `KINFOLK_*` environment variables. Nothing here is secret.

use super::errors::AppError;
use std::{borrow::Cow, path::PathBuf, time::Duration};
use url::Url;

/// Default request timeout applied to every API call.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_base_url: Url,
    pub timeout: Duration,
    pub state_dir: PathBuf,
}

impl ClientConfig {
    /// Builds a config from a raw base URL.
    ///
    /// # Errors
    /// Returns `AppError::Config` when the URL is empty, unparsable or not http(s).
    pub fn new(api_base_url: &str, state_dir: PathBuf) -> Result<Self, AppError> {
        Ok(Self {
            api_base_url: parse_base_url(api_base_url)?,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            state_dir,
        })
    }

    #[must_use]
    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout = Duration::from_secs(seconds.max(1));
        self
    }

    /// Joins a request path onto the API base, keeping any base path prefix.
    ///
    /// # Errors
    /// Returns `AppError::Config` if the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.api_base_url
            .join(path.trim().trim_start_matches('/'))
            .map_err(|err| AppError::Config(format!("Invalid API path {path}: {err}")))
    }
}

/// Normalizes the base URL so relative joins append instead of replacing the
/// last path segment.
fn parse_base_url(raw: &str) -> Result<Url, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::Config("API base URL is not configured.".to_string()));
    }

    let mut url = Url::parse(trimmed)
        .map_err(|err| AppError::Config(format!("Invalid API base URL {trimmed}: {err}")))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(AppError::Config(format!(
                "Unsupported API URL scheme: {scheme}"
            )))
        }
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

/// Default directory for local state, `$HOME/.kinfolk`, or `.kinfolk` when no
/// home directory is known.
#[must_use]
/// Encodes an identifier for use as one path segment, so `/` or `?` inside it
/// cannot reach another endpoint.
///
/// # Errors
/// Returns `AppError::Validation` for empty, `.` or `..` identifiers.
pub fn path_segment(id: &str) -> Result<Cow<'_, str>, AppError> {
    let id = id.trim();
    if id.is_empty() || id == "." || id == ".." {
        return Err(AppError::Validation(format!("Invalid identifier: {id:?}")));
    }
    Ok(urlencoding::encode(id))
}

pub fn default_state_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(".kinfolk")
}
