//! Shared client utilities: the API client, configuration and error handling.
//!
//! ## Response envelope
//!
//! Every endpoint answers `{ "data": ..., "messages": [{ "i18n_key", "context" }] }`.
//! Success returns `data`; failures keep `messages` so callers can classify
//! them (for example `invitations.invalid_expired`) instead of matching on text.
//!
//! Centralizing these helpers keeps network behavior consistent and avoids
//! duplicated request setup in the feature modules. Callers must still avoid
//! logging tokens or codes.

pub mod api;
pub mod config;
pub mod errors;

pub use api::ApiClient;
pub use config::{path_segment, ClientConfig};
pub use errors::{extract_error_message, ApiMessage, AppError, ErrorClass, GENERIC_ERROR};
