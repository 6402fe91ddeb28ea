//! HTTP client for the family-sharing JSON API with consistent timeouts,
//! envelope decoding and error mapping. Feature clients call these helpers
//! instead of building requests themselves. The client reads the bearer token
//! from the injected session state but never logs it.

use super::{
    config::ClientConfig,
    errors::{ApiMessage, AppError},
};
use crate::{features::auth::state::SessionState, APP_USER_AGENT, GIT_COMMIT_HASH};
use reqwest::{
    header::{ACCEPT, CONTENT_TYPE},
    Client, Method, Response,
};
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

/// Maximum number of error body characters surfaced to the user.
const MAX_ERROR_CHARS: usize = 200;

/// Response envelope shared by every endpoint: `{ data?, messages? }`.
#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    messages: Vec<ApiMessage>,
}

/// Plain error body some endpoints return instead of an envelope.
#[derive(Debug, Deserialize)]
struct DetailBody {
    detail: String,
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    config: ClientConfig,
    session: SessionState,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_base_url", &self.config.api_base_url.as_str())
            .field("timeout", &self.config.timeout)
            .field("authenticated", &self.session.is_authenticated())
            .finish()
    }
}

impl ApiClient {
    /// Builds the client around a shared session holder.
    ///
    /// # Errors
    /// Returns `AppError::Config` if the HTTP client cannot be constructed.
    pub fn new(config: ClientConfig, session: SessionState) -> Result<Self, AppError> {
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|err| AppError::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            config,
            session,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Fetches JSON and returns the envelope's `data`.
    ///
    /// # Errors
    /// Returns the mapped transport, HTTP or decode failure.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        self.send(Method::GET, path, None).await
    }

    /// Posts JSON and returns the envelope's `data`.
    ///
    /// # Errors
    /// Returns the mapped transport, HTTP or decode failure.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, AppError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = encode(body)?;
        self.send(Method::POST, path, Some(payload)).await
    }

    /// Posts without a body, used by endpoints that only trigger server work.
    ///
    /// # Errors
    /// Returns the mapped transport, HTTP or decode failure.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        self.send(Method::POST, path, None).await
    }

    /// Patches JSON and returns the envelope's `data`.
    ///
    /// # Errors
    /// Returns the mapped transport, HTTP or decode failure.
    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T, AppError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = encode(body)?;
        self.send(Method::PATCH, path, Some(payload)).await
    }

    /// Deletes a resource and ignores any response data.
    ///
    /// # Errors
    /// Returns the mapped transport or HTTP failure.
    pub async fn delete(&self, path: &str) -> Result<(), AppError> {
        self.send::<Value>(Method::DELETE, path, None)
            .await
            .map(|_| ())
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        payload: Option<String>,
    ) -> Result<T, AppError> {
        let url = self.config.endpoint(path)?;
        let request_id = Uuid::new_v4().to_string();

        let mut builder = self
            .http
            .request(method.clone(), url)
            .header(ACCEPT, "application/json")
            .header("X-Request-Id", &request_id)
            .header("X-Kinfolk-Build", GIT_COMMIT_HASH);

        if let Some(token) = self.session.access_token() {
            builder = builder.bearer_auth(token.expose_secret());
        }

        if let Some(payload) = payload {
            builder = builder.header(CONTENT_TYPE, "application/json").body(payload);
        }

        debug!(%method, path, request_id = %request_id, "sending API request");

        let response = builder.send().await.map_err(map_request_error)?;
        handle_envelope(response, &request_id).await
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<String, AppError> {
    serde_json::to_string(body)
        .map_err(|err| AppError::Serialization(format!("Failed to encode request: {err}")))
}

/// Maps transport errors into user-facing variants with timeout detection.
fn map_request_error(err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::Timeout("Request timed out. Please try again.".to_string())
    } else {
        AppError::Network(format!("Unable to reach the server: {err}"))
    }
}

async fn handle_envelope<T: DeserializeOwned>(
    response: Response,
    request_id: &str,
) -> Result<T, AppError> {
    let status = response.status();
    let body = response.text().await.map_err(map_request_error)?;

    if status.is_success() {
        decode_data(&body)
    } else {
        let err = http_error(status.as_u16(), &body);
        warn!(
            status = status.as_u16(),
            request_id,
            keys = ?err.messages().iter().map(|m| m.i18n_key.as_str()).collect::<Vec<_>>(),
            "API request failed"
        );
        Err(err)
    }
}

/// Decodes `data` from a success body. Empty bodies decode as JSON `null`, so
/// `()` and `Option<T>` targets accept 204 responses.
fn decode_data<T: DeserializeOwned>(body: &str) -> Result<T, AppError> {
    let data = if body.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str::<Envelope>(body)
            .map_err(|err| AppError::Parse(format!("Failed to decode response: {err}")))?
            .data
            .unwrap_or(Value::Null)
    };

    serde_json::from_value(data)
        .map_err(|err| AppError::Parse(format!("Failed to decode response data: {err}")))
}

/// Builds an HTTP error, keeping structured messages when the body has them.
fn http_error(status: u16, body: &str) -> AppError {
    let mut messages = serde_json::from_str::<Envelope>(body)
        .map(|envelope| envelope.messages)
        .unwrap_or_default();

    if messages.is_empty() {
        if let Ok(detail) = serde_json::from_str::<DetailBody>(body) {
            let mut message = ApiMessage::new("detail");
            message
                .context
                .insert("message".to_string(), Value::String(detail.detail));
            messages.push(message);
        }
    }

    AppError::Http {
        status,
        message: sanitize_body(body),
        messages,
    }
}

/// Sanitizes HTTP error bodies by trimming and truncating.
fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::features::auth::types::{Session, UserProfile};
    use secrecy::SecretString;
    use serde_json::json;
    use std::path::PathBuf;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Client pointed at a mock server with an empty session.
    pub(crate) fn client_for(server: &MockServer) -> ApiClient {
        let config = ClientConfig::new(&server.uri(), PathBuf::new()).unwrap();
        ApiClient::new(config, SessionState::new()).unwrap()
    }

    pub(crate) fn session_for(token: &str) -> Session {
        Session {
            access_token: SecretString::from(token.to_string()),
            user: UserProfile {
                id: "user-1".to_string(),
                email: "ada@example.com".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                two_factor_enabled: false,
            },
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pong {
        pong: bool,
    }

    #[tokio::test]
    async fn decodes_envelope_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"pong": true},
                "messages": []
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let pong: Pong = client.get_json("/ping/").await.unwrap();
        assert_eq!(pong, Pong { pong: true });
    }

    #[tokio::test]
    async fn empty_success_decodes_as_unit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/logout/"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result: Result<(), AppError> = client.post_empty("/auth/logout/").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn error_keeps_structured_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/circle-onboarding/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "messages": [{"i18n_key": "invitations.invalid_expired", "context": {}}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .post_json::<_, Value>("/users/circle-onboarding/", &json!({"token": "t"}))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(400));
        assert!(err.has_key("invalid_expired"));
    }

    #[tokio::test]
    async fn detail_body_becomes_a_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(json!({"detail": "You do not have permission."})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.get_json::<Value>("/users/me/").await.unwrap_err();
        assert_eq!(err.messages().len(), 1);
        assert_eq!(err.messages()[0].text(), Some("You do not have permission."));
    }

    #[tokio::test]
    async fn attaches_bearer_token_from_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/"))
            .and(header("Authorization", "Bearer session-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": null})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.session().set(session_for("session-token")).unwrap();
        let value: Option<Value> = client.get_json("/users/me/").await.unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn sanitize_body_trims_and_truncates() {
        assert_eq!(sanitize_body("   "), "Request failed.");
        let long = "x".repeat(500);
        assert_eq!(sanitize_body(&long).len(), MAX_ERROR_CHARS);
    }
}
