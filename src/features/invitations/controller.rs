//! Invitation acceptance controller.
//!
//! ```text
//! Loading -> Pending -> Finalizing -> Accepted | Declined
//!    \          \            \
//!     +----------+------------+--> Expired | Error(message)
//! (no token) -> Invalid
//! ```
//!
//! `sync` is the mount/render step and is safe to call repeatedly:
//! - the start-onboarding request is sent at most once per token at a time,
//!   guarded by the context's in-flight registry;
//! - auto-finalization runs at most once per controller and token;
//! - nothing is retried automatically after a failure.
//!
//! The invitation and onboarding token are mirrored in storage so the flow
//! survives a detour through login or signup, and so other handles on the same
//! storage pick the result up through change events.

use crate::{
    app_lib::{extract_error_message, AppError, ErrorClass, GENERIC_ERROR},
    context::AppContext,
    features::invitations::{
        cache::{self, CachedInvitation, INVITATION_CACHE_KEY},
        client,
        types::{Invitation, OnboardingToken},
    },
    routes::{invitation_resume_path, Navigation},
    storage::{StorageEvent, Subscription},
};
use std::fmt;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use url::Url;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvitationStatus {
    Loading,
    /// Invitation loaded; waiting for the user (or for authentication).
    Pending,
    Finalizing,
    Accepted,
    Declined,
    /// No invitation token in the link.
    Invalid,
    /// The server no longer recognizes the token; a fresh invitation is needed.
    Expired,
    Error(String),
}

impl InvitationStatus {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Accepted | Self::Declined | Self::Invalid | Self::Expired | Self::Error(_)
        )
    }
}

enum Wake {
    Storage(Option<StorageEvent>),
    Released(bool),
}

pub struct InvitationController {
    ctx: AppContext,
    token: Option<String>,
    link_onboarding_token: Option<OnboardingToken>,
    status: InvitationStatus,
    cached: Option<CachedInvitation>,
    finalize_attempted: bool,
    auto_finalize: bool,
    redirect_pending: bool,
    subscription: Subscription,
    released: watch::Receiver<u64>,
}

impl fmt::Debug for InvitationController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvitationController")
            .field("has_token", &self.token.is_some())
            .field("status", &self.status)
            .field("cached", &self.cached)
            .field("finalize_attempted", &self.finalize_attempted)
            .finish_non_exhaustive()
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

impl InvitationController {
    /// Creates a controller for the token (and optional onboarding token)
    /// found in the invitation link. Nothing is requested until [`Self::sync`].
    #[must_use]
    pub fn new(ctx: AppContext, token: Option<&str>, onboarding_token: Option<&str>) -> Self {
        let subscription = ctx.storage().subscribe();
        let released = ctx.in_flight().subscribe();
        Self {
            ctx,
            token: non_empty(token),
            link_onboarding_token: non_empty(onboarding_token).map(OnboardingToken::new),
            status: InvitationStatus::Loading,
            cached: None,
            finalize_attempted: false,
            auto_finalize: true,
            redirect_pending: false,
            subscription,
            released,
        }
    }

    /// Creates a controller from an invitation link such as
    /// `https://kinfolk.app/invitations/accept?token=...` or its path alone.
    #[must_use]
    pub fn from_link(ctx: AppContext, link: &str) -> Self {
        let (token, onboarding_token) = parse_link(link);
        Self::new(ctx, token.as_deref(), onboarding_token.as_deref())
    }

    /// Disables the automatic accept on sync, for callers that want to
    /// decline or confirm explicitly.
    #[must_use]
    pub fn with_auto_finalize(mut self, enabled: bool) -> Self {
        self.auto_finalize = enabled;
        self
    }

    #[must_use]
    pub fn status(&self) -> &InvitationStatus {
        &self.status
    }

    #[must_use]
    pub fn invitation(&self) -> Option<&Invitation> {
        self.cached.as_ref().and_then(|entry| entry.invitation.as_ref())
    }

    #[must_use]
    pub fn has_onboarding_token(&self) -> bool {
        self.onboarding_token().is_some()
    }

    /// Points the controller at another link token. A different token restarts
    /// the flow from `Loading`; the next sync drops a cache entry made for the
    /// old one.
    pub fn set_token(&mut self, token: Option<&str>, onboarding_token: Option<&str>) {
        let token = non_empty(token);
        if token == self.token {
            return;
        }
        debug!("invitation token changed");
        self.status = if token.is_some() {
            InvitationStatus::Loading
        } else {
            InvitationStatus::Invalid
        };
        self.token = token;
        self.link_onboarding_token = non_empty(onboarding_token).map(OnboardingToken::new);
        self.cached = None;
        self.finalize_attempted = false;
        self.redirect_pending = false;
    }

    /// Brings the controller up to date with the link token, the storage
    /// mirror and the session. Call it on every render and after the session
    /// changes.
    #[instrument(skip(self))]
    pub async fn sync(&mut self) -> &InvitationStatus {
        self.released.borrow_and_update();

        let Some(token) = self.token.clone() else {
            self.status = InvitationStatus::Invalid;
            return &self.status;
        };
        if self.status.is_terminal() {
            return &self.status;
        }

        let Some(entry) = self.resolve_entry(&token).await else {
            return &self.status;
        };
        let onboarding_token = entry.onboarding_token.clone();
        self.cached = Some(entry);
        if self.status == InvitationStatus::Loading {
            self.status = InvitationStatus::Pending;
        }

        if let Some(onboarding_token) = onboarding_token {
            let ready = self.auto_finalize
                && self.status == InvitationStatus::Pending
                && !self.finalize_attempted
                && self.ctx.session().is_authenticated();
            if ready {
                self.finalize_attempted = true;
                debug!("finalizing invitation for authenticated user");
                if self.finalize(&onboarding_token).await.is_err() {
                    debug!("automatic finalization failed");
                }
            }
        }

        &self.status
    }

    /// Accepts the invitation. Unauthenticated users get the login or signup
    /// route to follow first; the flow resumes from the `next` path.
    ///
    /// # Errors
    /// Returns a validation error when there is nothing to accept, or the
    /// server's failure (also reflected in [`Self::status`]).
    #[instrument(skip(self))]
    pub async fn accept(&mut self) -> Result<Option<Navigation>, AppError> {
        let onboarding_token = self.decision_token()?;
        if !self.ctx.session().is_authenticated() {
            return Ok(Some(self.auth_redirect()));
        }

        self.finalize_attempted = true;
        self.finalize(&onboarding_token).await?;
        Ok(None)
    }

    /// Declines the invitation; requires authentication like [`Self::accept`].
    ///
    /// # Errors
    /// Returns a validation error when there is nothing to decline, or the
    /// server's failure.
    #[instrument(skip(self))]
    pub async fn decline(&mut self) -> Result<Option<Navigation>, AppError> {
        let onboarding_token = self.decision_token()?;
        if !self.ctx.session().is_authenticated() {
            return Ok(Some(self.auth_redirect()));
        }

        self.status = InvitationStatus::Finalizing;
        match client::decline_invitation(self.ctx.api(), &onboarding_token).await {
            Ok(_) => {
                info!("invitation declined");
                self.discard_cache();
                self.status = InvitationStatus::Declined;
                Ok(None)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Home, exactly once, after the invitation was accepted.
    pub fn take_redirect(&mut self) -> Option<Navigation> {
        if self.redirect_pending {
            self.redirect_pending = false;
            Some(Navigation::Home)
        } else {
            None
        }
    }

    /// Whether a storage change made elsewhere concerns this controller.
    #[must_use]
    pub fn on_storage_event(&self, event: &StorageEvent) -> bool {
        if event.key != INVITATION_CACHE_KEY || self.status.is_terminal() {
            return false;
        }
        match (
            cache::decode(event.new_value.as_deref()),
            self.token.as_deref(),
        ) {
            (Some(entry), Some(token)) => entry.matches(token),
            // Removed elsewhere: accepted, declined or expired in another handle.
            (None, _) => event.new_value.is_none() && self.cached.is_some(),
            (Some(_), None) => false,
        }
    }

    /// Applies queued external changes without waiting. Returns `true` when
    /// the controller re-synced.
    pub async fn poll_external(&mut self) -> bool {
        let mut relevant = false;
        while let Some(event) = self.subscription.try_recv_external() {
            relevant |= self.on_storage_event(&event);
        }
        relevant |= self.released.has_changed().unwrap_or(false);

        if relevant {
            self.sync().await;
        }
        relevant
    }

    /// Waits until another handle changes the invitation cache, or another
    /// controller finishes an in-flight request, then re-syncs.
    pub async fn next_external_change(&mut self) -> &InvitationStatus {
        loop {
            let wake = tokio::select! {
                event = self.subscription.recv_external() => Wake::Storage(event),
                changed = self.released.changed() => Wake::Released(changed.is_ok()),
            };
            match wake {
                Wake::Storage(Some(event)) if self.on_storage_event(&event) => break,
                Wake::Storage(Some(_)) => {}
                Wake::Released(true) => break,
                Wake::Storage(None) | Wake::Released(false) => return &self.status,
            }
        }
        self.sync().await
    }

    async fn resolve_entry(&mut self, token: &str) -> Option<CachedInvitation> {
        match cache::load(self.ctx.storage()) {
            Ok(Some(entry)) if entry.matches(token) => return Some(entry),
            Ok(Some(_)) => {
                info!("cached invitation belongs to another link; restarting");
                self.discard_cache();
                self.cached = None;
                self.finalize_attempted = false;
                self.status = InvitationStatus::Loading;
            }
            Ok(None) => {}
            Err(err) => {
                self.fail(err);
                return None;
            }
        }

        if let Some(onboarding_token) = self.link_onboarding_token.take() {
            debug!("adopting onboarding token from link");
            let entry = CachedInvitation {
                source_token: token.to_string(),
                invitation: None,
                onboarding_token: Some(onboarding_token),
            };
            self.store_cache(&entry);
            return Some(entry);
        }

        self.start_onboarding(token).await
    }

    async fn start_onboarding(&mut self, token: &str) -> Option<CachedInvitation> {
        let Some(_claim) = self.ctx.in_flight().try_claim(token) else {
            debug!("invitation start already in flight");
            return None;
        };

        // Another controller may have finished between the cache read and the claim.
        if let Ok(Some(entry)) = cache::load(self.ctx.storage()) {
            if entry.matches(token) {
                return Some(entry);
            }
        }

        match client::start_onboarding(self.ctx.api(), token).await {
            Ok(response) => {
                info!(existing_user = response.invitation.existing_user, "invitation loaded");
                let entry = CachedInvitation {
                    source_token: token.to_string(),
                    invitation: Some(response.invitation),
                    onboarding_token: Some(response.onboarding_token),
                };
                self.store_cache(&entry);
                Some(entry)
            }
            Err(err) => {
                self.fail(err);
                None
            }
        }
    }

    async fn finalize(&mut self, onboarding_token: &OnboardingToken) -> Result<(), AppError> {
        self.status = InvitationStatus::Finalizing;
        match client::accept_invitation(self.ctx.api(), onboarding_token).await {
            Ok(decision) => {
                info!(
                    circle = ?decision.and_then(|d| d.circle_name),
                    "invitation accepted"
                );
                self.discard_cache();
                self.status = InvitationStatus::Accepted;
                self.redirect_pending = true;
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn decision_token(&self) -> Result<OnboardingToken, AppError> {
        match self.status {
            InvitationStatus::Pending | InvitationStatus::Error(_) => {}
            InvitationStatus::Finalizing => {
                return Err(AppError::Validation(
                    "This invitation is already being processed.".to_string(),
                ))
            }
            _ => {
                return Err(AppError::Validation(
                    "This invitation can no longer be answered.".to_string(),
                ))
            }
        }
        self.onboarding_token().cloned().ok_or_else(|| {
            AppError::Validation("This invitation has not finished loading.".to_string())
        })
    }

    fn auth_redirect(&self) -> Navigation {
        let next = Some(invitation_resume_path(
            self.token.as_deref().unwrap_or_default(),
            self.onboarding_token().map(OnboardingToken::expose),
        ));
        // Without details, assume an account exists; login links to signup.
        let existing_user = self.invitation().map_or(true, |inv| inv.existing_user);
        if existing_user {
            Navigation::Login { next }
        } else {
            Navigation::Signup { next }
        }
    }

    fn onboarding_token(&self) -> Option<&OnboardingToken> {
        self.cached
            .as_ref()
            .and_then(|entry| entry.onboarding_token.as_ref())
    }

    fn store_cache(&self, entry: &CachedInvitation) {
        if let Err(err) = cache::store(self.ctx.storage(), entry) {
            warn!("Failed to cache invitation: {err}");
        }
    }

    /// Removes the stored mirror and forgets the onboarding token.
    fn discard_cache(&mut self) {
        if let Err(err) = cache::clear(self.ctx.storage()) {
            warn!("Failed to clear invitation cache: {err}");
        }
        if let Some(entry) = self.cached.as_mut() {
            entry.onboarding_token = None;
        }
    }

    fn fail(&mut self, err: AppError) -> AppError {
        if err.class() == ErrorClass::Expired {
            warn!("invitation token expired or unknown");
            self.discard_cache();
            self.status = InvitationStatus::Expired;
        } else {
            self.status = InvitationStatus::Error(extract_error_message(&err, GENERIC_ERROR));
        }
        err
    }
}

/// Extracts `token` and `onboarding_token` from an absolute or relative link.
fn parse_link(link: &str) -> (Option<String>, Option<String>) {
    let link = link.trim();
    let parsed = Url::parse(link).or_else(|_| {
        Url::parse("http://localhost/").and_then(|base| base.join(link))
    });
    let Ok(url) = parsed else {
        return (None, None);
    };

    let mut token = None;
    let mut onboarding_token = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "token" => token = Some(value.into_owned()),
            "onboarding_token" => onboarding_token = Some(value.into_owned()),
            _ => {}
        }
    }
    (token, onboarding_token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        app_lib::api::tests::session_for, context::tests::context_for, storage::MemoryStorage,
    };
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn start_body(existing_user: bool) -> serde_json::Value {
        json!({"data": {
            "invitation": {
                "id": "inv-1",
                "email": "bo@example.com",
                "existing_user": existing_user,
                "circle_name": "The Smiths"
            },
            "onboarding_token": "onb-1"
        }})
    }

    async fn mount_start(server: &MockServer, token: &str, expected: u64) {
        Mock::given(method("POST"))
            .and(path("/users/circle-onboarding/"))
            .and(body_json(json!({"token": token})))
            .respond_with(ResponseTemplate::new(200).set_body_json(start_body(true)))
            .expect(expected)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn missing_token_is_invalid() {
        let server = MockServer::start().await;
        let storage = MemoryStorage::new();
        let mut controller = InvitationController::new(context_for(&server, &storage), None, None);
        assert_eq!(controller.sync().await, &InvitationStatus::Invalid);

        let mut controller =
            InvitationController::new(context_for(&server, &storage), Some("  "), None);
        assert_eq!(controller.sync().await, &InvitationStatus::Invalid);
    }

    #[tokio::test]
    async fn finalizes_once_across_repeated_syncs() {
        let server = MockServer::start().await;
        mount_start(&server, "invite-1", 1).await;
        Mock::given(method("POST"))
            .and(path("/users/invitations/accept/"))
            .and(body_json(json!({"onboarding_token": "onb-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"circle_id": "c1", "circle_name": "The Smiths"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let storage = MemoryStorage::new();
        let ctx = context_for(&server, &storage);
        ctx.session().set(session_for("tok")).unwrap();

        let mut controller = InvitationController::new(ctx, Some("invite-1"), None);
        for _ in 0..3 {
            controller.sync().await;
        }

        assert_eq!(controller.status(), &InvitationStatus::Accepted);
        assert_eq!(controller.take_redirect(), Some(Navigation::Home));
        assert_eq!(controller.take_redirect(), None);
        assert!(cache::load(&storage).unwrap().is_none());
        assert!(!controller.has_onboarding_token());
    }

    #[tokio::test]
    async fn failed_finalization_is_not_retried() {
        let server = MockServer::start().await;
        mount_start(&server, "invite-1", 1).await;
        Mock::given(method("POST"))
            .and(path("/users/invitations/accept/"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let storage = MemoryStorage::new();
        let ctx = context_for(&server, &storage);
        ctx.session().set(session_for("tok")).unwrap();

        let mut controller = InvitationController::new(ctx, Some("invite-1"), None);
        controller.sync().await;
        controller.sync().await;

        assert_eq!(
            controller.status(),
            &InvitationStatus::Error(GENERIC_ERROR.to_string())
        );
        assert_eq!(controller.take_redirect(), None);
    }

    #[tokio::test]
    async fn expired_token_reaches_expired_not_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/circle-onboarding/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "messages": [{"i18n_key": "invitations.invalid_expired", "context": {}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let storage = MemoryStorage::new();
        let mut controller =
            InvitationController::new(context_for(&server, &storage), Some("dead"), None);

        assert_eq!(controller.sync().await, &InvitationStatus::Expired);
        // Terminal: no automatic retry on the next render.
        assert_eq!(controller.sync().await, &InvitationStatus::Expired);
        assert!(cache::load(&storage).unwrap().is_none());
    }

    #[tokio::test]
    async fn expiry_during_finalize_drops_cached_token() {
        let server = MockServer::start().await;
        mount_start(&server, "invite-1", 1).await;
        Mock::given(method("POST"))
            .and(path("/users/invitations/accept/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "messages": [{"i18n_key": "invitations.invalid_expired", "context": {}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let storage = MemoryStorage::new();
        let ctx = context_for(&server, &storage);
        ctx.session().set(session_for("tok")).unwrap();

        let mut controller = InvitationController::new(ctx, Some("invite-1"), None);
        assert_eq!(controller.sync().await, &InvitationStatus::Expired);
        assert!(cache::load(&storage).unwrap().is_none());
        assert!(!controller.has_onboarding_token());
        assert_eq!(controller.take_redirect(), None);

        // Terminal: neither start nor finalize is repeated.
        assert_eq!(controller.sync().await, &InvitationStatus::Expired);
    }

    #[tokio::test]
    async fn other_failures_surface_as_error_with_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/circle-onboarding/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "messages": [{"i18n_key": "invitations.email_mismatch", "context": {}}]
            })))
            .mount(&server)
            .await;

        let storage = MemoryStorage::new();
        let mut controller =
            InvitationController::new(context_for(&server, &storage), Some("t"), None);

        assert_eq!(
            controller.sync().await,
            &InvitationStatus::Error(
                "This invitation was sent to a different email address.".to_string()
            )
        );
    }

    #[tokio::test]
    async fn switching_token_clears_cache_and_restarts() {
        let server = MockServer::start().await;
        mount_start(&server, "new-token", 1).await;
        mount_start(&server, "old-token", 0).await;

        let storage = MemoryStorage::new();
        cache::store(
            &storage,
            &CachedInvitation {
                source_token: "old-token".to_string(),
                invitation: None,
                onboarding_token: Some(OnboardingToken::new("old-onb")),
            },
        )
        .unwrap();

        let mut controller =
            InvitationController::new(context_for(&server, &storage), Some("old-token"), None);
        assert_eq!(controller.sync().await, &InvitationStatus::Pending);

        controller.set_token(Some("new-token"), None);
        assert_eq!(controller.status(), &InvitationStatus::Loading);
        assert!(!controller.has_onboarding_token());

        assert_eq!(controller.sync().await, &InvitationStatus::Pending);
        let entry = cache::load(&storage).unwrap().unwrap();
        assert!(entry.matches("new-token"));
        assert_eq!(entry.onboarding_token, Some(OnboardingToken::new("onb-1")));
    }

    #[tokio::test]
    async fn unauthenticated_accept_redirects_with_resume_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/circle-onboarding/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(start_body(false)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/users/invitations/accept/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let storage = MemoryStorage::new();
        let mut controller =
            InvitationController::new(context_for(&server, &storage), Some("invite-1"), None);
        controller.sync().await;

        let redirect = controller.accept().await.unwrap();
        assert_eq!(
            redirect,
            Some(Navigation::Signup {
                next: Some("/invitations/accept?token=invite-1&onboarding_token=onb-1".to_string())
            })
        );
        assert_eq!(controller.status(), &InvitationStatus::Pending);
    }

    #[tokio::test]
    async fn decline_clears_cache() {
        let server = MockServer::start().await;
        mount_start(&server, "invite-1", 1).await;
        Mock::given(method("POST"))
            .and(path("/users/invitations/decline/"))
            .and(body_json(json!({"onboarding_token": "onb-1"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let storage = MemoryStorage::new();
        let ctx = context_for(&server, &storage);
        let mut controller = InvitationController::new(ctx.clone(), Some("invite-1"), None);
        controller.sync().await;

        // Authenticate after loading so the decision is made before finalization.
        ctx.session().set(session_for("tok")).unwrap();
        assert_eq!(controller.decline().await.unwrap(), None);
        assert_eq!(controller.status(), &InvitationStatus::Declined);
        assert!(cache::load(&storage).unwrap().is_none());
        assert!(controller.accept().await.is_err());
    }

    #[tokio::test]
    async fn signed_in_decline_without_auto_finalize() {
        let server = MockServer::start().await;
        mount_start(&server, "invite-1", 1).await;
        Mock::given(method("POST"))
            .and(path("/users/invitations/accept/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/users/invitations/decline/"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let storage = MemoryStorage::new();
        let ctx = context_for(&server, &storage);
        ctx.session().set(session_for("tok")).unwrap();

        let mut controller = InvitationController::new(ctx, Some("invite-1"), None)
            .with_auto_finalize(false);
        assert_eq!(controller.sync().await, &InvitationStatus::Pending);
        assert_eq!(controller.decline().await.unwrap(), None);
        assert_eq!(controller.status(), &InvitationStatus::Declined);
    }

    #[tokio::test]
    async fn onboarding_token_from_link_skips_start_request() {
        let server = MockServer::start().await;
        mount_start(&server, "invite-1", 0).await;
        Mock::given(method("POST"))
            .and(path("/users/invitations/accept/"))
            .and(body_json(json!({"onboarding_token": "from-link"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
            .expect(1)
            .mount(&server)
            .await;

        let storage = MemoryStorage::new();
        let ctx = context_for(&server, &storage);
        ctx.session().set(session_for("tok")).unwrap();

        let mut controller = InvitationController::from_link(
            ctx,
            "/invitations/accept?token=invite-1&onboarding_token=from-link",
        );
        assert_eq!(controller.sync().await, &InvitationStatus::Accepted);
    }

    #[tokio::test]
    async fn concurrent_controllers_share_one_start_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/circle-onboarding/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(start_body(true))
                    .set_delay(Duration::from_millis(100)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let storage = MemoryStorage::new();
        let ctx = context_for(&server, &storage);
        let mut first = InvitationController::new(ctx.clone(), Some("invite-1"), None);
        let mut second = InvitationController::new(ctx, Some("invite-1"), None);

        let (a, b) = tokio::join!(first.sync(), second.sync());
        assert_eq!(a, &InvitationStatus::Pending);
        assert_eq!(b, &InvitationStatus::Loading);

        assert_eq!(
            second.next_external_change().await,
            &InvitationStatus::Pending
        );
        assert_eq!(second.invitation().map(|inv| inv.id.as_str()), Some("inv-1"));
    }

    #[tokio::test]
    async fn other_handle_picks_up_cached_invitation() {
        let server = MockServer::start().await;
        mount_start(&server, "invite-1", 1).await;

        let storage = MemoryStorage::new();
        let other_tab = storage.handle();
        let mut first =
            InvitationController::new(context_for(&server, &storage), Some("invite-1"), None);
        let mut second =
            InvitationController::new(context_for(&server, &other_tab), Some("invite-1"), None);

        first.sync().await;
        assert!(second.poll_external().await);
        assert_eq!(second.status(), &InvitationStatus::Pending);
        assert!(second.has_onboarding_token());
    }

    #[tokio::test]
    async fn events_for_other_tokens_are_ignored() {
        let server = MockServer::start().await;
        let storage = MemoryStorage::new();
        let controller =
            InvitationController::new(context_for(&server, &storage), Some("mine"), None);

        let entry = CachedInvitation {
            source_token: "theirs".to_string(),
            invitation: None,
            onboarding_token: None,
        };
        let event = StorageEvent {
            key: INVITATION_CACHE_KEY.to_string(),
            origin: ulid::Ulid::new(),
            new_value: Some(serde_json::to_string(&entry).unwrap()),
        };
        assert!(!controller.on_storage_event(&event));

        let unrelated = StorageEvent {
            key: "kinfolk.session".to_string(),
            ..event
        };
        assert!(!controller.on_storage_event(&unrelated));
    }

    #[test]
    fn parses_absolute_and_relative_links() {
        assert_eq!(
            parse_link("https://kinfolk.app/invitations/accept?token=abc&onboarding_token=xyz"),
            (Some("abc".to_string()), Some("xyz".to_string()))
        );
        assert_eq!(
            parse_link("/invitations/accept?token=a%2Bb"),
            (Some("a+b".to_string()), None)
        );
        assert_eq!(parse_link("/invitations/accept"), (None, None));
    }
}
