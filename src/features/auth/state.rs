//! Session state holder shared through [`crate::context::AppContext`].
//!
//! The holder wraps a `tokio::sync::watch` channel: readers take snapshots,
//! subscribers get a receiver and unsubscribe by dropping it. When a storage
//! backend is attached the session is mirrored under [`SESSION_KEY`] so a new
//! process can restore it.

use crate::{
    app_lib::AppError,
    features::auth::types::{Session, UserProfile},
    storage::{self, Storage},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

pub const SESSION_KEY: &str = "kinfolk.session";

#[derive(Serialize, Deserialize)]
struct PersistedSession {
    access_token: String,
    user: UserProfile,
}

#[derive(Clone, Debug)]
pub struct SessionState {
    sender: Arc<watch::Sender<Option<Session>>>,
    storage: Option<Arc<dyn Storage>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// In-memory session state, nothing is persisted.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender: Arc::new(sender),
            storage: None,
        }
    }

    /// Session state mirrored to `storage`, restoring any persisted session.
    ///
    /// # Errors
    /// Returns `AppError::Storage` if the persisted session cannot be read.
    pub fn restore(storage: Arc<dyn Storage>) -> Result<Self, AppError> {
        let persisted: Option<PersistedSession> = storage::get_json(storage.as_ref(), SESSION_KEY)?;
        let session = persisted.map(|p| Session {
            access_token: SecretString::from(p.access_token),
            user: p.user,
        });

        debug!(restored = session.is_some(), "session state ready");

        let (sender, _) = watch::channel(session);
        Ok(Self {
            sender: Arc::new(sender),
            storage: Some(storage),
        })
    }

    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.sender.borrow().clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.sender.borrow().is_some()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.sender
            .borrow()
            .as_ref()
            .map(|session| session.access_token.clone())
    }

    /// Installs a session after login or 2FA verification.
    ///
    /// # Errors
    /// Returns `AppError::Storage` if the session cannot be persisted; the
    /// in-memory state is updated regardless.
    pub fn set(&self, session: Session) -> Result<(), AppError> {
        let persisted = PersistedSession {
            access_token: session.access_token.expose_secret().to_string(),
            user: session.user.clone(),
        };
        self.sender.send_replace(Some(session));

        match &self.storage {
            Some(storage) => storage::set_json(storage.as_ref(), SESSION_KEY, &persisted),
            None => Ok(()),
        }
    }

    /// Replaces the user profile of the current session, if any.
    ///
    /// # Errors
    /// Returns `AppError::Storage` if the session cannot be persisted.
    pub fn update_user(&self, user: UserProfile) -> Result<(), AppError> {
        match self.current() {
            Some(mut session) => {
                session.user = user;
                self.set(session)
            }
            None => Ok(()),
        }
    }

    /// Clears the session, typically on logout.
    ///
    /// # Errors
    /// Returns `AppError::Storage` if the persisted copy cannot be removed.
    pub fn clear(&self) -> Result<(), AppError> {
        self.sender.send_replace(None);
        match &self.storage {
            Some(storage) => storage.remove(SESSION_KEY),
            None => Ok(()),
        }
    }

    /// Subscribes to session changes; drop the receiver to unsubscribe.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.sender.subscribe()
    }
}
