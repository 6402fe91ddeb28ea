//! Explicit application context handed to every flow controller: the API
//! client (which carries the session holder), the storage backend, and the
//! registry of in-flight one-shot requests shared by controllers of the same
//! process.

use crate::{
    app_lib::{ApiClient, AppError, ClientConfig},
    features::auth::state::SessionState,
    storage::{FileStorage, Storage},
};
use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::sync::watch;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct AppContext {
    api: ApiClient,
    storage: Arc<dyn Storage>,
    in_flight: InFlight,
}

impl AppContext {
    #[must_use]
    pub fn new(api: ApiClient, storage: Arc<dyn Storage>) -> Self {
        Self {
            api,
            storage,
            in_flight: InFlight::default(),
        }
    }

    /// Builds a context on any storage backend, restoring the persisted session.
    ///
    /// # Errors
    /// Returns storage or HTTP client construction failures.
    pub fn with_storage(config: ClientConfig, storage: Arc<dyn Storage>) -> Result<Self, AppError> {
        let session = SessionState::restore(Arc::clone(&storage))?;
        let api = ApiClient::new(config, session)?;
        Ok(Self::new(api, storage))
    }

    /// Builds a context backed by a [`FileStorage`] under the configured state dir.
    ///
    /// # Errors
    /// Returns storage or HTTP client construction failures.
    pub fn from_config(config: ClientConfig) -> Result<Self, AppError> {
        let storage = FileStorage::open(&config.state_dir)?;
        debug!(path = %storage.path().display(), "opened state file");
        Self::with_storage(config, Arc::new(storage))
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    #[must_use]
    pub fn session(&self) -> &SessionState {
        self.api.session()
    }

    #[must_use]
    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    #[must_use]
    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }
}

/// Keys with a request outstanding. Claiming returns a guard; dropping the
/// guard releases the key and wakes every [`InFlight::subscribe`] receiver.
#[derive(Clone, Debug)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
    released: Arc<watch::Sender<u64>>,
}

impl Default for InFlight {
    fn default() -> Self {
        let (released, _) = watch::channel(0);
        Self {
            keys: Arc::default(),
            released: Arc::new(released),
        }
    }
}

impl InFlight {
    /// Claims `key`, or returns `None` while another claim is outstanding.
    #[must_use]
    pub fn try_claim(&self, key: &str) -> Option<InFlightGuard> {
        let inserted = self
            .keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string());
        inserted.then(|| InFlightGuard {
            owner: self.clone(),
            key: key.to_string(),
        })
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    /// Receiver that changes whenever any claim is released.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.released.subscribe()
    }

    fn release(&self, key: &str) {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        self.released.send_modify(|generation| *generation = generation.wrapping_add(1));
    }
}

#[derive(Debug)]
pub struct InFlightGuard {
    owner: InFlight,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.owner.release(&self.key);
    }
}
