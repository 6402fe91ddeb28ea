use super::{Origin, Storage, StorageEvent, Subscription, EVENT_CAPACITY};
use crate::app_lib::AppError;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tokio::sync::broadcast;
use ulid::Ulid;

/// In-process storage. Sibling handles from [`MemoryStorage::handle`] share the
/// data and the event channel but have their own origin, like browser tabs.
#[derive(Clone, Debug)]
pub struct MemoryStorage {
    origin: Origin,
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    entries: Mutex<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            origin: Ulid::new(),
            shared: Arc::new(Shared {
                entries: Mutex::new(HashMap::new()),
                events,
            }),
        }
    }

    /// A sibling handle with its own origin over the same entries.
    #[must_use]
    pub fn handle(&self) -> Self {
        Self {
            origin: Ulid::new(),
            shared: Arc::clone(&self.shared),
        }
    }

    fn write(&self, key: &str, value: Option<&str>) -> Result<(), AppError> {
        {
            let mut entries = self
                .shared
                .entries
                .lock()
                .map_err(|_| AppError::Storage("memory storage lock poisoned".to_string()))?;
            match value {
                Some(value) => entries.insert(key.to_string(), value.to_string()),
                None => entries.remove(key),
            };
        }

        // No receivers is fine: nobody is listening yet.
        let _ = self.shared.events.send(StorageEvent {
            key: key.to_string(),
            origin: self.origin,
            new_value: value.map(str::to_string),
        });
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn origin(&self) -> Origin {
        self.origin
    }

    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let entries = self
            .shared
            .entries
            .lock()
            .map_err(|_| AppError::Storage("memory storage lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.write(key, Some(value))
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        self.write(key, None)
    }

    fn subscribe(&self) -> Subscription {
        Subscription::new(self.origin, self.shared.events.subscribe())
    }
}
