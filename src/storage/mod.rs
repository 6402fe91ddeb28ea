//! Key/value storage standing in for browser local storage.
//!
//! Every handle has an **origin**. Writes publish a [`StorageEvent`] tagged with
//! the writer's origin, and [`Subscription::recv_external`] skips events from
//! the subscriber's own handle. Subscribers therefore hear only about changes
//! made elsewhere: another handle on the same [`MemoryStorage`], or another
//! process writing the same [`FileStorage`] file.
//!
//! Contract: subscribers are notified when the invitation cache changes
//! externally.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::app_lib::AppError;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use ulid::Ulid;

/// Capacity of the change-event channel; slow subscribers skip lagged events.
pub(crate) const EVENT_CAPACITY: usize = 64;

/// Identifies the handle that made a change.
pub type Origin = Ulid;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub origin: Origin,
    /// Value after the change; `None` when the key was removed.
    pub new_value: Option<String>,
}

pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Origin stamped on events produced by this handle.
    fn origin(&self) -> Origin;

    /// # Errors
    /// Returns `AppError::Storage` if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    /// # Errors
    /// Returns `AppError::Storage` if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), AppError>;

    /// # Errors
    /// Returns `AppError::Storage` if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<(), AppError>;

    /// Subscribes to changes; see [`Subscription::recv_external`].
    fn subscribe(&self) -> Subscription;
}

/// Receiver side of the storage change feed.
#[derive(Debug)]
pub struct Subscription {
    origin: Origin,
    receiver: broadcast::Receiver<StorageEvent>,
}

impl Subscription {
    pub(crate) fn new(origin: Origin, receiver: broadcast::Receiver<StorageEvent>) -> Self {
        Self { origin, receiver }
    }

    /// Waits for the next change made by another origin.
    /// Returns `None` once the storage is gone.
    pub async fn recv_external(&mut self) -> Option<StorageEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.origin == self.origin => {}
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "storage subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns an already queued external change without waiting.
    pub fn try_recv_external(&mut self) -> Option<StorageEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if event.origin == self.origin => {}
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

/// Reads and deserializes a JSON value stored under `key`.
///
/// # Errors
/// Returns `AppError::Storage` on read failures and undecodable values.
pub fn get_json<T: serde::de::DeserializeOwned>(
    storage: &dyn Storage,
    key: &str,
) -> Result<Option<T>, AppError> {
    storage
        .get(key)?
        .map(|raw| {
            serde_json::from_str(&raw)
                .map_err(|err| AppError::Storage(format!("Corrupt value under {key}: {err}")))
        })
        .transpose()
}

/// Serializes `value` as JSON under `key`.
///
/// # Errors
/// Returns `AppError::Storage` on encode or write failures.
pub fn set_json<T: serde::Serialize>(
    storage: &dyn Storage,
    key: &str,
    value: &T,
) -> Result<(), AppError> {
    let raw = serde_json::to_string(value)
        .map_err(|err| AppError::Storage(format!("Failed to encode {key}: {err}")))?;
    storage.set(key, &raw)
}
