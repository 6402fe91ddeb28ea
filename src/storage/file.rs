use super::{Origin, Storage, StorageEvent, Subscription, EVENT_CAPACITY};
use crate::app_lib::AppError;
use std::{
    collections::HashMap,
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};
use tempfile::NamedTempFile;
use tokio::{sync::broadcast, task::JoinHandle, time::interval};
use tracing::{debug, warn};
use ulid::Ulid;

const STORAGE_FILE: &str = "storage.json";

/// JSON-file storage shared between processes.
///
/// Each handle remembers the entries it last saw. Differences found on disk
/// that this handle did not write are published as external events, either
/// by [`FileStorage::poll_changes`] or by the task from [`FileStorage::watch`].
#[derive(Debug)]
pub struct FileStorage {
    origin: Origin,
    external_origin: Origin,
    path: PathBuf,
    known: Mutex<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
}

impl FileStorage {
    /// Opens (or creates) the storage file inside `dir`.
    ///
    /// # Errors
    /// Returns `AppError::Storage` if the directory cannot be created or the
    /// existing file cannot be parsed.
    pub fn open(dir: &Path) -> Result<Self, AppError> {
        fs::create_dir_all(dir).map_err(|err| {
            AppError::Storage(format!("Failed to create {}: {err}", dir.display()))
        })?;

        let path = dir.join(STORAGE_FILE);
        let known = read_entries(&path)?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        debug!(path = %path.display(), entries = known.len(), "opened file storage");

        Ok(Self {
            origin: Ulid::new(),
            external_origin: Ulid::new(),
            path,
            known: Mutex::new(known),
            events,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Compares the file with the last seen entries and publishes every
    /// difference as an external change. Returns how many keys changed.
    ///
    /// # Errors
    /// Returns `AppError::Storage` if the file cannot be read.
    pub fn poll_changes(&self) -> Result<usize, AppError> {
        let mut known = self.lock_known()?;
        let current = read_entries(&self.path)?;
        let changes = diff(&known, &current, self.external_origin);
        let count = changes.len();

        *known = current;
        drop(known);

        for event in changes {
            let _ = self.events.send(event);
        }
        Ok(count)
    }

    /// Spawns a task polling the file every `every`. The task stops on its own
    /// once the storage is dropped.
    pub fn watch(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let storage = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = interval(every);
            loop {
                ticker.tick().await;
                let Some(storage) = storage.upgrade() else {
                    break;
                };
                if let Err(err) = storage.poll_changes() {
                    warn!("Failed to poll file storage: {err}");
                }
            }
        })
    }

    fn lock_known(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, AppError> {
        self.known
            .lock()
            .map_err(|_| AppError::Storage("file storage lock poisoned".to_string()))
    }

    fn write(&self, key: &str, value: Option<&str>) -> Result<(), AppError> {
        let mut known = self.lock_known()?;
        let mut current = read_entries(&self.path)?;

        // Changes made by others since the last look are still theirs.
        let mut pending = diff(&known, &current, self.external_origin);

        match value {
            Some(value) => current.insert(key.to_string(), value.to_string()),
            None => current.remove(key),
        };
        write_entries(&self.path, &current)?;
        *known = current;
        drop(known);

        pending.push(StorageEvent {
            key: key.to_string(),
            origin: self.origin,
            new_value: value.map(str::to_string),
        });
        for event in pending {
            let _ = self.events.send(event);
        }
        Ok(())
    }
}

impl Storage for FileStorage {
    fn origin(&self) -> Origin {
        self.origin
    }

    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(read_entries(&self.path)?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.write(key, Some(value))
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        self.write(key, None)
    }

    fn subscribe(&self) -> Subscription {
        Subscription::new(self.origin, self.events.subscribe())
    }
}

fn read_entries(path: &Path) -> Result<HashMap<String, String>, AppError> {
    match fs::read_to_string(path) {
        Ok(raw) if raw.trim().is_empty() => Ok(HashMap::new()),
        Ok(raw) => serde_json::from_str(&raw).map_err(|err| {
            AppError::Storage(format!("Failed to parse {}: {err}", path.display()))
        }),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
        Err(err) => Err(AppError::Storage(format!(
            "Failed to read {}: {err}",
            path.display()
        ))),
    }
}

/// Writes through a temporary file and a rename so readers never see a
/// partially written file. The temporary file is created owner-only (0600 on
/// Unix) and the rename keeps that mode, since the entries hold bearer tokens.
fn write_entries(path: &Path, entries: &HashMap<String, String>) -> Result<(), AppError> {
    let raw = serde_json::to_string_pretty(entries)
        .map_err(|err| AppError::Storage(format!("Failed to encode storage: {err}")))?;
    let failed = |err: std::io::Error| {
        AppError::Storage(format!("Failed to write {}: {err}", path.display()))
    };

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(failed)?;
    tmp.write_all(raw.as_bytes()).map_err(failed)?;
    tmp.as_file().sync_all().map_err(failed)?;
    tmp.persist(path).map_err(|err| failed(err.error))?;
    Ok(())
}

fn diff(
    before: &HashMap<String, String>,
    after: &HashMap<String, String>,
    origin: Origin,
) -> Vec<StorageEvent> {
    let mut events: Vec<StorageEvent> = after
        .iter()
        .filter(|(key, value)| before.get(*key) != Some(*value))
        .map(|(key, value)| StorageEvent {
            key: key.clone(),
            origin,
            new_value: Some(value.clone()),
        })
        .collect();

    events.extend(
        before
            .keys()
            .filter(|key| !after.contains_key(*key))
            .map(|key| StorageEvent {
                key: key.clone(),
                origin,
                new_value: None,
            }),
    );
    events
}
