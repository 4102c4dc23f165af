//! Session persistence.
//!
//! The session store is the single source of truth for "who is logged in",
//! persisted across restarts under one well-known key. The persisted value
//! is the whole session - identity plus bearer token - so a restored
//! process polls the backend with the credential it logged in with.
//! Restore is self-healing: a corrupt entry (or a wholly-corrupt file) is
//! deleted and reported as absent rather than surfacing a parse error.
//! Write failures are logged and non-fatal - the in-memory session stays
//! authoritative for the process lifetime.

use crate::identity::{Identity, Session};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

/// The one key the session store owns. No other component writes it.
pub const SESSION_KEY: &str = "claimwatch_session";

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable string key-value storage (local-storage equivalent).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// File-backed store: a JSON object of string entries at a fixed path.
/// Writes go through a temp file and rename so a crash never leaves a
/// half-written file behind.
pub struct FileStore {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`, creating parent directories as needed.
    /// An unreadable or malformed file starts the store empty.
    pub fn open(path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let entries = if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<HashMap<String, String>>(&data) {
                Ok(map) => map,
                Err(err) => {
                    warn!("Session file at {:?} is malformed ({}), removing it", path, err);
                    if let Err(err) = std::fs::remove_file(&path) {
                        warn!("Failed to remove malformed session file: {}", err);
                    }
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Ok(Self { path, entries })
    }

    /// Open at the default location (`<data dir>/claimwatch/session.json`).
    pub fn open_default() -> Result<Self, StoreError> {
        let path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("claimwatch")
            .join("session.json");
        Self::open(path)
    }

    fn flush(&self) -> Result<(), StoreError> {
        let data = serde_json::to_string_pretty(&self.entries)?;
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, &data)?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Holds the current session and mirrors it into durable storage.
pub struct SessionStore {
    backing: Box<dyn KeyValueStore>,
    current: Option<Session>,
}

impl SessionStore {
    pub fn new(backing: Box<dyn KeyValueStore>) -> Self {
        Self {
            backing,
            current: None,
        }
    }

    /// Restore a persisted session, if any. A malformed entry is deleted
    /// and reported as absent.
    pub fn restore(&mut self) -> Option<Session> {
        let raw = self.backing.get(SESSION_KEY)?;

        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => {
                debug!(
                    "Restored session for {} ({})",
                    session.identity.username, session.identity.role
                );
                self.current = Some(session.clone());
                Some(session)
            }
            Err(err) => {
                warn!("Persisted session is malformed ({}), discarding", err);
                if let Err(err) = self.backing.remove(SESSION_KEY) {
                    warn!("Failed to remove corrupt session entry: {}", err);
                }
                self.current = None;
                None
            }
        }
    }

    /// Persist `session`. A write failure keeps the in-memory session.
    pub fn save(&mut self, session: &Session) {
        self.current = Some(session.clone());

        match serde_json::to_string(session) {
            Ok(json) => {
                if let Err(err) = self.backing.set(SESSION_KEY, &json) {
                    warn!("Failed to persist session: {}", err);
                }
            }
            Err(err) => warn!("Failed to serialize session: {}", err),
        }
    }

    /// Drop the persisted entry and the in-memory session.
    pub fn clear(&mut self) {
        self.current = None;
        if let Err(err) = self.backing.remove(SESSION_KEY) {
            warn!("Failed to remove persisted session: {}", err);
        }
    }

    /// The identity for the current process, if logged in.
    pub fn current(&self) -> Option<&Identity> {
        self.current.as_ref().map(|s| &s.identity)
    }

    /// True if the persisted entry exists and is valid JSON (diagnostics).
    pub fn has_persisted(&self) -> bool {
        self.backing
            .get(SESSION_KEY)
            .map(|raw| serde_json::from_str::<Value>(&raw).is_ok())
            .unwrap_or(false)
    }
}
